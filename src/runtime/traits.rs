//! Trait abstractions for runtime I/O
//!
//! The orchestrator is generic over its store, model backend and tool
//! dispatcher so tests can swap in mocks.

pub use crate::llm::ModelBackend;
pub use crate::store::ConversationStore;

use crate::llm::ToolDefinition;
use crate::tools::{ToolContext, ToolError, ToolRegistry};
use async_trait::async_trait;
use std::sync::Arc;

/// Routes a tool name plus raw argument payload to an implementation
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Run the named tool, returning its result as text
    async fn invoke(&self, ctx: &ToolContext, name: &str, arguments: &str)
        -> Result<String, ToolError>;

    /// Get tool definitions for the model
    fn definitions(&self) -> Vec<ToolDefinition>;
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    async fn invoke(
        &self,
        ctx: &ToolContext,
        name: &str,
        arguments: &str,
    ) -> Result<String, ToolError> {
        ToolRegistry::invoke(self, ctx, name, arguments).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        ToolRegistry::definitions(self)
    }
}

#[async_trait]
impl<T: ToolDispatcher + ?Sized> ToolDispatcher for Arc<T> {
    async fn invoke(
        &self,
        ctx: &ToolContext,
        name: &str,
        arguments: &str,
    ) -> Result<String, ToolError> {
        (**self).invoke(ctx, name, arguments).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}
