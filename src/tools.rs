//! Filesystem tools and the dispatcher that routes model tool calls to them
//!
//! Each tool is a typed [`Tool`] with its own input and output structs.
//! The registry erases them behind a name lookup that decodes the raw JSON
//! arguments, runs the tool and encodes the result back to JSON text, so the
//! model always receives text whatever the tool's native return shape.

mod list_directory;
pub mod patch;
mod read_file;
mod search_content;
mod write_file;

pub use list_directory::ListDirectoryTool;
pub use patch::{PatchError, PatchFileTool};
pub use read_file::ReadFileTool;
pub use search_content::SearchContentTool;
pub use write_file::WriteFileTool;

use crate::llm::ToolDefinition;
use crate::store::SessionId;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments for {tool}: {source}")]
    Decode {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("{context}: {source}")]
    Execution {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error("failed to encode result of {tool}: {source}")]
    Encode {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ToolError {
    pub fn execution(context: impl Into<String>, source: io::Error) -> Self {
        Self::Execution {
            context: context.into(),
            source,
        }
    }
}

/// All context needed for a tool invocation.
///
/// Created fresh for each exchange. Tools are stateless and derive all
/// context from this struct.
#[derive(Clone)]
pub struct ToolContext {
    /// Cancellation signal for long-running operations
    pub cancel: CancellationToken,

    /// The session this tool is executing within
    pub session_id: SessionId,

    /// Directory relative paths resolve against
    pub working_dir: PathBuf,
}

impl ToolContext {
    pub fn new(cancel: CancellationToken, session_id: SessionId, working_dir: PathBuf) -> Self {
        Self {
            cancel,
            session_id,
            working_dir,
        }
    }

    /// Resolve a tool-supplied path against the working directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.working_dir.join(p)
        }
    }
}

/// A typed tool the model can call
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    /// Name the model calls the tool by
    const NAME: &'static str;

    type Input: DeserializeOwned + Send;
    type Output: Serialize + Send;

    /// Tool description for the model
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    async fn execute(&self, ctx: &ToolContext, input: Self::Input)
        -> Result<Self::Output, ToolError>;
}

/// Name-erased view of a [`Tool`], working on raw JSON text
#[async_trait]
trait ErasedTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn definition(&self) -> ToolDefinition;

    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<String, ToolError>;
}

#[async_trait]
impl<T: Tool> ErasedTool for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: T::NAME.to_string(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<String, ToolError> {
        // Tools without parameters may be called with an empty payload
        let raw = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };
        let input: T::Input = serde_json::from_str(raw).map_err(|source| ToolError::Decode {
            tool: T::NAME.to_string(),
            source,
        })?;

        let output = self.execute(ctx, input).await?;

        serde_json::to_string(&output).map_err(|source| ToolError::Encode {
            tool: T::NAME.to_string(),
            source,
        })
    }
}

/// Closed set of tools available to the model
///
/// Stateless - tools are singletons, all per-call context via `ToolContext`
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ErasedTool>>,
}

impl ToolRegistry {
    /// The five filesystem tools
    pub fn standard() -> Self {
        Self {
            tools: vec![
                Arc::new(ReadFileTool),
                Arc::new(ListDirectoryTool),
                Arc::new(SearchContentTool),
                Arc::new(WriteFileTool),
                Arc::new(PatchFileTool),
            ],
        }
    }

    /// Get all tool definitions for the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Decode `arguments`, run the named tool and return its JSON-encoded result
    pub async fn invoke(
        &self,
        ctx: &ToolContext,
        name: &str,
        arguments: &str,
    ) -> Result<String, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tracing::debug!(session = %ctx.session_id, tool = name, "Dispatching tool call");
        tool.invoke(ctx, arguments).await
    }
}

#[cfg(test)]
pub(crate) fn test_context(dir: &Path) -> ToolContext {
    ToolContext::new(
        CancellationToken::new(),
        SessionId::generate(),
        dir.to_path_buf(),
    )
}
