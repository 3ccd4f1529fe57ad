//! Runtime for executing exchanges
//!
//! The [`TurnOrchestrator`] turns one user input into a final answer,
//! resolving tool calls along the way, and records the exchange.

mod exchange;
mod orchestrator;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use orchestrator::{ExchangeError, OrchestratorConfig, TurnOrchestrator};
pub use traits::*;

use crate::llm::LoggingBackend;
use crate::tools::ToolRegistry;
use std::sync::Arc;

/// Orchestrator wired to the production backend and tools, over either store
pub type ProductionOrchestrator =
    TurnOrchestrator<Arc<dyn ConversationStore>, LoggingBackend, ToolRegistry>;
