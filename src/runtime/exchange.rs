//! Pure helpers for one exchange: continuity lookup and response partitioning

use crate::llm::{ModelResponse, ToolInvocation};
use crate::store::ConversationTurn;

/// Continuation handle of the most recent assistant turn that carries one
pub fn latest_handle(turns: &[ConversationTurn]) -> Option<&str> {
    turns
        .iter()
        .rev()
        .find_map(ConversationTurn::continuation_handle)
}

/// What the orchestrator does next with a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run these tools, in order, then send their results back
    Invoke(Vec<ToolInvocation>),
    /// No tools requested; the exchange is complete with this text
    Finish(String),
}

/// Split a response into tool invocations or final text.
///
/// Any tool invocation means another round. Text produced alongside tool
/// calls is not the final answer and is dropped.
pub fn partition(response: &ModelResponse) -> Step {
    let invocations: Vec<ToolInvocation> = response.tool_invocations().cloned().collect();
    if invocations.is_empty() {
        Step::Finish(response.text())
    } else {
        Step::Invoke(invocations)
    }
}
