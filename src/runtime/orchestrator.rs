//! Turn orchestrator
//!
//! One exchange moves through three phases: awaiting the model, resolving
//! the tools it asked for (repeated while it keeps asking), and complete.
//! Nothing is written to the store until the exchange is complete; then the
//! user turn and the assistant turn are appended, in that order.

use super::exchange::{latest_handle, partition, Step};
use super::traits::{ConversationStore, ModelBackend, ToolDispatcher};
use crate::llm::{InputItem, LlmError, ModelRequest, ModelResponse, ToolInvocation};
use crate::store::{
    ConversationTurn, SessionId, StoreError, ToolCallRecord, CONTINUATION_HANDLE_KEY, MODEL_KEY,
};
use crate::tools::ToolContext;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Stage of an exchange, carried by errors to say where it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStep {
    LoadHistory,
    InitialRequest,
    FollowUpRequest,
    SaveExchange,
}

impl fmt::Display for ExchangeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExchangeStep::LoadHistory => "loading history",
            ExchangeStep::InitialRequest => "the initial model request",
            ExchangeStep::FollowUpRequest => "a tool follow-up request",
            ExchangeStep::SaveExchange => "saving the exchange",
        })
    }
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("model backend failed during {step}: {source}")]
    Backend {
        step: ExchangeStep,
        #[source]
        source: LlmError,
    },
    #[error("conversation store failed while {step}: {source}")]
    Persistence {
        step: ExchangeStep,
        #[source]
        source: StoreError,
    },
    #[error("model kept requesting tools after {limit} rounds")]
    ToolLoopExceeded { limit: usize },
    #[error("exchange cancelled")]
    Cancelled,
}

/// Static settings shared by every exchange
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// System instructions sent with every request
    pub instructions: String,
    /// Follow-up requests allowed per exchange before giving up
    pub max_tool_rounds: usize,
    /// Directory tool paths resolve against
    pub working_dir: PathBuf,
}

/// Result of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub text: String,
    /// Every tool call of the exchange, in invocation order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Id of the final response, stored as the next continuation handle
    pub response_id: String,
}

/// Drives exchanges for any store, backend and dispatcher
pub struct TurnOrchestrator<S, B, D> {
    store: S,
    backend: B,
    tools: D,
    config: OrchestratorConfig,
}

impl<S, B, D> TurnOrchestrator<S, B, D>
where
    S: ConversationStore,
    B: ModelBackend,
    D: ToolDispatcher,
{
    pub fn new(store: S, backend: B, tools: D, config: OrchestratorConfig) -> Self {
        Self {
            store,
            backend,
            tools,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one exchange: `input` in, final answer out, two turns persisted.
    ///
    /// Tool failures become `"Error: ..."` results and never fail the
    /// exchange. Backend and store failures do, and then nothing is persisted.
    pub async fn run_exchange(
        &self,
        session: &SessionId,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<ExchangeOutcome, ExchangeError> {
        let started = Instant::now();
        tracing::info!(session = %session, "Exchange started");

        let history = cancellable(cancel, self.store.list(session))
            .await?
            .map_err(|source| ExchangeError::Persistence {
                step: ExchangeStep::LoadHistory,
                source,
            })?;
        let handle = self.resolve_handle(&history, cancel).await?;

        let ctx = ToolContext::new(
            cancel.clone(),
            session.clone(),
            self.config.working_dir.clone(),
        );
        let tools = self.tools.definitions();

        let request =
            ModelRequest::user_message(self.config.instructions.clone(), input, tools.clone())
                .with_previous_response(handle);
        let mut response = self
            .send(&request, ExchangeStep::InitialRequest, cancel)
            .await?;

        let mut tool_calls = Vec::new();
        let mut rounds = 0;
        let text = loop {
            let invocations = match partition(&response) {
                Step::Finish(text) => break text,
                Step::Invoke(invocations) => invocations,
            };
            if rounds == self.config.max_tool_rounds {
                return Err(ExchangeError::ToolLoopExceeded {
                    limit: self.config.max_tool_rounds,
                });
            }
            rounds += 1;

            let mut outputs = Vec::with_capacity(invocations.len());
            for call in invocations {
                if cancel.is_cancelled() {
                    return Err(ExchangeError::Cancelled);
                }
                let result = self.invoke_tool(&ctx, &call).await;
                outputs.push(InputItem::ToolOutput {
                    call_id: call.call_id,
                    output: result.clone(),
                });
                tool_calls.push(ToolCallRecord::new(call.name, call.arguments, result));
            }

            let follow_up = ModelRequest {
                instructions: self.config.instructions.clone(),
                previous_response_id: Some(response.id.clone()),
                input: outputs,
                tools: tools.clone(),
            };
            response = self
                .send(&follow_up, ExchangeStep::FollowUpRequest, cancel)
                .await?;
        };

        // Last cancellation point; the save below always runs to completion
        if cancel.is_cancelled() {
            return Err(ExchangeError::Cancelled);
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(CONTINUATION_HANDLE_KEY.to_string(), response.id.clone());
        metadata.insert(MODEL_KEY.to_string(), self.backend.model_id().to_string());
        let assistant = ConversationTurn::assistant(text.clone(), tool_calls.clone(), metadata);
        self.persist(session, &ConversationTurn::user(input), &assistant)
            .await?;

        tracing::info!(
            session = %session,
            tool_calls = tool_calls.len(),
            rounds,
            duration_ms = %started.elapsed().as_millis(),
            "Exchange completed"
        );

        Ok(ExchangeOutcome {
            text,
            tool_calls,
            response_id: response.id,
        })
    }

    /// Store the user turn and its answer together
    async fn persist(
        &self,
        session: &SessionId,
        user: &ConversationTurn,
        assistant: &ConversationTurn,
    ) -> Result<(), ExchangeError> {
        self.store
            .append_exchange(session, user, assistant)
            .await
            .map_err(|source| ExchangeError::Persistence {
                step: ExchangeStep::SaveExchange,
                source,
            })
    }

    /// Latest stored handle, if the backend still recognises it
    async fn resolve_handle(
        &self,
        history: &[ConversationTurn],
        cancel: &CancellationToken,
    ) -> Result<Option<String>, ExchangeError> {
        let Some(handle) = latest_handle(history) else {
            return Ok(None);
        };

        match cancellable(cancel, self.backend.probe(handle)).await? {
            Ok(()) => Ok(Some(handle.to_string())),
            Err(e) => {
                tracing::warn!(
                    handle,
                    error = %e,
                    "Continuation handle rejected; continuing without prior context"
                );
                Ok(None)
            }
        }
    }

    async fn send(
        &self,
        request: &ModelRequest,
        step: ExchangeStep,
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, ExchangeError> {
        cancellable(cancel, self.backend.send(request))
            .await?
            .map_err(|source| ExchangeError::Backend { step, source })
    }

    async fn invoke_tool(&self, ctx: &ToolContext, call: &ToolInvocation) -> String {
        tracing::info!(tool = %call.name, call_id = %call.call_id, "Invoking tool");
        match self.tools.invoke(ctx, &call.name, &call.arguments).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                format!("Error: {e}")
            }
        }
    }
}

/// Race `fut` against cancellation; cancellation wins ties
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, ExchangeError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ExchangeError::Cancelled),
        out = fut => Ok(out),
    }
}
