//! Mock implementations for testing
//!
//! These mocks enable orchestrator testing without real I/O.

use super::traits::*;
use crate::llm::{
    LlmError, ModelRequest, ModelResponse, OutputItem, ToolDefinition, ToolInvocation, Usage,
};
use crate::store::{
    ConversationTurn, InMemoryStore, SessionId, SessionSummary, StoreError, StoreResult,
};
use crate::tools::{ToolContext, ToolError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Response builders
// ============================================================================

/// Response carrying only final text
pub fn text_response(id: &str, text: &str) -> ModelResponse {
    ModelResponse {
        id: id.to_string(),
        output: vec![OutputItem::FinalText(text.to_string())],
        usage: Usage::default(),
    }
}

/// Response requesting the given `(call_id, name, arguments)` tool calls
pub fn tool_response(id: &str, calls: &[(&str, &str, &str)]) -> ModelResponse {
    ModelResponse {
        id: id.to_string(),
        output: calls
            .iter()
            .map(|(call_id, name, arguments)| {
                OutputItem::ToolInvocation(ToolInvocation {
                    call_id: (*call_id).to_string(),
                    name: (*name).to_string(),
                    arguments: (*arguments).to_string(),
                })
            })
            .collect(),
        usage: Usage::default(),
    }
}

// ============================================================================
// Scripted Model Backend
// ============================================================================

/// Backend that returns queued responses and records every request
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
    valid_handles: Mutex<HashSet<String>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<ModelRequest>>,
    /// Record of all probed handles
    pub probes: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            valid_handles: Mutex::new(HashSet::new()),
            model_id: "mock-model".to_string(),
            requests: Mutex::new(Vec::new()),
            probes: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response. Its id becomes a valid handle once served.
    pub fn queue_response(&self, response: ModelResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Make `probe` accept a handle that was never served
    pub fn accept_handle(&self, handle: &str) {
        self.valid_handles.lock().unwrap().insert(handle.to_string());
    }

    /// Make `probe` reject a handle, e.g. one that expired server-side
    pub fn expire_handle(&self, handle: &str) {
        self.valid_handles.lock().unwrap().remove(handle);
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get recorded probes
    pub fn recorded_probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<ModelResponse, LlmError> {
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")));
        if let Ok(resp) = &next {
            self.valid_handles.lock().unwrap().insert(resp.id.clone());
        }
        next
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_response()
    }

    async fn probe(&self, response_id: &str) -> Result<(), LlmError> {
        self.probes.lock().unwrap().push(response_id.to_string());
        if self.valid_handles.lock().unwrap().contains(response_id) {
            Ok(())
        } else {
            Err(LlmError::not_found(format!("No response with id {response_id}")))
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Model Backend (for cancellation testing)
// ============================================================================

/// Backend that sleeps before answering
pub struct DelayedBackend {
    inner: ScriptedBackend,
    delay: Duration,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: ScriptedBackend::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_response(&self, response: ModelResponse) {
        self.inner.queue_response(response);
    }
}

#[async_trait]
impl ModelBackend for DelayedBackend {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        // notify_one stores a permit, so a waiter that arrives late still wakes
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next_response()
    }

    async fn probe(&self, response_id: &str) -> Result<(), LlmError> {
        self.inner.probe(response_id).await
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Mock Tool Dispatcher
// ============================================================================

enum MockOutcome {
    Output(String),
    Failure(String),
}

/// Dispatcher with predefined per-tool outcomes
pub struct MockDispatcher {
    outcomes: HashMap<String, MockOutcome>,
    definitions: Vec<ToolDefinition>,
    /// Record of tool executions as `(name, arguments)`
    pub executions: Mutex<Vec<(String, String)>>,
    calls: AtomicUsize,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            definitions: Vec::new(),
            executions: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a tool that succeeds with `output`
    pub fn with_tool(self, name: &str, output: &str) -> Self {
        self.register(name, MockOutcome::Output(output.to_string()))
    }

    /// Add a tool that fails with an execution error
    pub fn with_failing_tool(self, name: &str, message: &str) -> Self {
        self.register(name, MockOutcome::Failure(message.to_string()))
    }

    fn register(mut self, name: &str, outcome: MockOutcome) -> Self {
        self.definitions.push(ToolDefinition {
            name: name.to_string(),
            description: format!("Mock {name}"),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        });
        self.outcomes.insert(name.to_string(), outcome);
        self
    }

    /// Get recorded executions
    pub fn recorded_executions(&self) -> Vec<(String, String)> {
        self.executions.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolDispatcher for MockDispatcher {
    async fn invoke(
        &self,
        _ctx: &ToolContext,
        name: &str,
        arguments: &str,
    ) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.to_string()));

        match self.outcomes.get(name) {
            Some(MockOutcome::Output(out)) => Ok(out.clone()),
            Some(MockOutcome::Failure(message)) => Err(ToolError::execution(
                message.clone(),
                io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
            )),
            None => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }
}

// ============================================================================
// Failing Store
// ============================================================================

/// In-memory store that can be told to fail
pub struct FailingStore {
    inner: InMemoryStore,
    fail_list: bool,
    fail_append: bool,
}

impl FailingStore {
    pub fn failing_list() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_list: true,
            fail_append: false,
        }
    }

    /// Reads succeed, every write is rejected before it reaches the store
    pub fn failing_append() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_list: false,
            fail_append: true,
        }
    }

    /// Turns that made it into the underlying store
    pub async fn stored(&self, session: &SessionId) -> Vec<ConversationTurn> {
        self.inner.list(session).await.unwrap()
    }
}

#[async_trait]
impl ConversationStore for FailingStore {
    async fn list(&self, session: &SessionId) -> StoreResult<Vec<ConversationTurn>> {
        if self.fail_list {
            return Err(StoreError::LockPoisoned);
        }
        self.inner.list(session).await
    }

    async fn append(&self, session: &SessionId, turn: &ConversationTurn) -> StoreResult<()> {
        if self.fail_append {
            return Err(StoreError::LockPoisoned);
        }
        self.inner.append(session, turn).await
    }

    async fn append_exchange(
        &self,
        session: &SessionId,
        user: &ConversationTurn,
        assistant: &ConversationTurn,
    ) -> StoreResult<()> {
        if self.fail_append {
            return Err(StoreError::LockPoisoned);
        }
        self.inner.append_exchange(session, user, assistant).await
    }

    async fn delete(&self, session: &SessionId) -> StoreResult<()> {
        self.inner.delete(session).await
    }

    async fn list_sessions(&self) -> StoreResult<Vec<SessionSummary>> {
        self.inner.list_sessions().await
    }
}
