//! Common types for model backend interactions

/// Request sent to the model backend
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub instructions: String,
    /// Continuation handle of the response this request follows
    pub previous_response_id: Option<String>,
    pub input: Vec<InputItem>,
    pub tools: Vec<ToolDefinition>,
}

impl ModelRequest {
    /// A fresh request carrying one user message
    pub fn user_message(
        instructions: impl Into<String>,
        text: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            instructions: instructions.into(),
            previous_response_id: None,
            input: vec![InputItem::UserMessage(text.into())],
            tools,
        }
    }

    pub fn with_previous_response(mut self, id: Option<String>) -> Self {
        self.previous_response_id = id;
        self
    }
}

/// Input item of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputItem {
    UserMessage(String),
    /// Result text of a tool invocation, keyed by the call id the model assigned
    ToolOutput { call_id: String, output: String },
}

/// Tool schema advertised to the model
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A tool call the model asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    /// Raw JSON argument payload, passed through unmodified
    pub arguments: String,
}

/// Output item of a response, decoded once from the wire format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
    ToolInvocation(ToolInvocation),
    FinalText(String),
}

/// Model backend response
#[derive(Debug, Clone)]
pub struct ModelResponse {
    /// Response id; doubles as the continuation handle for the next request
    pub id: String,
    pub output: Vec<OutputItem>,
    pub usage: Usage,
}

impl ModelResponse {
    /// Tool invocations in presentation order
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.output.iter().filter_map(|item| match item {
            OutputItem::ToolInvocation(call) => Some(call),
            OutputItem::FinalText(_) => None,
        })
    }

    /// Concatenated final text
    pub fn text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::FinalText(text) => Some(text.as_str()),
                OutputItem::ToolInvocation(_) => None,
            })
            .collect()
    }
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_field_names)] // tokens suffix is meaningful
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
