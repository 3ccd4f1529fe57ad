//! `OpenAI` Responses API backend
//!
//! Conversation state lives server-side: every response has an id, and a
//! request naming it as `previous_response_id` resumes from there.

use super::types::{
    InputItem, ModelRequest, ModelResponse, OutputItem, ToolInvocation, Usage,
};
use super::{LlmError, ModelBackend};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Responses API client
pub struct OpenAiResponsesBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiResponsesBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url)
    }

    fn translate_request(&self, request: &ModelRequest) -> ResponsesApiRequest {
        let input = request
            .input
            .iter()
            .map(|item| match item {
                InputItem::UserMessage(text) => ResponsesApiInputItem::Message {
                    role: "user".to_string(),
                    content: text.clone(),
                },
                InputItem::ToolOutput { call_id, output } => {
                    ResponsesApiInputItem::FunctionCallOutput {
                        call_id: call_id.clone(),
                        output: output.clone(),
                    }
                }
            })
            .collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| ResponsesApiTool {
                        r#type: "function".to_string(),
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    })
                    .collect(),
            )
        };

        ResponsesApiRequest {
            model: self.model.clone(),
            input,
            instructions: (!request.instructions.is_empty()).then(|| request.instructions.clone()),
            previous_response_id: request.previous_response_id.clone(),
            tools,
        }
    }

    /// Decode wire output items into the two-case output type
    fn normalize_response(resp: ResponsesApiResponse) -> Result<ModelResponse, LlmError> {
        if resp.id.is_empty() {
            return Err(LlmError::unknown("Response carried no id"));
        }

        let mut output = Vec::new();
        for item in resp.output {
            match item.r#type.as_str() {
                "message" => {
                    for part in item.content.unwrap_or_default() {
                        if part.r#type == "output_text" {
                            if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                                output.push(OutputItem::FinalText(text));
                            }
                        }
                    }
                }
                "function_call" => match (item.call_id, item.name, item.arguments) {
                    (Some(call_id), Some(name), arguments) if !name.is_empty() => {
                        output.push(OutputItem::ToolInvocation(ToolInvocation {
                            call_id,
                            name,
                            arguments: arguments.unwrap_or_default(),
                        }));
                    }
                    _ => {
                        return Err(LlmError::unknown(
                            "function_call output is missing its call id or name",
                        ));
                    }
                },
                "reasoning" => {
                    // Internal model thinking, not part of the answer
                }
                other => {
                    tracing::debug!(output_type = %other, "Ignoring unknown output type");
                }
            }
        }

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        });

        Ok(ModelResponse {
            id: resp.id,
            output,
            usage,
        })
    }

    async fn read_body(response: reqwest::Response) -> Result<String, LlmError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if status.is_success() {
            return Ok(body);
        }
        let message = serde_json::from_str::<OpenAiErrorResponse>(&body)
            .map_or(body, |resp| resp.error.message);
        Err(LlmError::from_status(status.as_u16(), &message))
    }
}

fn map_transport_error(e: &reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        LlmError::network(format!("Connection failed: {e}"))
    } else {
        LlmError::unknown(format!("Request failed: {e}"))
    }
}

#[async_trait]
impl ModelBackend for OpenAiResponsesBackend {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        let wire_request = self.translate_request(request);

        let response = self
            .client
            .post(self.responses_url())
            .bearer_auth(&self.api_key)
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        let body = Self::read_body(response).await?;
        let wire_response: ResponsesApiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(wire_response)
    }

    async fn probe(&self, response_id: &str) -> Result<(), LlmError> {
        if !is_response_id(response_id) {
            return Err(LlmError::invalid_request(format!(
                "malformed response id {response_id:?}"
            )));
        }
        let response = self
            .client
            .get(format!("{}/{response_id}", self.responses_url()))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        Self::read_body(response).await.map(|_| ())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Response ids are used as a URL path segment, so only plain id characters pass
fn is_response_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

// Responses API wire types

#[derive(Debug, Serialize)]
struct ResponsesApiRequest {
    model: String,
    input: Vec<ResponsesApiInputItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ResponsesApiTool>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ResponsesApiInputItem {
    #[serde(rename = "message")]
    Message { role: String, content: String },
    #[serde(rename = "function_call_output")]
    FunctionCallOutput { call_id: String, output: String },
}

#[derive(Debug, Serialize)]
struct ResponsesApiTool {
    r#type: String,
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiResponse {
    id: String,
    #[serde(default)]
    output: Vec<ResponsesApiOutput>,
    #[serde(default)]
    usage: Option<ResponsesApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiOutput {
    r#type: String,
    /// For message outputs
    #[serde(default)]
    content: Option<Vec<ResponsesApiContent>>,
    /// For `function_call` outputs
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
    #[serde(default)]
    call_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiContent {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct ResponsesApiUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}
