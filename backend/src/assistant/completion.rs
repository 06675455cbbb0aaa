//! Chat completion client
//!
//! HTTP client for OpenAI-compatible `chat/completions` endpoints (Groq by
//! default), including function-style tool calls. The `CompletionClient`
//! trait lets the WebSocket handler run against a fake in tests.

use crate::config::CompletionConfig;
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Instructions for the model
    System,
    /// Message from the shopper
    User,
    /// Reply from the model
    Assistant,
    /// Result of a tool call
    Tool,
}

/// Function invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Tool name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

/// Tool call attached to an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier echoed back in the tool result
    pub id: String,
    /// Always `function`
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    /// Requested function
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a function call
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

fn function_kind() -> String {
    "function".to_string()
}

/// Tool offered to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Function name
    pub name: String,
    /// What the tool does, read by the model
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

/// One message in a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who wrote the message
    pub role: TurnRole,
    /// Message text
    pub content: String,
    /// Calls requested by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call answered by a tool turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatTurn {
    /// Create a turn
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Assistant turn that only requests tool calls
    pub fn tool_request(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::new(TurnRole::Assistant, "")
        }
    }

    /// Tool output answering `call_id`
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::new(TurnRole::Tool, content)
        }
    }
}

/// Outcome of a completion that may use tools
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Final text for the shopper
    Text(String),
    /// Tools to run before the model can answer
    ToolCalls(Vec<ToolCall>),
}

/// Source of assistant replies
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce the next assistant message for `messages`
    async fn complete(&self, messages: &[ChatTurn]) -> Result<String, AppError>;

    /// Produce the next assistant message, letting the model call `tools`
    ///
    /// Clients without tool support answer with plain text.
    async fn complete_with_tools(
        &self,
        messages: &[ChatTurn],
        _tools: &[ToolDefinition],
    ) -> Result<Completion, AppError> {
        self.complete(messages).await.map(Completion::Text)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec<'a>>,
}

#[derive(Serialize)]
struct ToolSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

/// Client for OpenAI-compatible chat completion APIs
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleClient {
    /// Build a client from configuration
    pub fn new(config: &CompletionConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Model name sent with each request
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(
        &self,
        messages: &[ChatTurn],
        tools: &[ToolDefinition],
    ) -> Result<ChoiceMessage, AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Completion(
                "API key is empty; set COMPLETION_API_KEY".to_string(),
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let request_body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            tools: tools
                .iter()
                .map(|function| ToolSpec {
                    kind: "function",
                    function,
                })
                .collect(),
        };

        tracing::debug!(
            url = %url,
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "Calling completion API"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::Completion(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status_code,
                error_body = %error_body,
                "Completion API returned error status"
            );

            if status_code == 429 {
                return Err(AppError::RateLimited(format!(
                    "HTTP {}: {}",
                    status_code, error_body
                )));
            }
            return Err(AppError::Completion(format!(
                "HTTP {}: {}",
                status_code, error_body
            )));
        }

        let response_body = response
            .text()
            .await
            .map_err(|e| AppError::Completion(format!("Failed to read response body: {}", e)))?;

        let parsed: CompletionResponse = serde_json::from_str(&response_body).map_err(|e| {
            AppError::Completion(format!(
                "Failed to parse response: {} - Response body: {}",
                e, response_body
            ))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| AppError::Completion("Response contains no content".to_string()))
    }
}

fn message_text(message: ChoiceMessage) -> Result<String, AppError> {
    let text = message
        .content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::Completion("Response contains no content".to_string()))?;
    tracing::debug!(response_len = text.len(), "Received completion");
    Ok(text)
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(&self, messages: &[ChatTurn]) -> Result<String, AppError> {
        message_text(self.request(messages, &[]).await?)
    }

    async fn complete_with_tools(
        &self,
        messages: &[ChatTurn],
        tools: &[ToolDefinition],
    ) -> Result<Completion, AppError> {
        let mut message = self.request(messages, tools).await?;
        match message.tool_calls.take() {
            Some(calls) if !calls.is_empty() => {
                tracing::debug!(calls = calls.len(), "Model requested tool calls");
                Ok(Completion::ToolCalls(calls))
            }
            _ => message_text(message).map(Completion::Text),
        }
    }
}
