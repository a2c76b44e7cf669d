//! LLM driver trait, conversation types and the ask/act loop.
//!
//! # Overview
//!
//! The [`LlmDriver`] trait is the single model-call primitive: given the
//! conversation so far and the tool schemas, return one assistant message.
//! The [`Orchestrator`] builds the tool loop on top of it.
//!
//! # Drivers
//!
//! - [`ChatCompletionsDriver`]: `OpenAI` / Azure `OpenAI` Chat Completions
//!   (`/v1/chat/completions`, non-streaming)
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_chatbot::llm::{ChatCompletionsDriver, LlmSettings, Provider};
//!
//! let settings = LlmSettings {
//!     base_url: "https://api.openai.com".to_string(),
//!     api_key: Some("sk-...".to_string()),
//!     model: "gpt-4o-mini".to_string(),
//!     provider: Provider::OpenAI,
//!     max_tokens: 2024,
//!     temperature: 0.0,
//! };
//! let driver = ChatCompletionsDriver::new(settings);
//! ```

pub mod chat_completions;
pub mod orchestrator;
pub mod provider;
pub mod schema;

pub use chat_completions::ChatCompletionsDriver;
pub use orchestrator::{LoopConfig, LoopState, Orchestrator, QueryOutcome, StopReason};
pub use provider::Provider;
pub use schema::{ModelFunctionSchema, to_model_schema};

/// LLM connection and sampling settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gpt-4o-mini`).
    pub model: String,
    /// Provider type (auto-detected from `base_url` unless configured).
    pub provider: Provider,
    /// Upper bound on completion tokens per model call.
    pub max_tokens: u32,
    /// Sampling temperature; 0.0 keeps tool selection deterministic.
    pub temperature: f32,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// User input.
    User {
        content: String,
    },
    /// Model output, optionally requesting tool calls.
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one tool call, answering the call with the same id.
    #[serde(rename = "tool")]
    ToolResult {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }
}

/// A tool call made by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call.
    pub id: String,
    /// Type of tool (always "function" for now).
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    /// Function details.
    pub function: ToolCallFunction,
}

fn default_call_type() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: default_call_type(),
            function: ToolCallFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Parse the argument string as JSON. An empty string means `{}`.
    pub fn parsed_arguments(&self) -> Result<serde_json::Value, serde_json::Error> {
        let raw = self.function.arguments.trim();
        if raw.is_empty() {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(raw)
    }
}

/// Function details in a tool call.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallFunction {
    /// Function name.
    pub name: String,
    /// Arguments as JSON string.
    pub arguments: String,
}

/// One assistant turn as returned by the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    pub content: Option<String>,
    /// Requested tool calls, in the order the model returned them.
    pub tool_calls: Vec<ToolCall>,
}

impl From<AssistantReply> for Message {
    fn from(reply: AssistantReply) -> Self {
        Self::Assistant {
            content: reply.content,
            tool_calls: reply.tool_calls,
        }
    }
}

/// Request to an LLM driver.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Every tool the model may call.
    pub tools: Vec<ModelFunctionSchema>,
}

/// Trait for LLM drivers.
#[async_trait::async_trait]
pub trait LlmDriver: Send + Sync {
    /// Ask the model for its next turn.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    async fn complete(&self, req: LlmRequest) -> anyhow::Result<AssistantReply>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_serialize_in_chat_completions_shape() {
        let assistant = Message::Assistant {
            content: None,
            tool_calls: vec![ToolCall::new("call_1", "search_papers", r#"{"topic":"ai"}"#)],
        };
        assert_eq!(
            serde_json::to_value(&assistant).unwrap(),
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "search_papers", "arguments": "{\"topic\":\"ai\"}"}
                }]
            })
        );
        assert_eq!(
            serde_json::to_value(Message::tool_result("call_1", "ok")).unwrap(),
            json!({"role": "tool", "tool_call_id": "call_1", "content": "ok"})
        );
        assert_eq!(
            serde_json::to_value(Message::user("hi")).unwrap(),
            json!({"role": "user", "content": "hi"})
        );
    }

    #[test]
    fn empty_arguments_parse_as_empty_object() {
        let call = ToolCall::new("call_1", "list_folders", "  ");
        assert_eq!(call.parsed_arguments().unwrap(), json!({}));
        assert!(ToolCall::new("call_2", "x", "{not json").parsed_arguments().is_err());
    }
}
