//! `OpenAI` Chat Completions API driver.
//!
//! This module implements the [`LlmDriver`] trait for the Chat Completions
//! API (`/v1/chat/completions` or the Azure deployment route). One request
//! yields one complete assistant message; output is not streamed.

use anyhow::{Context, anyhow};
use serde::Deserialize;

use super::{AssistantReply, LlmDriver, LlmRequest, LlmSettings, ToolCall};

/// Driver for the `OpenAI` Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .field("provider", &self.settings.provider)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

impl ChatCompletionsDriver {
    /// Create a new Chat Completions driver with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn request_body(&self, req: &LlmRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": req.messages,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        });

        if !req.tools.is_empty() {
            body["tools"] = req
                .tools
                .iter()
                .map(super::ModelFunctionSchema::to_tool_json)
                .collect();
            body["tool_choice"] = serde_json::Value::from("auto");
        }
        body
    }
}

#[async_trait::async_trait]
impl LlmDriver for ChatCompletionsDriver {
    async fn complete(&self, req: LlmRequest) -> anyhow::Result<AssistantReply> {
        let url = self
            .settings
            .provider
            .build_chat_url(&self.settings.base_url);
        let body = self.request_body(&req);

        tracing::debug!(
            url = %url,
            message_count = req.messages.len(),
            tool_count = req.tools.len(),
            "Sending chat completions request"
        );

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = if self.settings.provider.uses_api_key_header() {
                rb.header("api-key", k)
            } else {
                rb.bearer_auth(k)
            };
        }

        let resp = rb
            .send()
            .await
            .with_context(|| format!("chat completions request to {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(anyhow!("chat completions returned {status}: {detail}"));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .context("malformed chat completions response")?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("chat completions response has no choices"))?
            .message;

        Ok(AssistantReply {
            content: message.content,
            tool_calls: message.tool_calls.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, ModelFunctionSchema, Provider};
    use serde_json::json;

    fn driver() -> ChatCompletionsDriver {
        ChatCompletionsDriver::new(LlmSettings {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            provider: Provider::OpenAI,
            max_tokens: 2024,
            temperature: 0.0,
        })
    }

    #[test]
    fn body_offers_every_tool_with_auto_choice() {
        let req = LlmRequest {
            messages: vec![Message::user("find papers on qubits")],
            tools: vec![ModelFunctionSchema {
                name: "search_papers".to_string(),
                description: String::new(),
                parameters: json!({"type": "object"}),
            }],
        };
        let body = driver().request_body(&req);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["max_tokens"], 2024);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["tools"][0]["function"]["name"], "search_papers");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn body_omits_tools_when_none_registered() {
        let req = LlmRequest {
            messages: vec![Message::user("hello")],
            tools: Vec::new(),
        };
        let body = driver().request_body(&req);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn response_message_parses_tool_calls() {
        let parsed: CompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "search_papers", "arguments": "{\"topic\":\"ai\"}"}
                    }]
                }
            }]
        }))
        .unwrap();
        let calls = parsed.choices[0].message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].name(), "search_papers");
    }
}
