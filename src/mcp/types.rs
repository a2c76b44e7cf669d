//! Capability descriptors and call results as seen by the chatbot.
//!
//! These mirror the MCP wire shapes closely enough that rmcp results can be
//! converted through `serde_json::Value` without depending on rmcp's own
//! struct layout.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A tool exposed by a backend, captured at discovery time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// One declared prompt argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// A prompt template exposed by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: Vec<PromptArgument>,
}

/// A resource exposed by a backend. `uri` is an opaque key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolOutput {
    /// Render the content blocks for a tool-result message.
    ///
    /// Text blocks are joined with newlines; anything else is kept as JSON.
    pub fn to_message_content(&self) -> String {
        let all_text: Option<Vec<&str>> = self
            .content
            .iter()
            .map(|block| block.get("text").and_then(serde_json::Value::as_str))
            .collect();

        match all_text {
            Some(texts) if !texts.is_empty() => texts.join("\n"),
            _ => serde_json::to_string(&self.content).unwrap_or_default(),
        }
    }
}

/// Rendered content of a prompt message.
///
/// Backends return either a bare string, a single content object with a
/// `text` field, or a list of such objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptContent {
    Text(String),
    Object {
        #[serde(default)]
        text: Option<String>,
        #[serde(flatten)]
        rest: serde_json::Map<String, serde_json::Value>,
    },
    Sequence(Vec<PromptContent>),
}

impl PromptContent {
    /// Collapse any content shape into a single string.
    ///
    /// Sequence items are joined with a single space. Objects without a
    /// `text` field render as their JSON form.
    pub fn normalize_to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Object {
                text: Some(text), ..
            } => text.clone(),
            Self::Object { text: None, rest } => {
                serde_json::Value::Object(rest.clone()).to_string()
            }
            Self::Sequence(items) => items
                .iter()
                .map(Self::normalize_to_text)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One message of a rendered prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: PromptContent,
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPrompt {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub messages: Vec<PromptMessage>,
}

/// One entry of `resources/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
