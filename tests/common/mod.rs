//! In-process stand-ins for MCP servers and the model.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde_json::{Value, json};

use mcp_chatbot::llm::{AssistantReply, LlmDriver, LlmRequest, ToolCall};
use mcp_chatbot::mcp::types::{
    CapabilityDescriptor, PromptContent, PromptDescriptor, PromptMessage, RenderedPrompt,
    ResourceContent, ResourceDescriptor, ToolOutput,
};
use mcp_chatbot::mcp::{Connector, McpServerEntry, Session};

/// Ordered record of calls across every fake in a test.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub fn tool(name: &str) -> CapabilityDescriptor {
    CapabilityDescriptor {
        name: name.to_string(),
        description: format!("{name} tool"),
        input_schema: json!({"type": "object", "properties": {}}),
    }
}

pub fn prompt(name: &str, args: &[&str]) -> PromptDescriptor {
    serde_json::from_value(json!({
        "name": name,
        "description": format!("{name} prompt"),
        "arguments": args.iter().map(|a| json!({"name": a})).collect::<Vec<_>>(),
    }))
    .unwrap()
}

pub fn resource(uri: &str) -> ResourceDescriptor {
    ResourceDescriptor {
        uri: uri.to_string(),
        name: None,
    }
}

/// Scriptable [`Session`].
#[derive(Debug, Default)]
pub struct FakeSession {
    pub name: String,
    pub tools: Vec<CapabilityDescriptor>,
    pub prompts: Vec<PromptDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
    /// Canned text per tool name; unknown tools echo their arguments.
    pub tool_replies: HashMap<String, String>,
    pub failing_tools: HashSet<String>,
    /// Rendered content per prompt name.
    pub prompt_content: HashMap<String, PromptContent>,
    /// Contents per resource URI; unknown URIs read as empty.
    pub resource_text: HashMap<String, String>,
    pub fail_prompt_listing: bool,
    pub fail_close: bool,
    pub tool_delay: Option<Duration>,
    pub log: CallLog,
}

impl FakeSession {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            ..Self::default()
        }
    }

    pub fn with_tools(mut self, names: &[&str]) -> Self {
        self.tools.extend(names.iter().map(|n| tool(n)));
        self
    }

    pub fn with_reply(mut self, tool: &str, text: &str) -> Self {
        self.tool_replies.insert(tool.to_string(), text.to_string());
        self
    }

    pub fn with_prompt(mut self, descriptor: PromptDescriptor, content: PromptContent) -> Self {
        self.prompt_content.insert(descriptor.name.clone(), content);
        self.prompts.push(descriptor);
        self
    }

    pub fn with_resource(mut self, uri: &str, text: Option<&str>) -> Self {
        self.resources.push(resource(uri));
        if let Some(text) = text {
            self.resource_text.insert(uri.to_string(), text.to_string());
        }
        self
    }

    pub fn into_dyn(self) -> Arc<dyn Session> {
        Arc::new(self)
    }
}

#[async_trait]
impl Session for FakeSession {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> anyhow::Result<Vec<CapabilityDescriptor>> {
        Ok(self.tools.clone())
    }

    async fn list_prompts(&self) -> anyhow::Result<Vec<PromptDescriptor>> {
        if self.fail_prompt_listing {
            bail!("prompts/list not supported");
        }
        Ok(self.prompts.clone())
    }

    async fn list_resources(&self) -> anyhow::Result<Vec<ResourceDescriptor>> {
        Ok(self.resources.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> anyhow::Result<ToolOutput> {
        self.log.push(format!("{}:call:{name}", self.name));
        if let Some(delay) = self.tool_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_tools.contains(name) {
            return Err(anyhow!("{name} exploded"));
        }
        let text = self
            .tool_replies
            .get(name)
            .cloned()
            .unwrap_or_else(|| arguments.to_string());
        Ok(ToolOutput {
            content: vec![json!({"type": "text", "text": text})],
            is_error: false,
        })
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: &HashMap<String, String>,
    ) -> anyhow::Result<RenderedPrompt> {
        let mut keys: Vec<_> = arguments.keys().cloned().collect();
        keys.sort();
        self.log
            .push(format!("{}:prompt:{name}:{}", self.name, keys.join(",")));
        let content = self
            .prompt_content
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown prompt {name}"))?;
        Ok(RenderedPrompt {
            description: None,
            messages: vec![PromptMessage {
                role: Some("user".to_string()),
                content,
            }],
        })
    }

    async fn read_resource(&self, uri: &str) -> anyhow::Result<Vec<ResourceContent>> {
        self.log.push(format!("{}:read:{uri}", self.name));
        Ok(self
            .resource_text
            .get(uri)
            .map(|text| ResourceContent {
                uri: uri.to_string(),
                mime_type: Some("text/markdown".to_string()),
                text: Some(text.clone()),
            })
            .into_iter()
            .collect())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.log.push(format!("{}:close", self.name));
        if self.fail_close {
            bail!("already gone");
        }
        Ok(())
    }
}

/// Model that replays a fixed list of replies and records every request.
#[derive(Default)]
pub struct ScriptedDriver {
    replies: Mutex<VecDeque<AssistantReply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedDriver {
    pub fn new(replies: impl IntoIterator<Item = AssistantReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        })
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmDriver for ScriptedDriver {
    async fn complete(&self, req: LlmRequest) -> anyhow::Result<AssistantReply> {
        self.requests.lock().unwrap().push(req);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }
}

pub fn answer(text: &str) -> AssistantReply {
    AssistantReply {
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
    }
}

pub fn calls(calls: &[(&str, &str, &str)]) -> AssistantReply {
    AssistantReply {
        content: None,
        tool_calls: calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
            .collect(),
    }
}

/// Hands out prepared sessions by server name; names without one fail.
#[derive(Default)]
pub struct FakeConnector {
    sessions: Mutex<HashMap<String, Arc<dyn Session>>>,
}

impl FakeConnector {
    pub fn new(sessions: impl IntoIterator<Item = FakeSession>) -> Self {
        Self {
            sessions: Mutex::new(
                sessions
                    .into_iter()
                    .map(|s| (s.name.clone(), s.into_dyn()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        name: &str,
        _entry: &McpServerEntry,
    ) -> anyhow::Result<Arc<dyn Session>> {
        self.sessions
            .lock()
            .unwrap()
            .remove(name)
            .ok_or_else(|| anyhow!("spawn failed for {name}"))
    }
}

/// Stdio entries for `names`, in order.
pub fn servers(names: &[&str]) -> mcp_chatbot::mcp::McpConfig {
    mcp_chatbot::mcp::McpConfig {
        mcp_servers: names
            .iter()
            .map(|n| ((*n).to_string(), json!({ "command": "true", "args": [] })))
            .collect(),
    }
}
