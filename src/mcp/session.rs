//! Backend session contract and its rmcp implementation.

use std::collections::HashMap;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, GetPromptRequestParam, ReadResourceRequestParam},
    service::{Peer, RoleClient, ServiceExt},
    transport::{StreamableHttpClientTransport, TokioChildProcess},
};
use tokio::{process::Command, sync::Mutex};
use url::Url;

use crate::mcp::config::{McpServerEntry, expand_env_map};
use crate::mcp::types::{
    CapabilityDescriptor, PromptDescriptor, RenderedPrompt, ResourceContent, ResourceDescriptor,
    ToolOutput,
};

/// A live, initialized connection to one backend.
///
/// Sessions are owned by the [`ConnectionManager`](crate::mcp::connection::ConnectionManager);
/// everything else only borrows them through the registry.
#[async_trait]
pub trait Session: Send + Sync + std::fmt::Debug {
    /// Configured server name, for logs.
    fn server_name(&self) -> &str;

    async fn list_tools(&self) -> anyhow::Result<Vec<CapabilityDescriptor>>;

    async fn list_prompts(&self) -> anyhow::Result<Vec<PromptDescriptor>>;

    async fn list_resources(&self) -> anyhow::Result<Vec<ResourceDescriptor>>;

    async fn call_tool(&self, name: &str, arguments: serde_json::Value)
    -> anyhow::Result<ToolOutput>;

    async fn get_prompt(
        &self,
        name: &str,
        arguments: &HashMap<String, String>,
    ) -> anyhow::Result<RenderedPrompt>;

    async fn read_resource(&self, uri: &str) -> anyhow::Result<Vec<ResourceContent>>;

    /// Release the underlying transport. Called once, by the owner.
    async fn close(&self) -> anyhow::Result<()>;
}

type DynClientService = rmcp::service::RunningService<
    RoleClient,
    Box<dyn rmcp::service::DynService<RoleClient>>,
>;

/// [`Session`] backed by an rmcp client service.
pub struct RmcpSession {
    server_name: String,
    peer: Peer<RoleClient>,
    // taken on close; cancelling consumes the service
    service: Mutex<Option<DynClientService>>,
}

impl std::fmt::Debug for RmcpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RmcpSession")
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

impl RmcpSession {
    /// Spawn or dial the configured server and complete the MCP handshake.
    pub async fn connect(name: &str, entry: &McpServerEntry) -> anyhow::Result<Self> {
        let service = match entry {
            McpServerEntry::Stdio { command, args, env } => {
                let mut cmd = Command::new(command);
                cmd.args(args);
                for (k, v) in expand_env_map(env.as_ref()) {
                    cmd.env(k, v);
                }

                let transport = TokioChildProcess::new(cmd)
                    .with_context(|| format!("failed to spawn '{command}' for '{name}'"))?;
                ().into_dyn()
                    .serve(transport)
                    .await
                    .with_context(|| format!("failed to initialize stdio MCP server '{name}'"))?
            }

            McpServerEntry::RemoteHttp { url, .. } => {
                let url = Url::parse(url)
                    .with_context(|| format!("invalid url for remote MCP server '{name}': {url}"))?;
                let transport = StreamableHttpClientTransport::from_uri(url.to_string());
                ().into_dyn()
                    .serve(transport)
                    .await
                    .with_context(|| format!("failed to initialize remote MCP server '{name}'"))?
            }
        };

        Ok(Self {
            server_name: name.to_string(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        })
    }
}

/// Re-shape an rmcp model value into our own descriptor types.
fn convert<S: serde::Serialize, T: serde::de::DeserializeOwned>(value: &S) -> anyhow::Result<T> {
    Ok(serde_json::from_value(serde_json::to_value(value)?)?)
}

#[async_trait]
impl Session for RmcpSession {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    async fn list_tools(&self) -> anyhow::Result<Vec<CapabilityDescriptor>> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .with_context(|| format!("tools/list failed for '{}'", self.server_name))?;
        tools.iter().map(convert).collect()
    }

    async fn list_prompts(&self) -> anyhow::Result<Vec<PromptDescriptor>> {
        let prompts = self
            .peer
            .list_all_prompts()
            .await
            .with_context(|| format!("prompts/list failed for '{}'", self.server_name))?;
        prompts.iter().map(convert).collect()
    }

    async fn list_resources(&self) -> anyhow::Result<Vec<ResourceDescriptor>> {
        let resources = self
            .peer
            .list_all_resources()
            .await
            .with_context(|| format!("resources/list failed for '{}'", self.server_name))?;
        resources.iter().map(convert).collect()
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> anyhow::Result<ToolOutput> {
        let res = self
            .peer
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: arguments.as_object().cloned(),
            })
            .await
            .with_context(|| format!("tools/call failed for {}::{name}", self.server_name))?;
        convert(&res)
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: &HashMap<String, String>,
    ) -> anyhow::Result<RenderedPrompt> {
        let arguments = (!arguments.is_empty()).then(|| {
            arguments
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect()
        });
        let res = self
            .peer
            .get_prompt(GetPromptRequestParam {
                name: name.to_string(),
                arguments,
            })
            .await
            .with_context(|| format!("prompts/get failed for {}::{name}", self.server_name))?;
        convert(&res)
    }

    async fn read_resource(&self, uri: &str) -> anyhow::Result<Vec<ResourceContent>> {
        let res = self
            .peer
            .read_resource(ReadResourceRequestParam {
                uri: uri.to_string(),
            })
            .await
            .with_context(|| format!("resources/read failed for {uri}"))?;
        convert(&res.contents)
    }

    async fn close(&self) -> anyhow::Result<()> {
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };
        service
            .cancel()
            .await
            .map_err(|e| anyhow!("failed to stop MCP server '{}': {e}", self.server_name))?;
        Ok(())
    }
}
