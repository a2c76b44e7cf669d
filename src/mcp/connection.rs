//! Group lifecycle for backend sessions.
//!
//! [`ConnectionManager`] opens every configured server in order, registers
//! what each one exposes, and owns the sessions until [`ConnectionManager::shutdown`]
//! releases them in reverse order of acquisition.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::error::{ChatError, Result, with_deadline};
use crate::llm::schema::{ModelFunctionSchema, to_model_schema};
use crate::mcp::config::{McpConfig, McpServerEntry};
use crate::mcp::registry::CapabilityRegistry;
use crate::mcp::session::{RmcpSession, Session};
use crate::mcp::types::{CapabilityDescriptor, PromptDescriptor, ResourceDescriptor};
use crate::normalized::{ChatEvent, Observer};

/// Opens a session for one configured server.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, name: &str, entry: &McpServerEntry)
    -> anyhow::Result<Arc<dyn Session>>;
}

/// Connects through rmcp (child process or streamable HTTP).
#[derive(Debug, Default, Clone, Copy)]
pub struct RmcpConnector;

#[async_trait]
impl Connector for RmcpConnector {
    async fn connect(
        &self,
        name: &str,
        entry: &McpServerEntry,
    ) -> anyhow::Result<Arc<dyn Session>> {
        Ok(Arc::new(RmcpSession::connect(name, entry).await?))
    }
}

/// Owns every backend session and the capabilities they advertised.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    connect_timeout: Duration,
    // acquisition order; drained in reverse on shutdown
    sessions: Vec<Arc<dyn Session>>,
    tools: Vec<CapabilityDescriptor>,
    prompts: Vec<PromptDescriptor>,
    resources: Vec<ResourceDescriptor>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("session_count", &self.sessions.len())
            .field("tool_count", &self.tools.len())
            .field("prompt_count", &self.prompts.len())
            .field("resource_count", &self.resources.len())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(connect_timeout: Duration) -> Self {
        Self::with_connector(RmcpConnector, connect_timeout)
    }

    pub fn with_connector(connector: impl Connector + 'static, connect_timeout: Duration) -> Self {
        Self {
            connector: Box::new(connector),
            connect_timeout,
            sessions: Vec::new(),
            tools: Vec::new(),
            prompts: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Connect to every configured server, in file order.
    ///
    /// A server whose entry is malformed, or that fails to connect or to
    /// list its capabilities, is logged and skipped. Returns the number of servers that connected.
    pub async fn connect_all(
        &mut self,
        cfg: &McpConfig,
        registry: &mut CapabilityRegistry,
        observer: &dyn Observer,
    ) -> usize {
        let mut connected = 0;

        for (name, raw) in &cfg.mcp_servers {
            let attempt = match McpServerEntry::from_value(raw) {
                Ok(entry) => self.connect(name, &entry).await,
                Err(source) => Err(ChatError::ConnectionFailure {
                    server: name.clone(),
                    source,
                }),
            };
            let session = match attempt {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!(
                        name: "mcp.server.connect_failed",
                        server = %name,
                        error = %e,
                        "Failed to connect to MCP server"
                    );
                    observer.observe(&ChatEvent::ServerFailed {
                        server: name.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            connected += 1;

            if let Err(e) = self.discover(&session, registry, observer).await {
                tracing::error!(
                    name: "mcp.server.discovery_failed",
                    server = %name,
                    error = %e,
                    "Capability discovery failed"
                );
                observer.observe(&ChatEvent::DiscoveryFailed {
                    server: name.clone(),
                    error: e.to_string(),
                });
            }
        }

        tracing::info!(
            name: "mcp.startup.complete",
            configured = cfg.mcp_servers.len(),
            connected = connected,
            tool_count = self.tools.len(),
            prompt_count = self.prompts.len(),
            resource_count = self.resources.len(),
            "MCP startup complete"
        );

        connected
    }

    /// Open one session and take ownership of it.
    pub async fn connect(&mut self, name: &str, entry: &McpServerEntry) -> Result<Arc<dyn Session>> {
        let session = with_deadline(
            format!("connecting to '{name}'"),
            self.connect_timeout,
            self.connector.connect(name, entry),
        )
        .await?
        .map_err(|source| ChatError::ConnectionFailure {
            server: name.to_string(),
            source,
        })?;

        // tracked before discovery so a failing listing still gets released
        self.sessions.push(Arc::clone(&session));
        Ok(session)
    }

    async fn discover(
        &mut self,
        session: &Arc<dyn Session>,
        registry: &mut CapabilityRegistry,
        observer: &dyn Observer,
    ) -> Result<()> {
        let server = session.server_name().to_string();
        let discovery_failure = |source| ChatError::DiscoveryFailure {
            server: server.clone(),
            source,
        };

        let tools = session.list_tools().await.map_err(discovery_failure)?;
        observer.observe(&ChatEvent::ServerConnected {
            server: server.clone(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });
        for tool in tools {
            registry.register(tool.name.clone(), session);
            self.tools.push(tool);
        }

        let prompts = session.list_prompts().await.map_err(discovery_failure)?;
        for prompt in prompts {
            registry.register(prompt.name.clone(), session);
            self.prompts.push(prompt);
        }

        let resources = session.list_resources().await.map_err(discovery_failure)?;
        for resource in resources {
            registry.register(resource.uri.clone(), session);
            self.resources.push(resource);
        }

        tracing::info!(
            name: "mcp.server.connected",
            server = %server,
            "MCP server connected and discovered"
        );
        Ok(())
    }

    /// Tools from every server, in discovery order.
    pub fn tools(&self) -> &[CapabilityDescriptor] {
        &self.tools
    }

    pub fn prompts(&self) -> &[PromptDescriptor] {
        &self.prompts
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    /// Model-facing schema for every discovered tool.
    pub fn model_tools(&self) -> Vec<ModelFunctionSchema> {
        self.tools.iter().map(to_model_schema).collect()
    }

    /// Names of the servers currently held open, in acquisition order.
    pub fn server_names(&self) -> Vec<&str> {
        self.sessions.iter().map(|s| s.server_name()).collect()
    }

    /// Close every session, most recently opened first.
    ///
    /// Close errors are logged, never propagated. Calling this again is a
    /// no-op.
    pub async fn shutdown(&mut self) {
        while let Some(session) = self.sessions.pop() {
            let server = session.server_name().to_string();
            match session.close().await {
                Ok(()) => tracing::info!(
                    name: "mcp.server.closed",
                    server = %server,
                    "MCP server session closed"
                ),
                Err(e) => tracing::warn!(
                    name: "mcp.server.close_failed",
                    server = %server,
                    error = %e,
                    "Failed to close MCP server session"
                ),
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if !self.sessions.is_empty() {
            tracing::warn!(
                name: "mcp.shutdown.skipped",
                session_count = self.sessions.len(),
                "ConnectionManager dropped without shutdown; sessions released without close"
            );
        }
    }
}
