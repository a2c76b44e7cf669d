//! Model Context Protocol (MCP) client side.
//!
//! Connects to stdio and HTTP MCP servers, discovers their tools, prompts
//! and resources, and routes each capability name to the session serving it.
//!
//! # Configuration
//!
//! Servers are configured via `server_config.json`:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "research": {
//!       "command": "uv",
//!       "args": ["run", "research_server.py"]
//!     },
//!     "fetch": {
//!       "command": "uvx",
//!       "args": ["mcp-server-fetch"],
//!       "env": { "HTTPS_PROXY": "${HTTPS_PROXY}" }
//!     }
//!   }
//! }
//! ```
//!
//! # Naming
//!
//! Capability names are not namespaced. When two servers expose the same
//! name, the one discovered last serves it.

pub mod config;
pub mod connection;
pub mod registry;
pub mod session;
pub mod types;

pub use config::{McpConfig, McpServerEntry, load_mcp_config};
pub use connection::{ConnectionManager, Connector, RmcpConnector};
pub use registry::CapabilityRegistry;
pub use session::{RmcpSession, Session};
