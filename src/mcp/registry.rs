//! Capability name/URI → session routing table.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use crate::error::{ChatError, Result};
use crate::mcp::session::Session;

/// Maps tool names, prompt names and resource URIs to the session serving
/// them.
///
/// The registry never owns a session: entries are [`Weak`] handles into the
/// [`ConnectionManager`](crate::mcp::connection::ConnectionManager)'s release
/// list, so once the group is shut down every lookup reports not-found.
///
/// Built mutably during startup discovery, then shared read-only.
#[derive(Default)]
pub struct CapabilityRegistry {
    // registration order, for prefix fallback
    keys: Vec<String>,
    sessions: HashMap<String, Weak<dyn Session>>,
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("key_count", &self.keys.len())
            .finish()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `session`. A key registered twice keeps its original
    /// position but resolves to the later session.
    pub fn register(&mut self, key: impl Into<String>, session: &Arc<dyn Session>) {
        let key = key.into();
        let handle = Arc::downgrade(session);

        if let Some(previous) = self.sessions.insert(key.clone(), handle) {
            let previous = previous
                .upgrade()
                .map_or_else(|| "<closed>".to_string(), |s| s.server_name().to_string());
            tracing::warn!(
                name: "registry.key.overwritten",
                key = %key,
                previous_server = %previous,
                server = %session.server_name(),
                "Capability name registered by more than one server; last registration wins"
            );
        } else {
            self.keys.push(key);
        }
    }

    /// Exact lookup.
    pub fn lookup(&self, key: &str) -> Result<Arc<dyn Session>> {
        self.resolve(key)
            .ok_or_else(|| ChatError::not_found(kind_of(key), key))
    }

    /// Exact lookup, falling back to any session registered under a key
    /// sharing `prefix` when `key` itself starts with `prefix`.
    ///
    /// The first matching key in registration order wins.
    pub fn lookup_with_prefix_fallback(&self, key: &str, prefix: &str) -> Result<Arc<dyn Session>> {
        if let Some(session) = self.resolve(key) {
            return Ok(session);
        }

        if !prefix.is_empty() && key.starts_with(prefix) {
            let fallback = self
                .keys
                .iter()
                .filter(|k| k.starts_with(prefix))
                .find_map(|k| self.resolve(k));
            if let Some(session) = fallback {
                tracing::debug!(
                    name: "registry.prefix.fallback",
                    key = %key,
                    prefix = %prefix,
                    server = %session.server_name(),
                    "Resolved by prefix fallback"
                );
                return Ok(session);
            }
        }

        Err(ChatError::not_found(kind_of(key), key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resolve(key).is_some()
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn resolve(&self, key: &str) -> Option<Arc<dyn Session>> {
        self.sessions.get(key).and_then(Weak::upgrade)
    }
}

fn kind_of(key: &str) -> &'static str {
    if key.contains("://") {
        "resource"
    } else {
        "capability"
    }
}
