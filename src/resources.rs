//! One-shot resource reads.

use std::{sync::Arc, time::Duration};

use crate::error::{ChatError, Result, with_deadline};
use crate::mcp::registry::CapabilityRegistry;
use crate::mcp::types::ResourceContent;

/// Scheme whose URIs fall back to any session serving the same scheme.
pub const DEFAULT_RESOURCE_SCHEME: &str = "papers://";

/// Outcome of a successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceFetch {
    Contents(Vec<ResourceContent>),
    /// The backend answered but returned nothing.
    Empty,
}

impl ResourceFetch {
    /// Text of the first content entry.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Self::Contents(contents) => contents.first().and_then(|c| c.text.as_deref()),
            Self::Empty => None,
        }
    }
}

/// Reads resources through the registry.
#[derive(Debug, Clone)]
pub struct ResourceFetcher {
    registry: Arc<CapabilityRegistry>,
    fallback_scheme: String,
    call_timeout: Duration,
}

impl ResourceFetcher {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        fallback_scheme: impl Into<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            fallback_scheme: fallback_scheme.into(),
            call_timeout,
        }
    }

    pub fn fallback_scheme(&self) -> &str {
        &self.fallback_scheme
    }

    /// URI for an `@topic` shortcut (`@folders` → `papers://folders`).
    pub fn topic_uri(&self, topic: &str) -> String {
        format!("{}{}", self.fallback_scheme, topic.trim())
    }

    /// Read `uri`, falling back within the configured scheme.
    pub async fn fetch(&self, uri: &str) -> Result<ResourceFetch> {
        let session = self
            .registry
            .lookup_with_prefix_fallback(uri, &self.fallback_scheme)?;

        tracing::info!(
            uri = %uri,
            server = %session.server_name(),
            "Reading resource"
        );

        let contents = with_deadline(
            format!("resources/read {uri}"),
            self.call_timeout,
            session.read_resource(uri),
        )
        .await?
        .map_err(|source| {
            tracing::error!(uri = %uri, error = %source, "Resource read failed");
            ChatError::BackendCallFailure {
                operation: "resources/read",
                target: uri.to_string(),
                source,
            }
        })?;

        if contents.is_empty() {
            Ok(ResourceFetch::Empty)
        } else {
            Ok(ResourceFetch::Contents(contents))
        }
    }
}
