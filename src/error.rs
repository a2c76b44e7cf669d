//! Error taxonomy for the chatbot core.
//!
//! Every failure is either absorbed with a log line (startup keeps going) or
//! ends the current query/command. Nothing here is fatal to the process.

use std::time::Duration;

use thiserror::Error;

/// Chatbot error type.
#[derive(Error, Debug)]
pub enum ChatError {
    /// A backend could not be reached; its capabilities never register.
    #[error("failed to connect to MCP server '{server}': {source}")]
    ConnectionFailure {
        /// Configured server name.
        server: String,
        /// Underlying transport error.
        #[source]
        source: anyhow::Error,
    },

    /// A backend connected but listing its capabilities failed.
    #[error("capability discovery failed for MCP server '{server}': {source}")]
    DiscoveryFailure {
        /// Configured server name.
        server: String,
        /// Underlying protocol error.
        #[source]
        source: anyhow::Error,
    },

    /// No live session is registered for the tool, prompt or resource.
    #[error("{kind} '{key}' not found in available sessions")]
    CapabilityNotFound {
        /// `"resource"` for URIs, `"capability"` otherwise.
        kind: &'static str,
        /// The requested name or URI.
        key: String,
    },

    /// Tool-call arguments from the model are not valid JSON.
    #[error("invalid arguments for tool '{tool}': {source}")]
    ArgumentParseFailure {
        /// Tool the model tried to call.
        tool: String,
        /// JSON parse error.
        #[source]
        source: serde_json::Error,
    },

    /// `call_tool`, `get_prompt` or `read_resource` raised.
    #[error("{operation} '{target}' failed: {source}")]
    BackendCallFailure {
        /// Session operation name.
        operation: &'static str,
        /// Tool/prompt name or resource URI.
        target: String,
        /// Backend error.
        #[source]
        source: anyhow::Error,
    },

    /// A suspension point exceeded its deadline.
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        /// What was being awaited.
        operation: String,
        /// The configured deadline.
        after: Duration,
    },

    /// The model call itself failed.
    #[error("model call failed: {0}")]
    Model(#[source] anyhow::Error),

    /// The ask/act loop hit its turn cap.
    #[error("maximum of {0} model turns exceeded")]
    MaxTurnsExceeded(usize),

    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ChatError {
    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::CapabilityNotFound {
            kind,
            key: key.into(),
        }
    }

    /// Whether this is an expected "nothing registered" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CapabilityNotFound { .. })
    }
}

/// Result type alias for chatbot operations.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Await `fut` for at most `after`, mapping expiry to [`ChatError::Timeout`].
pub(crate) async fn with_deadline<T, F>(
    operation: impl Into<String>,
    after: Duration,
    fut: F,
) -> Result<T>
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_elapsed| ChatError::Timeout {
            operation: operation.into(),
            after,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_key() {
        let err = ChatError::not_found("tool", "search_papers");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "tool 'search_papers' not found in available sessions"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_maps_to_timeout() {
        let res = with_deadline(
            "tools/call search",
            Duration::from_secs(5),
            tokio::time::sleep(Duration::from_secs(10)),
        )
        .await;
        assert!(matches!(res, Err(ChatError::Timeout { .. })));
    }
}
