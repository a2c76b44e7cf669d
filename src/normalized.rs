//! Observation channel for startup and the ask/act loop.
//!
//! The loop runs against remote backends the user can't see, so every model
//! turn and tool invocation is reported here before the loop moves on.
//!
//! # Example
//!
//! ```rust
//! use mcp_chatbot::normalized::{ChatEvent, Observer, RecordingObserver};
//!
//! let observer = RecordingObserver::default();
//! observer.observe(&ChatEvent::ToolNotFound { name: "search".to_string() });
//! assert_eq!(observer.events().len(), 1);
//! ```

use std::io::Write;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted during startup and query processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    // ─────────────────────────────────────────────────────────────────────
    // Startup
    // ─────────────────────────────────────────────────────────────────────
    /// A server connected and listed its tools.
    #[serde(rename = "server.connected")]
    ServerConnected { server: String, tools: Vec<String> },

    /// A server could not be reached.
    #[serde(rename = "server.failed")]
    ServerFailed { server: String, error: String },

    /// A server connected but capability listing failed.
    #[serde(rename = "server.discovery_failed")]
    DiscoveryFailed { server: String, error: String },

    // ─────────────────────────────────────────────────────────────────────
    // Conversation loop
    // ─────────────────────────────────────────────────────────────────────
    /// A user query entered the loop.
    #[serde(rename = "query.start")]
    QueryStarted {
        request_id: String,
        query: String,
        started_at: DateTime<Utc>,
    },

    /// The model answered one turn.
    #[serde(rename = "model.turn")]
    ModelTurn {
        turn: usize,
        /// Number of tool calls requested in this turn.
        tool_calls: usize,
    },

    /// Final assistant text for the query.
    #[serde(rename = "assistant.message")]
    AssistantMessage { text: String },

    /// A tool call is about to execute.
    #[serde(rename = "tool_call.start")]
    ToolCallStarted {
        id: String,
        name: String,
        /// Raw arguments JSON from the model.
        arguments: String,
    },

    /// Result from executing a tool.
    #[serde(rename = "tool_result")]
    ToolResult {
        id: String,
        name: String,
        content: String,
        success: bool,
    },

    /// The model asked for a tool no session serves.
    #[serde(rename = "tool.not_found")]
    ToolNotFound { name: String },

    /// A rendered prompt is being submitted as a query.
    #[serde(rename = "prompt.rendered")]
    PromptRendered { name: String, text: String },

    /// The current query or command failed.
    #[serde(rename = "error")]
    Error { message: String },

    /// The query finished.
    #[serde(rename = "done")]
    Done,
}

/// Sink for [`ChatEvent`]s.
pub trait Observer: Send + Sync {
    fn observe(&self, event: &ChatEvent);
}

/// Prints events to stdout in a human-readable form.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

impl ConsoleObserver {
    fn render(event: &ChatEvent) -> Option<String> {
        let line = match event {
            ChatEvent::ServerConnected { server, tools } => {
                format!("\nConnected to {server} with tools: {tools:?}")
            }
            ChatEvent::ServerFailed { server, error } => {
                format!("Failed to connect to {server}: {error}")
            }
            ChatEvent::DiscoveryFailed { server, error } => {
                format!("Error listing capabilities of {server}: {error}")
            }
            ChatEvent::QueryStarted { query, .. } => format!("\nProcessing query: {query}"),
            ChatEvent::ModelTurn { .. } | ChatEvent::Done => return None,
            ChatEvent::AssistantMessage { text } => text.clone(),
            ChatEvent::ToolCallStarted {
                name, arguments, ..
            } => format!(" {name} : {arguments}"),
            ChatEvent::ToolResult {
                content, success, ..
            } => {
                if *success {
                    format!("Tool call result: {content}")
                } else {
                    format!("Tool call failed: {content}")
                }
            }
            ChatEvent::ToolNotFound { name } => {
                format!("Tool {name} not found in available sessions.")
            }
            ChatEvent::PromptRendered { name, text } => {
                format!("\nExecuting prompt '{name}': {text}")
            }
            ChatEvent::Error { message } => format!("\nError: {message}"),
        };
        Some(line)
    }
}

impl Observer for ConsoleObserver {
    fn observe(&self, event: &ChatEvent) {
        if let Some(line) = Self::render(event) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }
    }
}

/// Keeps every event in memory; used by tests and by callers that want to
/// inspect a finished query.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ChatEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ChatEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Observer for RecordingObserver {
    fn observe(&self, event: &ChatEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
