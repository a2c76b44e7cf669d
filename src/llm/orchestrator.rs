//! The ask/act loop for a single user query.
//!
//! The orchestrator manages the complete lifecycle of one query:
//! 1. Send the conversation and every registered tool to the model
//! 2. Stop if the model answers without tool calls
//! 3. Otherwise execute the requested calls, one at a time, in order
//! 4. Feed the results back and ask the model again
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_chatbot::llm::{ChatCompletionsDriver, LoopConfig, Orchestrator};
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(ChatCompletionsDriver::new(settings)),
//!     registry,
//!     manager.model_tools(),
//!     LoopConfig::default(),
//! );
//! let outcome = orchestrator.process_query("Find papers on qubits", &ConsoleObserver).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ChatError, Result, with_deadline};
use crate::mcp::registry::CapabilityRegistry;
use crate::normalized::{ChatEvent, Observer};

use super::{LlmDriver, LlmRequest, Message, ModelFunctionSchema, ToolCall};

/// Default cap on model calls per query.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Loop bounds.
#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    /// Maximum model calls for one query.
    pub max_turns: usize,
    /// Deadline for each tool call.
    pub call_timeout: Duration,
    /// Deadline for each model call.
    pub model_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            call_timeout: Duration::from_secs(60),
            model_timeout: Duration::from_secs(120),
        }
    }
}

/// States of the ask/act loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    ExecutingTools,
    Done,
}

/// Why a query finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The model answered without requesting tools.
    Completed,
    /// The model requested a tool no session serves; remaining calls in
    /// that turn were skipped.
    ToolNotFound(String),
}

/// Result of one [`Orchestrator::process_query`] call.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub request_id: String,
    pub started_at: DateTime<Utc>,
    /// Always [`LoopState::Done`] for a returned outcome.
    pub state: LoopState,
    pub stop: StopReason,
    /// Text of the final assistant message, if any.
    pub answer: Option<String>,
    /// Number of model calls made.
    pub model_calls: usize,
    /// The full conversation, discarded by callers after display.
    pub conversation: Vec<Message>,
}

/// LLM orchestrator with tool loop execution.
#[derive(Clone)]
pub struct Orchestrator {
    driver: Arc<dyn LlmDriver>,
    registry: Arc<CapabilityRegistry>,
    tools: Arc<[ModelFunctionSchema]>,
    config: LoopConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("tool_count", &self.tools.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        driver: Arc<dyn LlmDriver>,
        registry: Arc<CapabilityRegistry>,
        tools: Vec<ModelFunctionSchema>,
        config: LoopConfig,
    ) -> Self {
        Self {
            driver,
            registry,
            tools: tools.into(),
            config,
        }
    }

    /// Get the capability registry.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Tools offered to the model on every turn.
    #[must_use]
    pub fn tools(&self) -> &[ModelFunctionSchema] {
        &self.tools
    }

    /// Run one user query to completion.
    pub async fn process_query(&self, query: &str, observer: &dyn Observer) -> Result<QueryOutcome> {
        let request_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        tracing::info!(
            request_id = %request_id,
            tool_count = self.tools.len(),
            "Starting query"
        );
        observer.observe(&ChatEvent::QueryStarted {
            request_id: request_id.clone(),
            query: query.to_string(),
            started_at,
        });

        let result = self.run_loop(&request_id, started_at, query, observer).await;
        let elapsed_ms = (Utc::now() - started_at).num_milliseconds();
        match &result {
            Ok(outcome) => {
                tracing::info!(
                    request_id = %request_id,
                    elapsed_ms,
                    model_calls = outcome.model_calls,
                    stop = ?outcome.stop,
                    "Query finished"
                );
                observer.observe(&ChatEvent::Done);
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, elapsed_ms, error = %e, "Query aborted");
                observer.observe(&ChatEvent::Error {
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn run_loop(
        &self,
        request_id: &str,
        started_at: DateTime<Utc>,
        query: &str,
        observer: &dyn Observer,
    ) -> Result<QueryOutcome> {
        let mut conversation = vec![Message::user(query)];
        let mut state = LoopState::AwaitingModel;
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut model_calls = 0;
        let mut answer = None;
        let mut stop = StopReason::Completed;

        while state != LoopState::Done {
            match state {
                LoopState::AwaitingModel => {
                    if model_calls >= self.config.max_turns {
                        tracing::error!(
                            request_id = %request_id,
                            max_turns = self.config.max_turns,
                            "Maximum model turns exceeded"
                        );
                        return Err(ChatError::MaxTurnsExceeded(self.config.max_turns));
                    }
                    model_calls += 1;

                    let req = LlmRequest {
                        messages: conversation.clone(),
                        tools: self.tools.to_vec(),
                    };
                    tracing::debug!(
                        request_id = %request_id,
                        turn = model_calls,
                        message_count = req.messages.len(),
                        "Sending request to LLM driver"
                    );

                    let reply = with_deadline(
                        "model call",
                        self.config.model_timeout,
                        self.driver.complete(req),
                    )
                    .await?
                    .map_err(ChatError::Model)?;

                    observer.observe(&ChatEvent::ModelTurn {
                        turn: model_calls,
                        tool_calls: reply.tool_calls.len(),
                    });
                    tracing::info!(
                        request_id = %request_id,
                        turn = model_calls,
                        tool_calls = reply.tool_calls.len(),
                        "Model turn complete"
                    );

                    if reply.tool_calls.is_empty() {
                        let text = reply.content.clone().unwrap_or_default();
                        observer.observe(&ChatEvent::AssistantMessage { text: text.clone() });
                        answer = Some(text);
                        state = LoopState::Done;
                    } else {
                        pending.clone_from(&reply.tool_calls);
                        state = LoopState::ExecutingTools;
                    }
                    conversation.push(reply.into());
                }

                LoopState::ExecutingTools => {
                    state = LoopState::AwaitingModel;
                    for call in pending.drain(..) {
                        if let Some(missing) = self
                            .execute_tool(request_id, &call, &mut conversation, observer)
                            .await?
                        {
                            stop = StopReason::ToolNotFound(missing);
                            state = LoopState::Done;
                            break;
                        }
                    }
                }

                LoopState::Done => {}
            }
        }

        Ok(QueryOutcome {
            request_id: request_id.to_string(),
            started_at,
            state,
            stop,
            answer,
            model_calls,
            conversation,
        })
    }

    /// Execute one tool call and append its result.
    ///
    /// Returns the tool name when no session serves it, which ends the turn.
    async fn execute_tool(
        &self,
        request_id: &str,
        call: &ToolCall,
        conversation: &mut Vec<Message>,
        observer: &dyn Observer,
    ) -> Result<Option<String>> {
        let name = call.name();
        observer.observe(&ChatEvent::ToolCallStarted {
            id: call.id.clone(),
            name: name.to_string(),
            arguments: call.function.arguments.clone(),
        });

        let session = match self.registry.lookup(name) {
            Ok(session) => session,
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    request_id = %request_id,
                    tool_id = %call.id,
                    tool_name = %name,
                    "Tool not found in any session"
                );
                observer.observe(&ChatEvent::ToolNotFound {
                    name: name.to_string(),
                });
                return Ok(Some(name.to_string()));
            }
            Err(e) => return Err(e),
        };

        let arguments = call
            .parsed_arguments()
            .map_err(|source| ChatError::ArgumentParseFailure {
                tool: name.to_string(),
                source,
            })?;

        tracing::info!(
            request_id = %request_id,
            tool_id = %call.id,
            tool_name = %name,
            server = %session.server_name(),
            "Executing tool call"
        );

        let result = with_deadline(
            format!("tools/call {name}"),
            self.config.call_timeout,
            session.call_tool(name, arguments),
        )
        .await
        .and_then(|res| {
            res.map_err(|source| ChatError::BackendCallFailure {
                operation: "tools/call",
                target: name.to_string(),
                source,
            })
        });

        let (content, success) = match result {
            Ok(output) => {
                let content = output.to_message_content();
                tracing::debug!(
                    request_id = %request_id,
                    tool_id = %call.id,
                    result_length = content.len(),
                    is_error = output.is_error,
                    "Tool call succeeded"
                );
                (content, !output.is_error)
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    tool_id = %call.id,
                    tool_name = %name,
                    error = %e,
                    "Tool call failed"
                );
                (format!("Error: {e}"), false)
            }
        };

        observer.observe(&ChatEvent::ToolResult {
            id: call.id.clone(),
            name: name.to_string(),
            content: content.clone(),
            success,
        });
        conversation.push(Message::tool_result(call.id.clone(), content));
        Ok(None)
    }
}
