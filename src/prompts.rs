//! Prompt listing and execution.
//!
//! A prompt renders to text on its backend; that text is then submitted as a
//! new query, so executing a prompt always ends in the conversation loop.

use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::error::{ChatError, Result, with_deadline};
use crate::llm::{Orchestrator, QueryOutcome};
use crate::mcp::registry::CapabilityRegistry;
use crate::mcp::types::PromptDescriptor;
use crate::normalized::{ChatEvent, Observer};

/// Renders prompts and hands them to the [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct PromptExecutor {
    registry: Arc<CapabilityRegistry>,
    prompts: Arc<[PromptDescriptor]>,
    call_timeout: Duration,
}

impl PromptExecutor {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        prompts: Vec<PromptDescriptor>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            prompts: prompts.into(),
            call_timeout,
        }
    }

    /// Every prompt discovered at startup.
    pub fn list(&self) -> &[PromptDescriptor] {
        &self.prompts
    }

    /// Render `name` with `args` to a single string.
    ///
    /// Returns `None` when the backend produced no messages or only empty
    /// text.
    pub async fn render(&self, name: &str, args: &HashMap<String, String>) -> Result<Option<String>> {
        let session = self.registry.lookup(name)?;

        let rendered = with_deadline(
            format!("prompts/get {name}"),
            self.call_timeout,
            session.get_prompt(name, args),
        )
        .await?
        .map_err(|source| {
            tracing::error!(prompt = %name, error = %source, "Prompt render failed");
            ChatError::BackendCallFailure {
                operation: "prompts/get",
                target: name.to_string(),
                source,
            }
        })?;

        let text = rendered
            .messages
            .first()
            .map(|m| m.content.normalize_to_text())
            .filter(|t| !t.trim().is_empty());
        Ok(text)
    }

    /// Render `name` and run the result through the conversation loop.
    ///
    /// Returns `Ok(None)` when the prompt rendered nothing to submit.
    pub async fn execute(
        &self,
        name: &str,
        args: &HashMap<String, String>,
        orchestrator: &Orchestrator,
        observer: &dyn Observer,
    ) -> Result<Option<QueryOutcome>> {
        let Some(text) = self.render(name, args).await? else {
            tracing::warn!(prompt = %name, "Prompt rendered no content");
            return Ok(None);
        };

        tracing::info!(prompt = %name, text_length = text.len(), "Executing prompt");
        observer.observe(&ChatEvent::PromptRendered {
            name: name.to_string(),
            text: text.clone(),
        });

        orchestrator.process_query(&text, observer).await.map(Some)
    }
}
