//! Interactive shell over the registry, the loop and the one-shot readers.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::commands::{Command, PROMPT_USAGE, parse_input};
use crate::error::Result;
use crate::llm::Orchestrator;
use crate::normalized::{ChatEvent, Observer};
use crate::prompts::PromptExecutor;
use crate::resources::{ResourceFetch, ResourceFetcher};

const BANNER: &str = "\nMCP Chatbot Started!
Type your queries or 'quit' to exit.
Use @folders to see available topics
Use @<topic> to search papers in that topic
Use /prompts to list available prompts
Use /prompt <name> <arg1=value1> to execute a prompt";

/// Everything one interactive session needs.
pub struct ChatBot {
    orchestrator: Orchestrator,
    resources: ResourceFetcher,
    prompts: PromptExecutor,
    observer: Arc<dyn Observer>,
}

impl std::fmt::Debug for ChatBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatBot")
            .field("orchestrator", &self.orchestrator)
            .field("resources", &self.resources)
            .field("prompts", &self.prompts)
            .finish_non_exhaustive()
    }
}

impl ChatBot {
    pub fn new(
        orchestrator: Orchestrator,
        resources: ResourceFetcher,
        prompts: PromptExecutor,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            orchestrator,
            resources,
            prompts,
            observer,
        }
    }

    /// Read lines until `quit` or end of input.
    ///
    /// A failing line is reported and the loop keeps reading.
    pub async fn run<R, W>(&self, input: R, mut out: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        out.write_all(format!("{BANNER}\n").as_bytes()).await?;
        let mut lines = input.lines();

        loop {
            out.write_all(b"\nQuery: ").await?;
            out.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if self.handle_line(&line, &mut out).await?.is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Dispatch one input line.
    pub async fn handle_line<W>(&self, line: &str, out: &mut W) -> std::io::Result<ControlFlow<()>>
    where
        W: AsyncWrite + Unpin,
    {
        let command = parse_input(line);
        let is_query = matches!(command, Command::Query(_));

        let result = match command {
            Command::Empty => Ok(()),
            Command::Quit => return Ok(ControlFlow::Break(())),
            Command::Resource { topic } => match self.show_resource(&topic).await {
                Ok(text) => {
                    out.write_all(text.as_bytes()).await?;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Command::ListPrompts => {
                self.list_prompts(out).await?;
                Ok(())
            }
            Command::PromptUsage => {
                out.write_all(format!("{PROMPT_USAGE}\n").as_bytes()).await?;
                Ok(())
            }
            Command::RunPrompt {
                name,
                args,
                rejected,
            } => {
                for arg in &rejected {
                    out.write_all(format!("Invalid argument format: {arg}\n").as_bytes())
                        .await?;
                }
                match self
                    .prompts
                    .execute(&name, &args, &self.orchestrator, self.observer.as_ref())
                    .await
                {
                    Ok(Some(_)) => Ok(()),
                    Ok(None) => {
                        out.write_all(format!("Prompt '{name}' rendered no content.\n").as_bytes())
                            .await?;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            Command::Unknown(command) => {
                out.write_all(format!("Unknown command: {command}\n").as_bytes())
                    .await?;
                Ok(())
            }
            Command::Query(query) => self
                .orchestrator
                .process_query(&query, self.observer.as_ref())
                .await
                .map(|_| ()),
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Command failed");
            // the loop already reported its own failures
            if !is_query {
                self.observer.observe(&ChatEvent::Error {
                    message: e.to_string(),
                });
            }
        }
        out.flush().await?;
        Ok(ControlFlow::Continue(()))
    }

    /// Render the `@topic` read for display.
    async fn show_resource(&self, topic: &str) -> Result<String> {
        let uri = self.resources.topic_uri(topic);
        let fetched = self.resources.fetch(&uri).await?;

        Ok(match &fetched {
            ResourceFetch::Empty => "No contents available\n".to_string(),
            ResourceFetch::Contents(_) => format!(
                "\nResource: {uri}\nContents:\n{}\n",
                fetched.first_text().unwrap_or_default()
            ),
        })
    }

    async fn list_prompts<W>(&self, out: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let prompts = self.prompts.list();
        if prompts.is_empty() {
            return out.write_all(b"No prompts available.\n").await;
        }

        let mut text = String::from("\nAvailable Prompts:\n");
        for prompt in prompts {
            text.push_str(&format!("- {}: {}\n", prompt.name, prompt.description));
            for arg in &prompt.arguments {
                text.push_str(&format!("     - {}\n", arg.name));
            }
        }
        out.write_all(text.as_bytes()).await
    }
}
