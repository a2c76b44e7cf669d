//! Interactive input parsing.

use std::collections::HashMap;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    Quit,
    /// `@topic` shortcut for a resource read.
    Resource { topic: String },
    ListPrompts,
    RunPrompt {
        name: String,
        args: HashMap<String, String>,
        /// Arguments without `=`, reported and skipped.
        rejected: Vec<String>,
    },
    /// `/prompt` without a name.
    PromptUsage,
    Unknown(String),
    Query(String),
}

pub const PROMPT_USAGE: &str = "Usage: /prompt <name> [arg1=value1 ...]";

pub fn parse_input(input: &str) -> Command {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Command::Empty;
    }
    if trimmed.eq_ignore_ascii_case("quit") {
        return Command::Quit;
    }

    if let Some(topic) = trimmed.strip_prefix('@') {
        return Command::Resource {
            topic: topic.trim().to_string(),
        };
    }

    if trimmed.starts_with('/') {
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let command = parts[0].to_lowercase();

        return match command.as_str() {
            "/prompts" => Command::ListPrompts,
            "/prompt" => match parts.get(1) {
                None => Command::PromptUsage,
                Some(name) => {
                    let mut args = HashMap::new();
                    let mut rejected = Vec::new();
                    for arg in &parts[2..] {
                        match arg.split_once('=') {
                            Some((key, value)) => {
                                args.insert(key.trim().to_string(), value.trim().to_string());
                            }
                            None => rejected.push((*arg).to_string()),
                        }
                    }
                    Command::RunPrompt {
                        name: (*name).to_string(),
                        args,
                        rejected,
                    }
                }
            },
            _ => Command::Unknown(command),
        };
    }

    Command::Query(trimmed.to_string())
}
