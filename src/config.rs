use crate::error::ChatError;
use crate::llm::{LlmSettings, LoopConfig, Provider};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path (YAML, TOML or JSON)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// MCP server configuration file
    #[arg(short, long, env = "MCP_SERVERS_FILE")]
    pub servers: Option<String>,

    /// Model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum model turns per query
    #[arg(long)]
    pub max_turns: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub deployment_name: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub servers_file: String,
    pub max_turns: usize,
    pub connect_timeout_secs: u64,
    pub call_timeout_secs: u64,
    pub model_timeout_secs: u64,
    pub resource_scheme: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Priority: CLI flag > direct env var > `MCP_CHAT__` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("llm.base_url", "https://api.openai.com")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.max_tokens", 2024)?
            .set_default("llm.temperature", 0.0)?
            .set_default("chat.servers_file", "server_config.json")?
            .set_default("chat.max_turns", 10)?
            .set_default("chat.connect_timeout_secs", 30)?
            .set_default("chat.call_timeout_secs", 60)?
            .set_default("chat.model_timeout_secs", 120)?
            .set_default("chat.resource_scheme", "papers://")?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            // ./config.{yaml,toml,json} when present
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. MCP_CHAT__CHAT__MAX_TURNS=4
        builder = builder.add_source(
            Environment::with_prefix("MCP_CHAT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        // Direct env vars shared with other OpenAI-style tools
        for (var, key) in [
            ("LLM_BASE_URL", "llm.base_url"),
            ("LLM_MODEL", "llm.model"),
            ("AZURE_DEPLOYMENT_NAME", "llm.deployment_name"),
            ("AZURE_API_VERSION", "llm.api_version"),
        ] {
            if let Some(val) = non_empty_env(var) {
                builder = builder.set_override(key, val)?;
            }
        }
        if let Some(key) = non_empty_env("LLM_API_KEY").or_else(|| non_empty_env("DIAL_API_KEY")) {
            builder = builder.set_override("llm.api_key", key)?;
        }

        if let Some(servers) = cli.servers {
            builder = builder.set_override("chat.servers_file", servers)?;
        }
        if let Some(model) = cli.model {
            builder = builder.set_override("llm.model", model)?;
        }
        if let Some(turns) = cli.max_turns {
            builder = builder.set_override("chat.max_turns", turns)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Driver settings, with the provider resolved from URL and Azure options.
    pub fn llm_settings(&self) -> Result<LlmSettings, ChatError> {
        let llm = &self.llm;
        if llm.base_url.trim().is_empty() {
            return Err(ChatError::Config("llm.base_url cannot be empty".to_string()));
        }
        if llm.model.trim().is_empty() {
            return Err(ChatError::Config("llm.model cannot be empty".to_string()));
        }

        let provider = Provider::resolve(
            &llm.base_url,
            &llm.model,
            llm.deployment_name.as_deref(),
            llm.api_version.as_deref(),
        );

        Ok(LlmSettings {
            base_url: llm.base_url.clone(),
            api_key: llm.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: llm.model.clone(),
            provider,
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        })
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            max_turns: self.chat.max_turns.max(1),
            call_timeout: self.call_timeout(),
            model_timeout: Duration::from_secs(self.chat.model_timeout_secs),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.chat.connect_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.chat.call_timeout_secs)
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.trim().is_empty())
}
