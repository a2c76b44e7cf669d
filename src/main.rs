//! MCP Chatbot
//!
//! Entry point for the interactive terminal chatbot.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::process::ExitCode;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::io::BufReader;
use tracing::info;

use mcp_chatbot::ChatBot;
use mcp_chatbot::config::AppConfig;
use mcp_chatbot::llm::{ChatCompletionsDriver, Orchestrator};
use mcp_chatbot::mcp::{CapabilityRegistry, ConnectionManager, load_mcp_config};
use mcp_chatbot::normalized::{ConsoleObserver, Observer};
use mcp_chatbot::prompts::PromptExecutor;
use mcp_chatbot::resources::ResourceFetcher;
use mcp_chatbot::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env (if present)
    let _ = dotenv();

    telemetry::init();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let settings = match config.llm_settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        provider = ?settings.provider,
        "LLM configuration loaded"
    );

    let servers = match load_mcp_config(&config.chat.servers_file) {
        Ok(servers) => servers,
        Err(e) => {
            tracing::error!(
                name: "mcp.config.load_failed",
                path = %config.chat.servers_file,
                error = %e,
                "Failed to load MCP server configuration"
            );
            eprintln!("Error loading server configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let observer: Arc<dyn Observer> = Arc::new(ConsoleObserver);

    // MCP: connect once at startup
    let mut manager = ConnectionManager::new(config.connect_timeout());
    let mut registry = CapabilityRegistry::new();
    manager
        .connect_all(&servers, &mut registry, observer.as_ref())
        .await;
    let registry = Arc::new(registry);

    for name in registry.keys() {
        tracing::debug!(name: "mcp.capability.discovered", key = %name, "MCP capability discovered");
    }

    let orchestrator = Orchestrator::new(
        Arc::new(ChatCompletionsDriver::new(settings)),
        Arc::clone(&registry),
        manager.model_tools(),
        config.loop_config(),
    );
    let resources = ResourceFetcher::new(
        Arc::clone(&registry),
        config.chat.resource_scheme.clone(),
        config.call_timeout(),
    );
    let prompts = PromptExecutor::new(
        Arc::clone(&registry),
        manager.prompts().to_vec(),
        config.call_timeout(),
    );
    let bot = ChatBot::new(orchestrator, resources, prompts, observer);

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let status = tokio::select! {
        res = bot.run(stdin, stdout) => match res {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Terminal I/O failed");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!(name: "chat.interrupted", "Interrupted");
            ExitCode::SUCCESS
        }
    };

    // sole release point for every session
    drop(bot);
    manager.shutdown().await;
    status
}
