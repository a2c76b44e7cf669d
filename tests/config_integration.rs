use mcp_chatbot::config::AppConfig;
use mcp_chatbot::llm::Provider;
use serial_test::serial;
use std::env;
use std::fs;
use std::time::Duration;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        for var in [
            "CONFIG_FILE",
            "MCP_SERVERS_FILE",
            "LLM_BASE_URL",
            "LLM_MODEL",
            "LLM_API_KEY",
            "DIAL_API_KEY",
            "AZURE_DEPLOYMENT_NAME",
            "AZURE_API_VERSION",
            "MCP_CHAT__CHAT__MAX_TURNS",
            "MCP_CHAT__LLM__TEMPERATURE",
        ] {
            env::remove_var(var);
        }
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["mcp-chatbot"]).expect("Failed to load config");
    assert_eq!(config.llm.max_tokens, 2024);
    assert!(config.llm.temperature.abs() < f32::EPSILON);
    assert_eq!(config.chat.servers_file, "server_config.json");
    assert_eq!(config.chat.resource_scheme, "papers://");

    let loop_config = config.loop_config();
    assert_eq!(loop_config.max_turns, 10);
    assert_eq!(loop_config.call_timeout, Duration::from_secs(60));
    assert_eq!(config.connect_timeout(), Duration::from_secs(30));
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("MCP_CHAT__CHAT__MAX_TURNS", "4");
        env::set_var("LLM_MODEL", "gpt-4.1");
        env::set_var("DIAL_API_KEY", "dial-key");
    }

    let config = AppConfig::load_from_args(["mcp-chatbot"]).expect("Failed to load config");
    assert_eq!(config.chat.max_turns, 4);
    assert_eq!(config.llm.model, "gpt-4.1");
    assert_eq!(config.llm.api_key.as_deref(), Some("dial-key"));

    // LLM_API_KEY takes precedence over DIAL_API_KEY
    unsafe {
        env::set_var("LLM_API_KEY", "primary-key");
    }
    let config = AppConfig::load_from_args(["mcp-chatbot"]).expect("Failed to load config");
    assert_eq!(config.llm.api_key.as_deref(), Some("primary-key"));

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load_and_cli_precedence() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = dir.path().join("chatbot.toml");
    fs::write(
        &file_path,
        r#"
[llm]
model = "from-file"
temperature = 0.3

[chat]
max_turns = 6
servers_file = "research.json"
"#,
    )
    .expect("Failed to write temp config");
    let file_arg = file_path.to_string_lossy().to_string();

    let config = AppConfig::load_from_args(["mcp-chatbot", "--config", &file_arg])
        .expect("Failed to load config from file");
    assert_eq!(config.llm.model, "from-file");
    assert_eq!(config.chat.max_turns, 6);
    assert_eq!(config.chat.servers_file, "research.json");
    assert!((config.llm.temperature - 0.3).abs() < 1e-6);

    let config = AppConfig::load_from_args([
        "mcp-chatbot",
        "--config",
        &file_arg,
        "--model",
        "from-cli",
        "--max-turns",
        "2",
        "-s",
        "other.json",
    ])
    .expect("Failed to load config");
    assert_eq!(config.llm.model, "from-cli");
    assert_eq!(config.chat.max_turns, 2);
    assert_eq!(config.chat.servers_file, "other.json");
}

#[test]
#[serial]
fn test_missing_explicit_config_file_fails() {
    clear_env_vars();

    let result = AppConfig::load_from_args(["mcp-chatbot", "--config", "/nonexistent/chatbot.toml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_llm_settings_resolve_provider() {
    clear_env_vars();
    unsafe {
        env::set_var("LLM_BASE_URL", "https://ai-proxy.lab.example.com");
        env::set_var("AZURE_API_VERSION", "2024-02-01");
    }

    let config = AppConfig::load_from_args(["mcp-chatbot", "--model", "gpt-4o"])
        .expect("Failed to load config");
    let settings = config.llm_settings().expect("valid settings");
    assert_eq!(
        settings.provider,
        Provider::AzureOpenAI {
            deployment_name: "gpt-4o".to_string(),
            api_version: "2024-02-01".to_string(),
        }
    );

    clear_env_vars();
}

#[test]
#[serial]
fn test_empty_model_is_rejected() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["mcp-chatbot", "--model", " "])
        .expect("Failed to load config");
    assert!(config.llm_settings().is_err());
}
