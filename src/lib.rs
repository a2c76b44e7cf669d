//! MCP Chatbot
//!
//! A terminal chatbot that lets a language model act through tools, prompts
//! and resources served by any number of Model Context Protocol servers.
//!
//! # Architecture
//!
//! - **MCP Client**: Connection lifecycle and capability routing across servers
//! - **LLM Orchestration**: Chat Completions driver and the bounded ask/act loop
//! - **Shell**: Line commands for queries, `@topic` resources and `/prompt` runs
//!
//! # Modules
//!
//! - [`mcp`]: Server configuration, sessions, registry and connection manager
//! - [`llm`]: Driver trait, provider handling, schema adaptation and the loop
//! - [`resources`]: One-shot resource reads with scheme fallback
//! - [`prompts`]: Prompt rendering and execution
//! - [`normalized`]: Observable chat events
//! - [`chatbot`]: Interactive shell

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod chatbot;
pub mod commands;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod normalized;
pub mod prompts;
pub mod resources;
pub mod telemetry;

pub use chatbot::ChatBot;
pub use error::{ChatError, Result};
