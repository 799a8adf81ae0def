//! Terminal chat client for a conversation-keeping LLM backend.

pub mod app;
pub mod backend;
pub mod commands;
pub mod config;
pub mod events;
pub mod history;
pub mod logging;
pub mod markdown;
pub mod prompts;
pub mod session;
pub mod storage;
pub mod store;
pub mod timefmt;
pub mod tui;
pub mod ui;
