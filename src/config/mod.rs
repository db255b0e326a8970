//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{ArgAction, Args, Parser};
use std::time::Duration;

use defaults::DEFAULT_ENGINE_CMD;
pub use defaults::{
    DEFAULT_MAX_QUERY_ROUNDS, DEFAULT_ROUTER_TIMEOUT_MS, MAX_QUERY_ROUNDS_LIMIT,
    MAX_ROUTER_TIMEOUT_MS, MIN_ROUTER_TIMEOUT_MS,
};

/// Router and modal-controller options. Validated values keep the engine subprocess safe.
#[derive(Debug, Parser, Clone)]
#[command(about = "Modal key routing for editor windows", author, version)]
pub struct RouterConfig {
    /// Decision engine executable (known name or path)
    #[arg(long = "engine-cmd", env = "MODALMATE_ENGINE_CMD", default_value = DEFAULT_ENGINE_CMD)]
    pub engine_cmd: String,

    /// Extra arguments for the decision engine (shell-quoted)
    #[arg(
        long = "engine-args",
        env = "MODALMATE_ENGINE_ARGS",
        value_name = "ARGS",
        allow_hyphen_values = true
    )]
    pub engine_args: Option<String>,

    /// How long to wait for one engine reply (milliseconds)
    #[arg(long = "router-timeout-ms", default_value_t = DEFAULT_ROUTER_TIMEOUT_MS)]
    pub router_timeout_ms: u64,

    /// Query/reply round trips allowed for a single input event
    #[arg(long = "max-query-rounds", default_value_t = DEFAULT_MAX_QUERY_ROUNDS)]
    pub max_query_rounds: usize,

    /// Keystroke forwarded to the engine while in insert mode (repeatable)
    #[arg(
        long = "insert-trigger",
        action = ArgAction::Append,
        value_name = "KEY",
        default_values = ["<esc>"]
    )]
    pub insert_trigger: Vec<String>,

    /// Menu shortcut suppressed while in command mode (repeatable)
    #[arg(
        long = "reserved-shortcut",
        action = ArgAction::Append,
        value_name = "KEY",
        default_values = ["<C-d>", "<C-u>"]
    )]
    pub reserved_shortcut: Vec<String>,

    /// Window class that gets a modal controller (repeatable)
    #[arg(
        long = "eligible-window-class",
        action = ArgAction::Append,
        value_name = "CLASS",
        default_values = ["OakProjectWindow", "OakDocumentWindow"]
    )]
    pub eligible_window_classes: Vec<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

/// File-logging switches shared by both binaries.
#[derive(Debug, Args, Clone, Default)]
pub struct LoggingArgs {
    /// Enable file logging (debug)
    #[arg(long = "logs", env = "MODALMATE_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "MODALMATE_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging key characters and selected text (debug log only)
    #[arg(
        long = "log-content",
        env = "MODALMATE_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,
}

impl LoggingArgs {
    pub fn enabled(&self) -> bool {
        self.logs && !self.no_logs
    }

    pub fn content_enabled(&self) -> bool {
        self.enabled() && self.log_content
    }
}

/// Options for the reference decision engine.
#[derive(Debug, Parser, Clone)]
#[command(about = "Reference modal decision engine", author, version)]
pub struct EngineConfig {
    /// Extra key mapping, `[insert:]KEYS=COMMAND` (repeatable)
    #[arg(long = "map", action = ArgAction::Append, value_name = "MAPPING")]
    pub mappings: Vec<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

impl RouterConfig {
    pub fn logging_enabled(&self) -> bool {
        self.logging.enabled()
    }

    pub fn router_timeout(&self) -> Duration {
        Duration::from_millis(self.router_timeout_ms)
    }
}
