//! Reference decision engine, spoken to over stdin/stdout.

use anyhow::Result;
use clap::Parser;
use modalmate::config::EngineConfig;
use modalmate::engine::{self, EventHandler};
use modalmate::{init_logging, init_tracing, install_panic_hook, log_debug, log_file_path};
use std::io;

fn main() -> Result<()> {
    let config = EngineConfig::parse();
    init_logging(&config.logging);
    init_tracing(&config.logging);
    install_panic_hook();
    log_debug("=== modalmate engine started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let keymap = engine::keymap_from_config(&config)?;
    let mut handler = EventHandler::new(keymap);
    tracing::info!(mappings = config.mappings.len(), "engine ready");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    engine::run(stdin.lock(), &mut writer, &mut handler)
}
