//! `modalmate`: drive the modal controller against a simulated window.

mod cli;
mod replay;

use anyhow::{Context, Result};
use clap::Parser;
use cli::ReplayConfig;
use modalmate::host::sim::SimWindow;
use modalmate::keys::KeyStroke;
use modalmate::modal::{ControllerSettings, ModalWindowController};
use modalmate::router::EventRouterClient;
use modalmate::{init_logging, init_tracing, install_panic_hook, log_debug, log_file_path};

fn main() -> Result<()> {
    let mut config = ReplayConfig::parse();
    config.router.validate()?;
    init_logging(&config.router.logging);
    init_tracing(&config.router.logging);
    install_panic_hook();
    log_debug("=== modalmate replay started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let strokes = KeyStroke::parse_sequence(&config.keys).context("invalid --keys value")?;
    let settings = ControllerSettings::from_config(&config.router)?;
    let client = EventRouterClient::from_config(&config.router)?;
    let mut controller = ModalWindowController::new(client, settings);
    if controller.start_router() != 0 {
        log_debug("engine did not start; keys go straight to the window");
    }

    let mut window = SimWindow::new(&config.text).with_class(config.window_class.clone());
    let report = replay::replay(
        &mut window,
        &mut controller,
        &strokes,
        &config.router.eligible_window_classes,
    );
    let json = if config.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}
