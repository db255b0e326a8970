//! Reference decision engine: a small Vim-flavored keymap answering
//! `keyEvent` requests over stdio.
//!
//! The engine keeps its own view of the mode (re-synced from every request),
//! a queue of keys typed toward a multi-key mapping and a numeric count
//! prefix. Each request gets exactly one response frame.

mod handler;
mod keymap;

pub use handler::{error_response, EventHandler};
pub use keymap::{default_keymap, Command, Keymap, Lookup, MappingError};

use crate::config::EngineConfig;
use crate::ipc::{write_frame, FrameError, FrameReader};
use crate::log_debug;
use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};

/// Default keymap plus any `--map` overrides.
pub fn keymap_from_config(config: &EngineConfig) -> Result<Keymap> {
    let mut keymap = default_keymap();
    for mapping in &config.mappings {
        keymap
            .apply_mapping(mapping)
            .with_context(|| format!("invalid --map value '{mapping}'"))?;
    }
    Ok(keymap)
}

/// Serve requests until the host closes the stream.
///
/// A malformed line is answered with an `error` frame and the loop continues;
/// a stream that can no longer be split into frames ends the loop with an error.
pub fn run<R: BufRead, W: Write>(reader: R, writer: &mut W, handler: &mut EventHandler) -> Result<()> {
    let mut frames = FrameReader::new(reader);
    let mut served: u64 = 0;
    loop {
        let response = match frames.read_frame() {
            Ok(Some(request)) => handler.handle_request(&request),
            Ok(None) => break,
            Err(FrameError::Malformed(detail)) => {
                log_debug(&format!("engine got malformed frame: {detail}"));
                error_response(&detail)
            }
            Err(err @ FrameError::Unrecoverable(_)) => {
                tracing::warn!(error = %err, served, "engine input unrecoverable");
                bail!("engine input stream: {err}");
            }
        };
        write_frame(writer, &response).context("failed to write engine response")?;
        served += 1;
    }
    tracing::info!(served, "engine input closed");
    Ok(())
}
