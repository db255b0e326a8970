pub mod app;
pub mod config;
pub mod engine;
pub mod host;
pub mod ipc;
pub mod keys;
mod lock;
pub mod modal;
pub mod router;
mod telemetry;

pub use app::{
    crash_log_path, init_logging, install_panic_hook, log_debug, log_debug_content, log_file_path,
    log_panic,
};
pub(crate) use lock::lock_or_recover;
pub use telemetry::init_tracing;
