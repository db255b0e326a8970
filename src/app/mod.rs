//! Process-wide plumbing shared by the library and both binaries.

mod logging;

#[cfg(test)]
pub(crate) use logging::set_logging_for_tests;
pub use logging::{
    crash_log_path, init_logging, install_panic_hook, log_debug, log_debug_content, log_file_path,
    log_panic,
};
