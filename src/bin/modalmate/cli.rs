use clap::Parser;
use modalmate::config::RouterConfig;

/// Replay keystrokes through a simulated editor window and print its final state.
#[derive(Debug, Parser, Clone)]
#[command(about = "Replay keystrokes through a modal editor window", author, version)]
pub(crate) struct ReplayConfig {
    #[command(flatten)]
    pub(crate) router: RouterConfig,

    /// Keystrokes to replay, in Vim notation (`ihello<esc>0x`)
    #[arg(long, value_name = "KEYS")]
    pub(crate) keys: String,

    /// Initial buffer contents
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub(crate) text: String,

    /// Class reported by the simulated window
    #[arg(long = "window-class", value_name = "CLASS", default_value = "OakDocumentWindow")]
    pub(crate) window_class: String,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub(crate) pretty: bool,
}
