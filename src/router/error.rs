use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failures of a single router call. None of them should take down the host.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A frame could not be decoded, or a response carried no `action`.
    #[error("malformed message from decision engine: {0}")]
    MalformedMessage(String),

    #[error("failed to launch decision engine '{program}': {source}")]
    SpawnFailure {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("decision engine is not running")]
    NotRunning,

    #[error("decision engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error("decision engine exited (code {code:?})")]
    ProcessExited { code: Option<i32> },

    /// A second request was issued while one is still outstanding.
    #[error("a router request is already in flight")]
    RouterBusy,

    /// The engine is down and the automatic respawn did not bring it back.
    #[error("decision engine unavailable until restarted")]
    RouterUnavailable,

    #[error("receive called with a token that is not the in-flight request")]
    StaleToken,
}

impl RouterError {
    /// Stable name used in logs and in replies to integration code.
    pub fn kind(&self) -> &'static str {
        match self {
            RouterError::MalformedMessage(_) => "MalformedMessage",
            RouterError::SpawnFailure { .. } => "SpawnFailure",
            RouterError::NotRunning => "NotRunning",
            RouterError::Timeout(_) => "Timeout",
            RouterError::ProcessExited { .. } => "ProcessExited",
            RouterError::RouterBusy => "RouterBusy",
            RouterError::RouterUnavailable => "RouterUnavailable",
            RouterError::StaleToken => "StaleToken",
        }
    }

    /// Lifecycle failures that the client answers with a respawn attempt.
    pub(super) fn wants_respawn(&self) -> bool {
        matches!(
            self,
            RouterError::SpawnFailure { .. }
                | RouterError::NotRunning
                | RouterError::ProcessExited { .. }
        )
    }
}
