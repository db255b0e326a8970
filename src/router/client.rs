use super::error::RouterError;
use super::supervisor::{EngineCommand, ProcessState, RouterSupervisor};
use crate::config::RouterConfig;
use crate::ipc::Message;
use crate::log_debug;
use std::time::Duration;

/// Synchronous call seam used by the window controller.
///
/// Implementations never panic into UI code; every failure is a `RouterError`.
pub trait EventRouter {
    /// Launch the engine ahead of the first call.
    fn start(&mut self) -> Result<u32, RouterError>;

    /// Send one request and block for its response.
    fn call(&mut self, request: &Message) -> Result<Message, RouterError>;

    /// Manual restart. Clears the unavailable latch when the engine comes back.
    fn restart(&mut self) -> Result<u32, RouterError>;

    /// False once the automatic respawn has failed and until `restart` succeeds.
    fn is_available(&self) -> bool;
}

/// Facade over [`RouterSupervisor`] with the respawn policy applied.
///
/// A lifecycle failure (`SpawnFailure`, `NotRunning`, `ProcessExited`) gets one
/// automatic respawn. If that respawn fails, or the respawned engine fails again
/// before answering a single request, the client latches `RouterUnavailable`
/// and stops spawning until [`EventRouter::restart`] is called.
pub struct EventRouterClient {
    supervisor: RouterSupervisor,
    timeout: Duration,
    respawn_budget: u8,
    unavailable: bool,
}

impl EventRouterClient {
    pub fn new(command: EngineCommand, timeout: Duration) -> Self {
        Self {
            supervisor: RouterSupervisor::new(command),
            timeout,
            respawn_budget: 1,
            unavailable: false,
        }
    }

    pub fn from_config(config: &RouterConfig) -> anyhow::Result<Self> {
        Ok(Self::new(config.engine_command()?, config.router_timeout()))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn state(&mut self) -> ProcessState {
        self.supervisor.state()
    }

    pub fn pid(&self) -> Option<u32> {
        self.supervisor.pid()
    }

    pub fn stop(&mut self) {
        self.supervisor.stop();
    }

    /// Answer a lifecycle failure with at most one respawn.
    ///
    /// Returns the error the caller should see: the original cause if the engine
    /// is back, `RouterUnavailable` if it is not.
    fn recover(&mut self, cause: RouterError) -> RouterError {
        if !cause.wants_respawn() {
            return cause;
        }
        if self.respawn_budget == 0 {
            return self.mark_unavailable(&cause);
        }
        self.respawn_budget -= 1;
        log_debug(&format!("router failure ({}); respawning engine", cause.kind()));
        match self.supervisor.start() {
            Ok(pid) => {
                tracing::info!(pid, cause = cause.kind(), "engine respawned");
                cause
            }
            Err(err) => {
                log_debug(&format!("respawn failed: {err}"));
                self.mark_unavailable(&err)
            }
        }
    }

    fn mark_unavailable(&mut self, cause: &RouterError) -> RouterError {
        tracing::warn!(cause = cause.kind(), "router unavailable until restarted");
        self.unavailable = true;
        self.supervisor.stop();
        RouterError::RouterUnavailable
    }
}

impl EventRouter for EventRouterClient {
    fn start(&mut self) -> Result<u32, RouterError> {
        if self.unavailable {
            return Err(RouterError::RouterUnavailable);
        }
        self.supervisor.start().map_err(|err| self.recover(err))
    }

    fn call(&mut self, request: &Message) -> Result<Message, RouterError> {
        if self.unavailable {
            return Err(RouterError::RouterUnavailable);
        }
        if !self.supervisor.is_running() {
            if let Err(err) = self.supervisor.start() {
                return Err(self.recover(err));
            }
        }

        let token = self
            .supervisor
            .send(request, self.timeout)
            .map_err(|err| self.recover(err))?;
        match self.supervisor.receive(token, self.timeout) {
            Ok(response) if response.action_name().is_some() => {
                self.respawn_budget = 1;
                Ok(response)
            }
            Ok(response) => {
                log_debug(&format!("response without action: {response:?}"));
                Err(RouterError::RouterUnavailable)
            }
            Err(RouterError::MalformedMessage(detail)) => {
                log_debug(&format!("malformed response treated as unavailable: {detail}"));
                Err(RouterError::RouterUnavailable)
            }
            Err(err) => Err(self.recover(err)),
        }
    }

    fn restart(&mut self) -> Result<u32, RouterError> {
        self.supervisor.stop();
        let pid = self.supervisor.start()?;
        self.unavailable = false;
        self.respawn_budget = 1;
        tracing::info!(pid, "engine restarted manually");
        Ok(pid)
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }
}
