//! Decision-engine routing: process supervision plus the synchronous call facade.
//!
//! The UI thread issues one request at a time and blocks, with a bounded
//! timeout, for the paired response. A stalled or dead engine turns into a
//! typed `RouterError`, never a hung window.

mod client;
mod error;
mod supervisor;


pub use client::{EventRouter, EventRouterClient};
pub use error::RouterError;
pub use supervisor::{EngineCommand, PendingToken, ProcessState, RouterProcessHandle, RouterSupervisor};
