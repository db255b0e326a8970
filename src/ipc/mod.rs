//! JSON-lines wire protocol spoken with the decision engine.
//!
//! Protocol:
//! - Each frame is one JSON object followed by `\n`
//! - Requests (host → engine): `{"action": "keyEvent", ...}`
//! - Responses (engine → host): `{"action": "<directive>", ...}`
//! - Strictly one request in flight; the next frame read is its reply

mod codec;
mod protocol;


pub use codec::{decode, encode, write_frame, FrameError, FrameReader, MAX_FRAME_BYTES};
pub use protocol::{Message, Value};
