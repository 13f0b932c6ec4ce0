//! Shared wire protocol plumbing for UPS network clients: tokenization,
//! request/reply framing, the flat data model, and the unified error
//! taxonomy. Consumed by `nut-client`'s session state machine; does not
//! itself open a socket.

pub mod error;
pub mod model;
pub mod tokenizer;
pub mod wire;

pub use error::{Error, Result};
pub use model::{CommandInfo, DeviceInfo, TrackingId, TrackingResult, VariableInfo, TRACKING};
