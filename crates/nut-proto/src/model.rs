//! Flat value types shared across the wire protocol and the session
//! client. These replace the cyclic `Client <-> Device <-> Variable`
//! object graph of the system this protocol was extracted from: every
//! type here is an owned, `Clone`-able record with no back-reference to
//! the connection that produced it.

/// Opaque handle for a mutation accepted by the server under the
/// `TRACKING` feature. An empty id means the mutation was not tracked and
/// should be treated as already successful.
pub type TrackingId = String;

/// Name of a session-level capability toggle, e.g. [`TRACKING`].
pub type Feature = str;

/// The one feature name this crate's core protocol knows about by name;
/// all others are opaque, server-defined strings passed through verbatim.
pub const TRACKING: &str = "TRACKING";

/// Terminal/pending state of a tracked mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingResult {
    Unknown,
    Pending,
    Success,
    InvalidArgument,
    Failure,
}

impl TrackingResult {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TrackingResult::Pending)
    }
}

/// Summary information about a device, as returned by `LIST UPS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub description: String,
}

/// A single named attribute of a device and its current value(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: String,
    pub values: Vec<String>,
    pub description: Option<String>,
    pub writable: bool,
}

/// A named instant command exposed by a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: String,
    pub description: Option<String>,
}
