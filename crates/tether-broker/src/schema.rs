//! Wire schema for broker requests and replies.
//!
//! The schema is serde-derived so each transport can choose its own byte
//! encoding. The protocol version is an explicit field on every message
//! reply and is checked at the serialization boundary; payload bytes are
//! opaque to the broker.

use serde::{Deserialize, Serialize};

/// Protocol version spoken by this broker and its clients.
pub const PROTOCOL_VERSION: &str = "v1";

/// Versioned wrapper around a payload.
///
/// The version tag lets a reader distinguish a stale or incompatible broker
/// reply from a genuinely empty payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Opaque payload bytes as the writer supplied them.
    pub payload: Vec<u8>,
    /// Protocol version of the broker that produced this envelope.
    pub version: String,
}

impl Envelope {
    pub fn new(payload: Vec<u8>, version: impl Into<String>) -> Self {
        Self {
            payload,
            version: version.into(),
        }
    }
}

/// Requests a client may issue against a broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerRequest {
    /// Confirms the broker is installed and which protocol it speaks.
    Handshake,
    /// Hands `payload` to the reader parked on `id`, or buffers it.
    Write { id: String, payload: Vec<u8> },
    /// Collects the message for `id`, parking for up to `timeout_ms`.
    Read { id: String, timeout_ms: u64 },
}

/// Replies a broker produces, one per request kind plus the distinguished
/// timeout status for parked reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerResponse {
    /// Handshake echo carrying the broker's protocol version.
    Handshake { version: String },
    /// Write landed; `delivered` is true on direct hand-off, false when the
    /// payload was buffered as an early message.
    Written { delivered: bool },
    /// A write matched the read within its park window.
    Message(Envelope),
    /// No write arrived within the read's park window.
    TimedOut,
}
