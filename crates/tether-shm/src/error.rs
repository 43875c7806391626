//! Error handling helpers for the shared-memory layer.
//!
//! The error surface is intentionally small: capacity validation at
//! construction and oversize payloads at write time. Timeouts are not errors
//! at this layer; a timed-out take simply yields no data.

use std::fmt;

/// Convenience result alias for fallible shared-memory operations.
pub type ShmResult<T, E = ShmError> = Result<T, E>;

#[derive(Debug, PartialEq, Eq)]
/// Errors surfaced by the shared-memory rendezvous primitives.
pub enum ShmError {
    /// Payload byte count exceeds the slot's buffer capacity.
    PayloadTooLarge { len: usize, capacity: usize },
    /// Requested slot capacity is zero or exceeds the length word's range.
    InvalidCapacity { requested: usize },
}

impl fmt::Display for ShmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShmError::PayloadTooLarge { len, capacity } => {
                write!(
                    f,
                    "payload of {len} bytes exceeds the slot capacity of {capacity} bytes"
                )
            }
            ShmError::InvalidCapacity { requested } => {
                write!(
                    f,
                    "slot capacity {requested} must be between 1 and {} bytes",
                    u32::MAX
                )
            }
        }
    }
}

impl std::error::Error for ShmError {}
