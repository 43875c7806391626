//! Shared-memory rendezvous primitives.
//!
//! This crate holds the blocking building blocks used by the shared-memory
//! channel backend:
//! * [`SharedSlot`] – fixed-capacity single-payload rendezvous buffer.
//! * [`Signal`] – wait/notify cell with timed waits.
//! * [`ShmError`] – small error surface for capacity failures.

mod error;
mod signal;
mod slot;

pub use error::{ShmError, ShmResult};
pub use signal::{Signal, WaitResult};
pub use slot::{SharedSlot, DEFAULT_SLOT_CAPACITY};
