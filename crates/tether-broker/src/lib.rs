//! Long-poll broker for the synchronous channel's network backend.
//!
//! The broker buffers writes that arrive before their matching read and
//! parks reads that arrive before their matching write, rendezvousing the
//! two under a correlation id:
//! * [`Broker`] – early-message and pending-reader tables behind one mutex.
//! * [`BrokerRequest`] / [`BrokerResponse`] – serde-derived wire schema.
//! * [`PROTOCOL_VERSION`] – version tag checked at the serialization boundary.

mod broker;
pub mod schema;

pub use broker::{Broker, ReadOutcome, WriteOutcome};
pub use schema::{BrokerRequest, BrokerResponse, Envelope, PROTOCOL_VERSION};
