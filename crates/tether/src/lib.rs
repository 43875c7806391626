//! Synchronous rendezvous channels over asynchronous producers.
//!
//! `tether` turns an async producer/consumer relationship into a blocking
//! call with a deadline. A producer [`Channel::write`]s a payload under a
//! correlation id; a strictly synchronous consumer [`Channel::read`]s it
//! back, either through a shared-memory slot (blocking wait/notify) or
//! through long-poll requests against a broker that buffers early arrivals
//! and parks pending readers. Both backends present one read/write contract:
//! exactly-once delivery per id, with read-before-write and
//! write-before-read equally legal.
//!
//! Payloads cross the API as opaque bytes; callers bring their own codec.
//! Reads are bounded by layered timeouts and cooperatively cancellable
//! between attempts via [`ReadOptions`].

mod channel;
mod error;
mod ident;
mod longpoll;
mod options;

pub use channel::{make_channel, Channel};
pub use error::{ChannelError, ChannelResult};
pub use ident::message_id;
pub use longpoll::{BrokerTransport, InProcessTransport, LongPollChannel, TransportFault};
pub use options::{
    Capabilities, ChannelOptions, InterruptCheck, ReadOptions, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_CHANNEL_TIMEOUT, DEFAULT_CHECK_TIMEOUT, DEFAULT_WRITE_BACKOFF,
    INTERRUPTIBLE_CHECK_TIMEOUT,
};

pub use tether_broker::{Broker, BrokerRequest, BrokerResponse, Envelope, PROTOCOL_VERSION};
pub use tether_shm::{SharedSlot, ShmError, Signal, WaitResult, DEFAULT_SLOT_CAPACITY};
