//! Unified channel surface: backend dispatch, the layered-timeout read loop,
//! the factory, and synchronous sleep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use tether_shm::{SharedSlot, Signal};

use crate::error::{ChannelError, ChannelResult};
use crate::ident::message_id;
use crate::longpoll::{BrokerTransport, LongPollChannel};
use crate::options::{Capabilities, ChannelOptions, ReadOptions};

/// Synchronous channel polymorphic over its delivery backend.
///
/// Both backends present the same contract: a producer writes a payload
/// under a correlation id, a blocking consumer reads it back, and each id is
/// delivered exactly once regardless of arrival order.
#[derive(Clone)]
pub enum Channel {
    /// In-process shared memory with a blocking wait/notify slot.
    SharedMemory(SharedSlot),
    /// Long-poll requests against a broker.
    LongPoll(LongPollChannel),
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::SharedMemory(_) => f.write_str("Channel::SharedMemory"),
            Channel::LongPoll(_) => f.write_str("Channel::LongPoll"),
        }
    }
}

impl Channel {
    /// Builds a shared-memory channel with its own rendezvous slot.
    ///
    /// One slot serves exactly one producer/consumer conversation at a time;
    /// unrelated conversations need distinct channels.
    pub fn shared_memory(capacity: usize) -> ChannelResult<Self> {
        Ok(Channel::SharedMemory(SharedSlot::new(capacity)?))
    }

    /// Builds a long-poll channel over `transport`, performing the handshake.
    pub fn long_poll(
        transport: Arc<dyn BrokerTransport>,
        options: &ChannelOptions,
    ) -> ChannelResult<Self> {
        Ok(Channel::LongPoll(LongPollChannel::connect(
            transport, options,
        )?))
    }

    /// Writes `payload` under `id`.
    ///
    /// The shared-memory backend rendezvouses through its slot and ignores
    /// `id` (the slot itself scopes the conversation); the long-poll backend
    /// correlates through the broker tables.
    pub fn write(&self, payload: &[u8], id: &str) -> ChannelResult<()> {
        match self {
            Channel::SharedMemory(slot) => Ok(slot.write(payload)?),
            Channel::LongPoll(longpoll) => longpoll.write(id, payload),
        }
    }

    /// Blocking read of the payload written under `id`.
    ///
    /// Repeatedly invokes the backend's bounded check, shrinking the
    /// per-attempt timeout as the total deadline approaches and polling the
    /// interrupt predicate between attempts. Returns `Ok(None)` on
    /// total-timeout expiry or cancellation, never for a delivered payload,
    /// however empty.
    pub fn read(&self, id: &str, options: &ReadOptions) -> ChannelResult<Option<Vec<u8>>> {
        let started = Instant::now();
        let mut attempt_timeout = options.initial_check_timeout();

        loop {
            let elapsed = started.elapsed();
            if let Some(total) = options.total_timeout {
                let remaining = total.saturating_sub(elapsed);
                if remaining.is_zero() {
                    trace!(id, "read timed out");
                    return Ok(None);
                }
                attempt_timeout = attempt_timeout.min(remaining);
            }

            if let Some(payload) = self.check_once(id, attempt_timeout, elapsed)? {
                return Ok(Some(payload));
            }
            if let Some(interrupt) = &options.interrupt {
                if interrupt() {
                    trace!(id, "read interrupted");
                    return Ok(None);
                }
            }
        }
    }

    fn check_once(
        &self,
        id: &str,
        timeout: Duration,
        elapsed: Duration,
    ) -> ChannelResult<Option<Vec<u8>>> {
        match self {
            Channel::SharedMemory(slot) => Ok(slot.take(timeout)),
            Channel::LongPoll(longpoll) => longpoll.check_once(id, timeout, elapsed),
        }
    }

    /// Blocks the calling thread for `duration`.
    ///
    /// The shared-memory backend waits on a private, never-notified signal.
    /// The long-poll backend reads a correlation id that is guaranteed never
    /// to be written, with the duration as the total timeout; the elapsed
    /// wall-clock time of that timeout is the sleep.
    pub fn sleep(&self, duration: Duration) -> ChannelResult<()> {
        match self {
            Channel::SharedMemory(_) => {
                let _ = Signal::new().wait_for(duration);
                Ok(())
            }
            Channel::LongPoll(_) => {
                let id = format!("sleep {}ms {}", duration.as_millis(), message_id());
                let options = ReadOptions::new().total_timeout(duration);
                self.read(&id, &options).map(|_| ())
            }
        }
    }
}

/// Selects a backend from `capabilities`: shared memory when available, else
/// a long-poll broker (connecting does the handshake), else
/// [`ChannelError::Unavailable`]. Pure selection; any retrying lives in the
/// backends themselves.
pub fn make_channel(
    capabilities: &Capabilities,
    options: &ChannelOptions,
) -> ChannelResult<Channel> {
    if capabilities.shared_memory {
        return Channel::shared_memory(options.buffer_capacity);
    }
    if let Some(transport) = &capabilities.broker {
        return Channel::long_poll(Arc::clone(transport), options);
    }
    Err(ChannelError::Unavailable(
        "neither shared memory nor a broker transport is configured",
    ))
}
