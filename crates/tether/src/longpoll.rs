//! Long-poll client backend.
//!
//! The broker is reached through [`BrokerTransport`], an opaque blocking
//! request/response collaborator: implementations own the sockets or handles
//! and block the calling thread until the broker replies. The client layers
//! retry-with-backoff over writes and handshakes (the retry exists to mask
//! the race between broker registration and first use, not to paper over
//! general network flakiness) and validates the protocol version of every
//! message reply.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use tether_broker::{Broker, BrokerRequest, BrokerResponse, PROTOCOL_VERSION};

use crate::error::{ChannelError, ChannelResult};
use crate::options::ChannelOptions;

/// Failure reported by a transport that could not complete a round trip.
#[derive(Clone, Debug)]
pub struct TransportFault {
    /// Transport-specific status line (HTTP status, socket error, ...).
    pub status: String,
}

impl TransportFault {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport fault: {}", self.status)
    }
}

impl std::error::Error for TransportFault {}

/// Blocking request/response seam to a broker.
pub trait BrokerTransport: Send + Sync {
    /// Address identifying the broker endpoint, used in error reports.
    fn address(&self) -> String;

    /// Sends one request and blocks until the broker replies. Read requests
    /// carry their park window, so a round trip may block for that long.
    fn round_trip(&self, request: BrokerRequest) -> Result<BrokerResponse, TransportFault>;
}

/// Transport to a broker living in the same process.
///
/// Requests are served on the calling thread; a parked read blocks exactly
/// like a long-poll request would.
pub struct InProcessTransport {
    broker: Arc<Broker>,
}

impl InProcessTransport {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self { broker }
    }
}

impl BrokerTransport for InProcessTransport {
    fn address(&self) -> String {
        "inproc://broker".to_owned()
    }

    fn round_trip(&self, request: BrokerRequest) -> Result<BrokerResponse, TransportFault> {
        Ok(self.broker.serve(request))
    }
}

/// Client half of the long-poll backend.
#[derive(Clone)]
pub struct LongPollChannel {
    transport: Arc<dyn BrokerTransport>,
    timeout: Duration,
    backoff: Duration,
}

impl LongPollChannel {
    /// Connects to the broker behind `transport`.
    ///
    /// The handshake is retried every `options.write_backoff` until it
    /// succeeds with a matching protocol version or
    /// `options.channel_timeout` elapses.
    pub fn connect(
        transport: Arc<dyn BrokerTransport>,
        options: &ChannelOptions,
    ) -> ChannelResult<Self> {
        let channel = Self {
            transport,
            timeout: options.channel_timeout,
            backoff: options.write_backoff,
        };

        let started = Instant::now();
        loop {
            let status = match channel.transport.round_trip(BrokerRequest::Handshake) {
                Ok(BrokerResponse::Handshake { version }) if version == PROTOCOL_VERSION => {
                    debug!(address = %channel.transport.address(), "broker handshake succeeded");
                    return Ok(channel);
                }
                Ok(BrokerResponse::Handshake { version }) => {
                    format!("handshake version {version:?} does not match {PROTOCOL_VERSION:?}")
                }
                Ok(other) => format!("unexpected handshake reply: {other:?}"),
                Err(fault) => fault.status,
            };
            if started.elapsed() >= channel.timeout {
                return Err(channel.unreachable(status));
            }
            trace!(%status, "broker handshake pending, retrying");
            thread::sleep(channel.backoff);
        }
    }

    /// Blocking write of `payload` under `id`.
    ///
    /// Failures are retried with a fixed backoff until the channel timeout
    /// elapses, masking the window where the broker is registered but not yet
    /// active.
    pub fn write(&self, id: &str, payload: &[u8]) -> ChannelResult<()> {
        let started = Instant::now();
        loop {
            let request = BrokerRequest::Write {
                id: id.to_owned(),
                payload: payload.to_vec(),
            };
            let status = match self.transport.round_trip(request) {
                Ok(BrokerResponse::Written { delivered }) => {
                    trace!(id, delivered, "broker accepted write");
                    return Ok(());
                }
                Ok(other) => format!("unexpected write reply: {other:?}"),
                Err(fault) => fault.status,
            };
            if started.elapsed() >= self.timeout {
                return Err(self.unreachable(status));
            }
            debug!(id, %status, "broker write failed, retrying");
            thread::sleep(self.backoff);
        }
    }

    /// One long-poll attempt for `id`, parked broker-side for up to `timeout`.
    ///
    /// `elapsed` is the age of the surrounding read operation: a reply with a
    /// mismatched protocol version counts as "no data yet" while `elapsed` is
    /// within the channel timeout (the broker may be mid-replacement) and
    /// escalates to [`ChannelError::BrokerUnreachable`] after it.
    pub fn check_once(
        &self,
        id: &str,
        timeout: Duration,
        elapsed: Duration,
    ) -> ChannelResult<Option<Vec<u8>>> {
        let request = BrokerRequest::Read {
            id: id.to_owned(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };
        match self.transport.round_trip(request) {
            Ok(BrokerResponse::TimedOut) => Ok(None),
            Ok(BrokerResponse::Message(envelope)) => {
                if envelope.version == PROTOCOL_VERSION {
                    Ok(Some(envelope.payload))
                } else if elapsed > self.timeout {
                    Err(self.unreachable(format!(
                        "protocol version {:?} does not match {PROTOCOL_VERSION:?}",
                        envelope.version
                    )))
                } else {
                    warn!(
                        id,
                        version = %envelope.version,
                        "discarding reply with mismatched protocol version"
                    );
                    Ok(None)
                }
            }
            Ok(other) => Err(self.unreachable(format!("unexpected read reply: {other:?}"))),
            Err(fault) => Err(self.unreachable(fault.status)),
        }
    }

    fn unreachable(&self, status: impl Into<String>) -> ChannelError {
        ChannelError::BrokerUnreachable {
            address: self.transport.address(),
            status: status.into(),
        }
    }
}
