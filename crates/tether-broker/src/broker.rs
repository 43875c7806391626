//! Long-poll broker: early-message buffering and parked readers.
//!
//! The broker owns two tables keyed by correlation id: payloads whose write
//! arrived before any matching read (`early`), and readers whose read arrived
//! before any matching write (`pending`). One mutex guards both, and each
//! "check one table, else insert into the other" step runs as a single
//! critical section, so an id is never present in both tables at once and an
//! overlapping write/read pair resolves deterministically to a direct
//! hand-off or to buffering: never a lost message, never a double delivery.
//!
//! A parked reader is represented by a bounded(1) channel sender stored in
//! the pending table. Completion removes the sender from the table before
//! sending, so fulfilling the same read twice is structurally impossible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::schema::{BrokerRequest, BrokerResponse, Envelope, PROTOCOL_VERSION};

/// Outcome of a broker write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A reader was parked on the id and received the payload directly.
    Delivered,
    /// No reader was waiting; the payload is buffered until one arrives.
    Buffered,
}

/// Outcome of a broker read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The message for the id, buffered earlier or handed off while parked.
    Message(Envelope),
    /// No write arrived within the park window.
    TimedOut,
}

/// A reader parked on an id. The ticket identifies this particular park, so
/// a reader that was displaced by a newer read on the same id never removes
/// the newer reader's entry during its own cleanup.
struct ParkedReader {
    ticket: u64,
    sender: Sender<Envelope>,
}

struct Tables {
    early: HashMap<String, Vec<u8>>,
    pending: HashMap<String, ParkedReader>,
}

/// Broker holding the early-message and pending-reader tables.
///
/// The tables are fields of this value, not process globals; the broker's
/// lifetime is whatever its owner decides. Requests may be served from any
/// thread.
pub struct Broker {
    tables: Mutex<Tables>,
    next_ticket: AtomicU64,
    version: String,
}

impl Broker {
    /// Broker speaking [`PROTOCOL_VERSION`].
    pub fn new() -> Self {
        Self::with_version(PROTOCOL_VERSION)
    }

    /// Broker announcing a specific protocol version, for exercising version
    /// skew between a client and a replaced broker instance.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                early: HashMap::new(),
                pending: HashMap::new(),
            }),
            next_ticket: AtomicU64::new(0),
            version: version.into(),
        }
    }

    /// Protocol version echoed to handshakes.
    pub fn handshake(&self) -> String {
        self.version.clone()
    }

    /// Delivers `payload` to the reader parked on `id`, or buffers it as an
    /// early message. A second write to a buffered id replaces the buffered
    /// payload.
    pub fn write(&self, id: &str, payload: Vec<u8>) -> WriteOutcome {
        let mut tables = self.tables.lock();
        if let Some(parked) = tables.pending.remove(id) {
            match parked.sender.send(Envelope::new(payload, self.version.clone())) {
                Ok(()) => {
                    trace!(id, "write handed off to parked reader");
                    return WriteOutcome::Delivered;
                }
                // The reader abandoned its park; a failed hand-off must still
                // land in the early table so the message is never lost.
                Err(failed) => {
                    let envelope = failed.into_inner();
                    tables.early.insert(id.to_owned(), envelope.payload);
                    debug!(id, "parked reader gone, write buffered instead");
                    return WriteOutcome::Buffered;
                }
            }
        }
        trace!(id, "write buffered as early message");
        tables.early.insert(id.to_owned(), payload);
        WriteOutcome::Buffered
    }

    /// Returns the early message for `id` immediately, or parks for up to
    /// `timeout` waiting for a matching write.
    ///
    /// At most one reader may be parked per id: a second read on the same id
    /// displaces the first parked reader, which then returns empty while the
    /// newer reader keeps its park.
    pub fn read(&self, id: &str, timeout: Duration) -> ReadOutcome {
        let (ticket, receiver) = {
            let mut tables = self.tables.lock();
            if let Some(payload) = tables.early.remove(id) {
                trace!(id, "read satisfied from early-message table");
                return ReadOutcome::Message(Envelope::new(payload, self.version.clone()));
            }
            let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
            let (sender, receiver) = bounded(1);
            tables.pending.insert(id.to_owned(), ParkedReader { ticket, sender });
            (ticket, receiver)
        };

        match receiver.recv_timeout(timeout) {
            Ok(envelope) => ReadOutcome::Message(envelope),
            Err(_) => {
                let mut tables = self.tables.lock();
                let own_entry = tables
                    .pending
                    .get(id)
                    .is_some_and(|parked| parked.ticket == ticket);
                if own_entry {
                    tables.pending.remove(id);
                    debug!(
                        id,
                        timeout_ms = timeout.as_millis() as u64,
                        "parked reader timed out"
                    );
                    return ReadOutcome::TimedOut;
                }
                // Our entry is gone (a write consumed it mid-timeout) or was
                // replaced by a newer reader. A completed hand-off wins over
                // the timeout; a displacement yields empty.
                drop(tables);
                match receiver.try_recv() {
                    Ok(envelope) => ReadOutcome::Message(envelope),
                    Err(_) => ReadOutcome::TimedOut,
                }
            }
        }
    }

    /// Serves one request. Transports call this from whatever execution
    /// context carries their I/O; reads block the calling thread while
    /// parked.
    pub fn serve(&self, request: BrokerRequest) -> BrokerResponse {
        match request {
            BrokerRequest::Handshake => BrokerResponse::Handshake {
                version: self.handshake(),
            },
            BrokerRequest::Write { id, payload } => {
                let delivered = matches!(self.write(&id, payload), WriteOutcome::Delivered);
                BrokerResponse::Written { delivered }
            }
            BrokerRequest::Read { id, timeout_ms } => {
                match self.read(&id, Duration::from_millis(timeout_ms)) {
                    ReadOutcome::Message(envelope) => BrokerResponse::Message(envelope),
                    ReadOutcome::TimedOut => BrokerResponse::TimedOut,
                }
            }
        }
    }

    #[cfg(test)]
    fn table_membership(&self, id: &str) -> (bool, bool) {
        let tables = self.tables.lock();
        (
            tables.early.contains_key(id),
            tables.pending.contains_key(id),
        )
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}
