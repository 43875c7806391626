//! Configuration surface for channels and reads.

use std::sync::Arc;
use std::time::Duration;

use crate::longpoll::BrokerTransport;

/// Default capacity of a shared-memory channel's payload buffer (128 KiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = tether_shm::DEFAULT_SLOT_CAPACITY;

/// Per-attempt check timeout when no interrupt predicate is supplied.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_millis(5000);

/// Per-attempt check timeout when a read polls an interrupt predicate.
/// Cancellation latency is bounded by this slice.
pub const INTERRUPTIBLE_CHECK_TIMEOUT: Duration = Duration::from_millis(100);

/// Budget for broker handshakes and write retries.
pub const DEFAULT_CHANNEL_TIMEOUT: Duration = Duration::from_millis(5000);

/// Fixed pause between broker retries while the registration race settles.
pub const DEFAULT_WRITE_BACKOFF: Duration = Duration::from_millis(100);

/// Cooperative-cancellation predicate, polled between read attempts.
pub type InterruptCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Options for a single read.
#[derive(Clone, Default)]
pub struct ReadOptions {
    /// Polled between attempts; a `true` result ends the read with no data.
    pub interrupt: Option<InterruptCheck>,
    /// Bound on one blocking check. Defaults to
    /// [`INTERRUPTIBLE_CHECK_TIMEOUT`] when `interrupt` is set, else
    /// [`DEFAULT_CHECK_TIMEOUT`].
    pub check_timeout: Option<Duration>,
    /// Bound on the whole read; unbounded when unset.
    pub total_timeout: Option<Duration>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = Some(timeout);
        self
    }

    pub fn check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    pub fn interrupt(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.interrupt = Some(Arc::new(predicate));
        self
    }

    /// Effective per-attempt bound before deadline shrinking kicks in.
    pub(crate) fn initial_check_timeout(&self) -> Duration {
        match self.check_timeout {
            Some(timeout) if timeout > Duration::ZERO => timeout,
            _ if self.interrupt.is_some() => INTERRUPTIBLE_CHECK_TIMEOUT,
            _ => DEFAULT_CHECK_TIMEOUT,
        }
    }
}

/// Channel construction knobs.
#[derive(Clone, Debug)]
pub struct ChannelOptions {
    /// Shared-memory payload buffer capacity, in bytes.
    pub buffer_capacity: usize,
    /// Budget for broker handshakes and write retries.
    pub channel_timeout: Duration,
    /// Fixed backoff between broker retries.
    pub write_backoff: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            channel_timeout: DEFAULT_CHANNEL_TIMEOUT,
            write_backoff: DEFAULT_WRITE_BACKOFF,
        }
    }
}

/// Runtime capabilities the factory selects a backend from.
///
/// This replaces scattered feature probing with one explicit strategy value
/// assembled at construction time.
#[derive(Clone, Default)]
pub struct Capabilities {
    /// True when producer and consumer share memory and the consumer may
    /// genuinely block its thread.
    pub shared_memory: bool,
    /// Transport to a registered long-poll broker, if any.
    pub broker: Option<Arc<dyn BrokerTransport>>,
}

impl Capabilities {
    pub fn with_shared_memory() -> Self {
        Self {
            shared_memory: true,
            broker: None,
        }
    }

    pub fn with_broker(transport: Arc<dyn BrokerTransport>) -> Self {
        Self {
            shared_memory: false,
            broker: Some(transport),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_timeout_defaults_depend_on_interrupt() {
        assert_eq!(
            ReadOptions::new().initial_check_timeout(),
            DEFAULT_CHECK_TIMEOUT
        );
        assert_eq!(
            ReadOptions::new().interrupt(|| false).initial_check_timeout(),
            INTERRUPTIBLE_CHECK_TIMEOUT
        );
    }

    #[test]
    fn explicit_check_timeout_wins_but_zero_is_ignored() {
        let explicit = ReadOptions::new().check_timeout(Duration::from_millis(7));
        assert_eq!(explicit.initial_check_timeout(), Duration::from_millis(7));

        let zero = ReadOptions::new().check_timeout(Duration::ZERO);
        assert_eq!(zero.initial_check_timeout(), DEFAULT_CHECK_TIMEOUT);
    }
}
