//! Blocking wait/notify cell with timed waits.
//!
//! A [`Signal`] parks the waiting thread (it is descheduled, not spinning)
//! until a producer raises it or the deadline passes. The mutex/condvar pair
//! provides acquire/release ordering around the raised flag, so anything the
//! producer wrote before notifying is visible to the woken waiter.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Result of a timed wait on a [`Signal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The signal was raised before the deadline.
    Signaled,
    /// The deadline elapsed with the signal still clear.
    TimedOut,
}

/// One-shot wait/notify cell. Raising is sticky: waits after a notify return
/// immediately.
pub struct Signal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            raised: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Raises the signal and wakes at most one parked waiter.
    pub fn notify_one(&self) {
        let mut raised = self.raised.lock();
        *raised = true;
        self.cond.notify_one();
    }

    /// Blocks until the signal is raised or `timeout` elapses.
    pub fn wait_for(&self, timeout: Duration) -> WaitResult {
        let deadline = Instant::now().checked_add(timeout);
        let mut raised = self.raised.lock();
        while !*raised {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut raised, deadline).timed_out() {
                        return if *raised {
                            WaitResult::Signaled
                        } else {
                            WaitResult::TimedOut
                        };
                    }
                }
                // Deadline arithmetic overflowed: the wait is effectively unbounded.
                None => self.cond.wait(&mut raised),
            }
        }
        WaitResult::Signaled
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_times_out_when_never_notified() {
        let signal = Signal::new();
        let started = Instant::now();
        let result = signal.wait_for(Duration::from_millis(50));
        assert_eq!(result, WaitResult::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn notify_wakes_parked_waiter() {
        let signal = Arc::new(Signal::new());
        let notifier = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            notifier.notify_one();
        });
        let result = signal.wait_for(Duration::from_secs(5));
        assert_eq!(result, WaitResult::Signaled);
        handle.join().unwrap();
    }

    #[test]
    fn notify_before_wait_returns_immediately() {
        let signal = Signal::new();
        signal.notify_one();
        assert_eq!(signal.wait_for(Duration::from_secs(5)), WaitResult::Signaled);
    }
}
