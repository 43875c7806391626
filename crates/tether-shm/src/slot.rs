//! Single-slot rendezvous buffer backed by shared memory.
//!
//! A slot carries exactly one payload from a producer to a consumer. The
//! metadata is two words: the payload length (zero while empty) and a
//! full/empty flag. The flag transitions 0→1 on write and 1→0 on consume;
//! no other states exist. Exactly one producer and one consumer may use a
//! slot at a time; unrelated conversations need distinct slots.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::{ShmError, ShmResult};

/// Default payload capacity of a rendezvous slot (128 KiB).
pub const DEFAULT_SLOT_CAPACITY: usize = 128 * 1024;

struct SlotState {
    buf: Box<[u8]>,
    /// Payload byte count; 0 while the slot is empty.
    len: u32,
    /// Full/empty flag guarded together with the buffer.
    full: bool,
}

struct SlotInner {
    state: Mutex<SlotState>,
    cond: Condvar,
    capacity: usize,
}

/// Fixed-capacity rendezvous slot shared by one producer and one consumer.
///
/// Cloning yields another handle onto the same slot, so the producer and
/// consumer sides can live on different threads.
#[derive(Clone)]
pub struct SharedSlot {
    inner: Arc<SlotInner>,
}

impl SharedSlot {
    /// Creates a slot able to carry payloads up to `capacity` bytes.
    ///
    /// The capacity is bounded by the length word: anything above
    /// `u32::MAX` bytes could not be recorded faithfully and is rejected
    /// alongside zero.
    pub fn new(capacity: usize) -> ShmResult<Self> {
        if capacity == 0 || capacity > u32::MAX as usize {
            return Err(ShmError::InvalidCapacity {
                requested: capacity,
            });
        }
        Ok(Self {
            inner: Arc::new(SlotInner {
                state: Mutex::new(SlotState {
                    buf: vec![0u8; capacity].into_boxed_slice(),
                    len: 0,
                    full: false,
                }),
                cond: Condvar::new(),
                capacity,
            }),
        })
    }

    /// Maximum payload size the slot accepts.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Stores `payload` and wakes at most one blocked taker.
    ///
    /// Oversize payloads are rejected without touching the slot: the flag and
    /// any undelivered payload stay as they were.
    pub fn write(&self, payload: &[u8]) -> ShmResult<()> {
        if payload.len() > self.inner.capacity {
            return Err(ShmError::PayloadTooLarge {
                len: payload.len(),
                capacity: self.inner.capacity,
            });
        }

        let mut state = self.inner.state.lock();
        state.buf[..payload.len()].copy_from_slice(payload);
        state.len = payload.len() as u32;
        state.full = true;
        self.inner.cond.notify_one();
        Ok(())
    }

    /// Blocks until the slot fills or `timeout` elapses.
    ///
    /// On success the payload is copied out, the length cleared, and the flag
    /// reset so the slot is ready for the next rendezvous. On timeout the
    /// slot is left untouched and `None` is returned.
    pub fn take(&self, timeout: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.inner.state.lock();
        while !state.full {
            match deadline {
                Some(deadline) => {
                    if self.inner.cond.wait_until(&mut state, deadline).timed_out()
                        && !state.full
                    {
                        return None;
                    }
                }
                None => self.inner.cond.wait(&mut state),
            }
        }

        let len = state.len as usize;
        let payload = state.buf[..len].to_vec();
        state.len = 0;
        state.full = false;
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn write_then_take_round_trips() {
        let slot = SharedSlot::new(64).unwrap();
        slot.write(b"hello").unwrap();
        assert_eq!(slot.take(Duration::from_millis(10)), Some(b"hello".to_vec()));
    }

    #[test]
    fn take_blocks_until_writer_arrives() {
        let slot = SharedSlot::new(64).unwrap();
        let producer = slot.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            producer.write(b"late").unwrap();
        });
        let payload = slot.take(Duration::from_secs(5));
        assert_eq!(payload, Some(b"late".to_vec()));
        handle.join().unwrap();
    }

    #[test]
    fn take_times_out_without_side_effects() {
        let slot = SharedSlot::new(64).unwrap();
        let started = Instant::now();
        assert_eq!(slot.take(Duration::from_millis(50)), None);
        assert!(started.elapsed() >= Duration::from_millis(50));

        // The slot must still be usable after a timed-out take.
        slot.write(b"after").unwrap();
        assert_eq!(slot.take(Duration::from_millis(10)), Some(b"after".to_vec()));
    }

    #[test]
    fn empty_payload_is_delivered_not_dropped() {
        let slot = SharedSlot::new(64).unwrap();
        slot.write(b"").unwrap();
        assert_eq!(slot.take(Duration::from_millis(10)), Some(Vec::new()));
    }

    #[test]
    fn oversize_write_rejected_and_slot_stays_consumable() {
        let slot = SharedSlot::new(8).unwrap();
        let err = slot.write(&[0u8; 9]).unwrap_err();
        assert_eq!(
            err,
            ShmError::PayloadTooLarge {
                len: 9,
                capacity: 8
            }
        );

        // Rejection must not flip the flag.
        assert_eq!(slot.take(Duration::from_millis(10)), None);
        slot.write(&[7u8; 8]).unwrap();
        assert_eq!(slot.take(Duration::from_millis(10)), Some(vec![7u8; 8]));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            SharedSlot::new(0),
            Err(ShmError::InvalidCapacity { requested: 0 })
        ));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn capacity_beyond_the_length_word_is_rejected() {
        let requested = u32::MAX as usize + 1;
        assert!(matches!(
            SharedSlot::new(requested),
            Err(ShmError::InvalidCapacity { requested: got }) if got == requested
        ));
    }

    #[test]
    fn consecutive_rendezvous_reuse_the_slot() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let slot = SharedSlot::new(256).unwrap();
        for _ in 0..50 {
            let len = rng.gen_range(0..=256);
            let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            slot.write(&payload).unwrap();
            assert_eq!(slot.take(Duration::from_millis(10)), Some(payload));
        }
    }
}
