//! Correlation-id generation.
//!
//! Ids are RFC-4122 version-4 UUIDs in textual form. OS entropy is the
//! primary source; when it is unavailable the generator falls back to a
//! wall-clock-and-counter seeded PRNG whose output is shaped through the
//! same builder, so fallback ids remain v4-shaped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use uuid::Builder;

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Produces a fresh collision-resistant correlation id.
pub fn message_id() -> String {
    let mut bytes = [0u8; 16];
    if OsRng.try_fill_bytes(&mut bytes).is_err() {
        fallback_fill(&mut bytes);
    }
    Builder::from_random_bytes(bytes).into_uuid().to_string()
}

fn fallback_fill(bytes: &mut [u8; 16]) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0);
    // The counter keeps seeds distinct for ids minted within one clock tick.
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut rng = StdRng::seed_from_u64(nanos ^ counter.rotate_left(32));
    rng.fill_bytes(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_v4_shaped(id: &str) {
        let groups: Vec<&str> = id.split('-').collect();
        assert_eq!(groups.len(), 5, "id {id} is not dash-grouped");
        let lens: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(lens, vec![8, 4, 4, 4, 12], "id {id} has wrong group sizes");
        assert!(
            id.chars().all(|c| c == '-' || c.is_ascii_hexdigit()),
            "id {id} has non-hex characters"
        );
        assert_eq!(groups[2].chars().next(), Some('4'), "id {id} is not v4");
        assert!(
            matches!(groups[3].chars().next(), Some('8' | '9' | 'a' | 'b')),
            "id {id} has wrong variant bits"
        );
    }

    #[test]
    fn ids_are_v4_shaped() {
        for _ in 0..100 {
            assert_v4_shaped(&message_id());
        }
    }

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| message_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn fallback_ids_are_v4_shaped_and_distinct() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let mut bytes = [0u8; 16];
            fallback_fill(&mut bytes);
            let id = Builder::from_random_bytes(bytes).into_uuid().to_string();
            assert_v4_shaped(&id);
            seen.insert(id);
        }
        assert_eq!(seen.len(), 100);
    }
}
