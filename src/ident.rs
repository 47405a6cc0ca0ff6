use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Ids;
use crate::error::{StoreError, StoreResult};

/// Existence check the allocator runs candidates against.
pub trait IdLookup {
    async fn id_exists(&self, id: &str) -> StoreResult<bool>;
}

/// Hands out short identifiers that have no row at the time of the check.
///
/// Nothing is reserved: the primary key constraint on insert is what actually
/// keeps identifiers unique.
#[derive(Debug, Clone, Copy)]
pub struct Allocator {
    length: usize,
    max_attempts: u32,
}

impl Allocator {
    pub fn new(ids: Ids) -> Self {
        Allocator {
            length: ids.length,
            max_attempts: ids.max_attempts,
        }
    }

    pub async fn allocate(&self, lookup: &impl IdLookup) -> StoreResult<String> {
        for attempt in 1..=self.max_attempts {
            let id = generate_id(self.length);
            if !lookup.id_exists(&id).await? {
                return Ok(id);
            }
            debug!("id '{id}' is taken, generating another (attempt {attempt})");
        }

        warn!(
            "no free id of length {} after {} attempts",
            self.length, self.max_attempts
        );
        Err(StoreError::AllocationExhausted {
            attempts: self.max_attempts,
        })
    }
}

/// Random token over `[A-Za-z0-9]`.
pub fn generate_id(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn generate_delete_key() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Reports the first `taken` candidates as occupied.
    struct TakenFor {
        taken: u32,
        seen: AtomicU32,
    }

    impl TakenFor {
        fn new(taken: u32) -> Self {
            TakenFor {
                taken,
                seen: AtomicU32::new(0),
            }
        }
    }

    impl IdLookup for TakenFor {
        async fn id_exists(&self, _id: &str) -> StoreResult<bool> {
            let seen = self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(seen < self.taken)
        }
    }

    fn allocator(length: usize, max_attempts: u32) -> Allocator {
        Allocator::new(Ids {
            length,
            max_attempts,
        })
    }

    #[test]
    fn ids_are_url_safe_and_sized() {
        let id = generate_id(12);
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn delete_keys_differ() {
        let keys: HashSet<_> = (0..100).map(|_| generate_delete_key()).collect();
        assert_eq!(keys.len(), 100);
    }

    #[tokio::test]
    async fn free_id_on_first_try() {
        let lookup = TakenFor::new(0);
        let id = allocator(7, 4).allocate(&lookup).await.unwrap();
        assert_eq!(id.len(), 7);
        assert_eq!(lookup.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_past_collisions() {
        let lookup = TakenFor::new(3);
        allocator(7, 4).allocate(&lookup).await.unwrap();
        assert_eq!(lookup.seen.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let lookup = TakenFor::new(u32::MAX);
        let err = allocator(7, 5).allocate(&lookup).await.unwrap_err();
        assert!(matches!(err, StoreError::AllocationExhausted { attempts: 5 }));
        assert_eq!(lookup.seen.load(Ordering::SeqCst), 5);
    }
}
