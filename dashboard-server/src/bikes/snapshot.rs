//! In-memory snapshot of merged bike station data.
//!
//! The refresh loop is the only writer. Request handlers read a copy, so a
//! snapshot is never observed half-written.

use std::sync::{Arc, Mutex, PoisonError};

use super::value::StationRecord;

/// All known stations as of the last successful refresh.
pub type Snapshot = Vec<StationRecord>;

/// Holds the latest published snapshot.
///
/// The lock guards only an `Arc` swap or clone; readers copy the records
/// after releasing it.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: Mutex<Arc<Snapshot>>,
}

impl SnapshotCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held snapshot.
    pub fn set(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        let previous = {
            let mut guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, snapshot)
        };
        // The old snapshot is freed outside the lock
        drop(previous);
    }

    /// Return a copy of the current snapshot.
    pub fn get(&self) -> Snapshot {
        self.shared().as_ref().clone()
    }

    /// Number of stations in the current snapshot.
    pub fn len(&self) -> usize {
        self.shared().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared().is_empty()
    }

    fn shared(&self) -> Arc<Snapshot> {
        let guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bikes::FieldValue;

    fn station(id: &str, bikes: i64) -> StationRecord {
        let mut record = StationRecord::new();
        record.insert("station_id".into(), FieldValue::Text(id.into()));
        record.insert("num_bikes_available".into(), FieldValue::Int(bikes));
        record
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = SnapshotCache::new();
        assert!(cache.get().is_empty());
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn get_returns_what_was_set() {
        let cache = SnapshotCache::new();
        let snapshot = vec![station("A", 3), station("B", 0)];

        cache.set(snapshot.clone());

        assert_eq!(cache.get(), snapshot);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn set_replaces_wholesale() {
        let cache = SnapshotCache::new();
        cache.set(vec![station("A", 3), station("B", 0)]);
        cache.set(vec![station("C", 7)]);

        assert_eq!(cache.get(), vec![station("C", 7)]);
    }

    #[test]
    fn copies_are_independent_of_later_sets() {
        let cache = SnapshotCache::new();
        cache.set(vec![station("A", 3)]);

        let mut copy = cache.get();
        copy.push(station("Z", 1));
        cache.set(vec![station("B", 1)]);

        assert_eq!(copy.len(), 2);
        assert_eq!(cache.get(), vec![station("B", 1)]);
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let cache = Arc::new(SnapshotCache::new());
        let old: Snapshot = (0..50).map(|i| station(&format!("old-{i}"), 1)).collect();
        let new: Snapshot = (0..80).map(|i| station(&format!("new-{i}"), 2)).collect();
        cache.set(old.clone());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let old = old.clone();
                let new = new.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let seen = cache.get();
                        assert!(seen == old || seen == new, "observed a partial snapshot");
                    }
                })
            })
            .collect();

        for _ in 0..100 {
            cache.set(new.clone());
            cache.set(old.clone());
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
