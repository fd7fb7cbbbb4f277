use std::sync::Mutex;

use crate::error::LoadgenError;

// ═══════════════════════════════════════════════════════════════
//  SampleStore
// ═══════════════════════════════════════════════════════════════

/// Append-only latency samples (nanoseconds) for a single run.
///
/// Capped at the number of requests the run sends; pushes beyond the cap are
/// refused. Safe to share between any number of collector threads.
pub struct SampleStore {
    samples: Mutex<Vec<u64>>,
    capacity: usize,
}

impl SampleStore {
    /// Allocates room for `capacity` samples up front so the receive path
    /// never reallocates.
    pub fn with_capacity(capacity: usize) -> Result<Self, LoadgenError> {
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(capacity)
            .map_err(|_| LoadgenError::Allocation(capacity))?;
        Ok(Self {
            samples: Mutex::new(samples),
            capacity,
        })
    }

    /// Appends one sample. Returns `false` if the store is already full.
    pub fn push(&self, sample_ns: u64) -> bool {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        if samples.len() >= self.capacity {
            return false;
        }
        samples.push(sample_ns);
        true
    }

    pub fn len(&self) -> usize {
        self.samples.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ends the run: consumes the store and hands out the samples.
    pub fn into_samples(self) -> Vec<u64> {
        self.samples.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_respects_capacity() {
        let store = SampleStore::with_capacity(3).unwrap();
        assert!(store.is_empty());
        assert!(store.push(1));
        assert!(store.push(2));
        assert!(store.push(3));
        assert!(!store.push(4));
        assert!(store.is_full());
        assert_eq!(store.into_samples(), vec![1, 2, 3]);
    }

    #[test]
    fn concurrent_pushes_are_not_lost() {
        let store = SampleStore::with_capacity(8 * 10_000).unwrap();
        std::thread::scope(|s| {
            for t in 0..8u64 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..10_000u64 {
                        assert!(store.push(t * 10_000 + i));
                    }
                });
            }
        });
        let mut samples = store.into_samples();
        samples.sort_unstable();
        samples.dedup();
        assert_eq!(samples.len(), 80_000);
    }

    #[test]
    fn concurrent_pushes_stop_at_capacity() {
        let store = SampleStore::with_capacity(1000).unwrap();
        std::thread::scope(|s| {
            for _ in 0..4 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..500 {
                        store.push(i);
                    }
                });
            }
        });
        assert_eq!(store.len(), 1000);
    }

    #[test]
    fn huge_capacity_fails_to_allocate() {
        assert!(matches!(
            SampleStore::with_capacity(usize::MAX / 2),
            Err(LoadgenError::Allocation(_))
        ));
    }
}
