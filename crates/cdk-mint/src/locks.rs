//! Per-quote serialization: `mint()` and
//! `melt()` hold a lock keyed by quote id for the duration of the whole
//! operation, so two requests against the same quote never interleave.
//!
//! Entries are never removed: deleting one safely would require knowing no
//! other task is about to wait on it, which a plain map cannot track without
//! extra reference counting. Left resident, growth is bounded by the number
//! of quotes the mint has ever seen, a trade-off accepted here in exchange
//! for never needing reference counting or a removal task.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// A lazily populated, never-shrinking map from quote id to a mutex.
#[derive(Default)]
pub struct QuoteLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for QuoteLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteLocks").finish_non_exhaustive()
    }
}

impl QuoteLocks {
    /// An empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, quote_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().expect("lock not poisoned").get(quote_id) {
            return lock.clone();
        }
        self.locks
            .write()
            .expect("lock not poisoned")
            .entry(quote_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquire the lock for `quote_id`, waiting for any in-flight operation
    /// on the same quote to finish first. The returned guard releases the
    /// lock on drop.
    pub async fn acquire(&self, quote_id: &str) -> OwnedMutexGuard<()> {
        self.entry(quote_id).lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn same_quote_serializes() {
        let locks = Arc::new(QuoteLocks::new());
        let counter = Arc::new(AtomicU32::new(0));
        let max_concurrent = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let counter = counter.clone();
            let max_concurrent = max_concurrent.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("quote-a").await;
                let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.expect("task does not panic");
        }

        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_quotes_do_not_block_each_other() {
        let locks = QuoteLocks::new();
        let _guard_a = locks.acquire("quote-a").await;
        // Must not deadlock: a distinct quote id is an independent mutex.
        let _guard_b = locks.acquire("quote-b").await;
    }
}
