//! Keyed single-flight resolution.
//!
//! Every distinct key owns one `OnceCell`. The first caller for a key runs the
//! resolver; concurrent callers for the same key await that same run instead of
//! starting their own, and later callers get the memoized value. Distinct keys
//! never wait on each other. A failed resolution leaves the cell empty, so the
//! next waiter (or a later caller) runs the resolver again.

use crate::domain::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

pub struct Coalescer<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Coalescer<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve<F, Fut>(&self, key: K, resolver: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let cell = {
            let mut cells = self
                .cells
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            cells.entry(key).or_default().clone()
        };
        cell.get_or_try_init(resolver).await.cloned()
    }

    /// Memoized value for `key`, without resolving it.
    #[cfg(test)]
    pub fn peek(&self, key: &K) -> Option<V> {
        let cells = self
            .cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl<K, V> Default for Coalescer<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_resolution() {
        let coalescer: Arc<Coalescer<String, u64>> = Arc::new(Coalescer::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coalescer = coalescer.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                coalescer
                    .resolve("folder".to_string(), || async {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.peek(&"folder".to_string()), Some(42));
    }

    #[tokio::test]
    async fn test_failure_is_not_memoized() {
        let coalescer: Coalescer<&'static str, u64> = Coalescer::new();

        let first = coalescer
            .resolve("key", || async { Err(AppError::Internal("boom".to_string())) })
            .await;
        assert!(first.is_err());

        let second = coalescer.resolve("key", || async { Ok(7) }).await.unwrap();
        assert_eq!(second, 7);
    }

    #[tokio::test]
    async fn test_distinct_keys_resolve_independently() {
        let coalescer: Coalescer<u8, u8> = Coalescer::new();
        assert_eq!(coalescer.resolve(1, || async { Ok(10) }).await.unwrap(), 10);
        assert_eq!(coalescer.resolve(2, || async { Ok(20) }).await.unwrap(), 20);
        assert_eq!(coalescer.len(), 2);
    }
}
