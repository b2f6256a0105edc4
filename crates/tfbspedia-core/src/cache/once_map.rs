//! Keyed compute-once map shared by the identifier-set and count caches.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OnceCell;

/// Map from key to a value that is loaded at most once.
///
/// Each key owns its own `OnceCell`. Concurrent first requests for one key
/// wait on the same initialization, while loads for different keys never
/// contend beyond the brief map lock used to find the slot. A load that is
/// cancelled leaves its cell empty, never half-written.
pub(crate) struct OnceMap<K, V> {
    slots: RwLock<HashMap<K, Arc<OnceCell<Arc<V>>>>>,
    loads: AtomicU64,
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            loads: AtomicU64::new(0),
        }
    }

    /// Return the value for `key`, running `load` if no value exists yet.
    pub(crate) async fn get_or_load<F, Fut>(&self, key: &K, load: F) -> Arc<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let slot = self.slot(key);
        let loads = &self.loads;
        let value = slot
            .get_or_init(|| async move {
                loads.fetch_add(1, Ordering::SeqCst);
                Arc::new(load().await)
            })
            .await;
        Arc::clone(value)
    }

    /// Value for `key` if it has finished loading.
    #[cfg(test)]
    pub(crate) fn get(&self, key: &K) -> Option<Arc<V>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of keys whose value has finished loading.
    pub(crate) fn loaded(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }

    /// Number of loads started over the map's lifetime.
    pub(crate) fn loads(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    fn slot(&self, key: &K) -> Arc<OnceCell<Arc<V>>> {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(key) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_loads_once_per_key() {
        let map: OnceMap<&str, usize> = OnceMap::new();
        let a = map.get_or_load(&"a", || async { 1 }).await;
        let again = map.get_or_load(&"a", || async { 2 }).await;
        let b = map.get_or_load(&"b", || async { 3 }).await;

        assert_eq!(*a, 1);
        assert_eq!(*again, 1);
        assert_eq!(*b, 3);
        assert_eq!(map.loads(), 2);
        assert_eq!(map.loaded(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_loads_collapse() {
        let map = Arc::new(OnceMap::<u32, u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let map = Arc::clone(&map);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                map.get_or_load(&7, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    42
                })
                .await
            }));
        }
        for handle in handles {
            assert_eq!(*handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_load_leaves_slot_empty() {
        let map: OnceMap<u8, u8> = OnceMap::new();
        let slow = map.get_or_load(&1, || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            9
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), slow).await.is_err());
        assert!(map.get(&1).is_none());

        let value = map.get_or_load(&1, || async { 5 }).await;
        assert_eq!(*value, 5);
    }
}
