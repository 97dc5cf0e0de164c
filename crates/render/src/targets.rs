use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

type FreeList<K, T> = Arc<Mutex<Vec<(K, T)>>>;

/// Pool of reusable render targets keyed by their description.
///
/// [`acquire`](Self::acquire) hands out a [`TemporaryTarget`] guard; dropping
/// the guard returns the target to the pool, so a camera that bails out of a
/// frame early still releases everything it took.
pub struct TargetPool<K, T> {
    free: FreeList<K, T>,
}

impl<K, T> Default for TargetPool<K, T> {
    fn default() -> Self {
        Self {
            free: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<K, T> fmt::Debug for TargetPool<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetPool")
            .field("idle", &self.free.lock().len())
            .finish()
    }
}

impl<K: PartialEq, T> TargetPool<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an idle target matching `key`, or build one with `create`.
    pub fn acquire(&self, key: K, create: impl FnOnce(&K) -> T) -> TemporaryTarget<K, T> {
        let reused = {
            let mut free = self.free.lock();
            free.iter()
                .position(|(k, _)| *k == key)
                .map(|i| free.swap_remove(i).1)
        };
        let value = match reused {
            Some(value) => value,
            None => {
                tracing::debug!("allocating temporary render target");
                create(&key)
            }
        };
        TemporaryTarget {
            entry: Some((key, value)),
            home: Arc::clone(&self.free),
        }
    }

    /// Targets currently parked in the pool.
    pub fn idle_count(&self) -> usize {
        self.free.lock().len()
    }

    /// Drop every idle target, e.g. after a resize makes them useless.
    pub fn clear(&self) {
        self.free.lock().clear();
    }
}

/// Scoped lease on a pooled target.
pub struct TemporaryTarget<K, T> {
    entry: Option<(K, T)>,
    home: FreeList<K, T>,
}

impl<K, T> TemporaryTarget<K, T> {
    fn entry(&self) -> &(K, T) {
        self.entry
            .as_ref()
            .expect("temporary target is present until dropped")
    }

    pub fn key(&self) -> &K {
        &self.entry().0
    }
}

impl<K, T> Deref for TemporaryTarget<K, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entry().1
    }
}

impl<K, T> Drop for TemporaryTarget<K, T> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.home.lock().push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn drop_returns_target_to_pool() {
        let pool: TargetPool<(u32, u32), String> = TargetPool::new();
        {
            let target = pool.acquire((64, 64), |_| "color".to_string());
            assert_eq!(&*target, "color");
            assert_eq!(pool.idle_count(), 0);
        }
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn matching_key_is_reused() {
        let pool: TargetPool<(u32, u32), u32> = TargetPool::new();
        let created = Cell::new(0);
        let make = |_: &(u32, u32)| {
            created.set(created.get() + 1);
            created.get()
        };

        drop(pool.acquire((8, 8), make));
        let again = pool.acquire((8, 8), make);
        assert_eq!(*again, 1);
        assert_eq!(created.get(), 1);

        let other = pool.acquire((16, 8), make);
        assert_eq!(*other, 2);
        assert_eq!(other.key(), &(16, 8));
    }

    #[test]
    fn early_return_still_releases() {
        fn render(pool: &TargetPool<u8, u8>, fail: bool) -> Result<(), ()> {
            let _color = pool.acquire(0, |_| 0);
            let _depth = pool.acquire(1, |_| 1);
            if fail {
                return Err(());
            }
            Ok(())
        }
        let pool = TargetPool::new();
        assert!(render(&pool, true).is_err());
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn clear_drops_idle_targets() {
        let pool: TargetPool<u8, u8> = TargetPool::new();
        drop(pool.acquire(0, |_| 0));
        pool.clear();
        assert_eq!(pool.idle_count(), 0);
    }
}
