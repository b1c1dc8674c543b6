// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Readers/exclusive-writer access to a replaceable store.

use std::{fmt, time::SystemTime};

use parking_lot::RwLock;
use storehouse_tier::{Entry, Expiry, Result, StorehouseTier};

use crate::{
    HybridStore,
    telemetry::{StoreActivity, StoreOperation, emit},
};

/// Guards a [`HybridStore`] that can be swapped at runtime.
///
/// Reads share the store and run concurrently. Mutations and store replacement hold it exclusively, so
/// they are totally ordered with respect to each other and to reads. A replacement is a barrier: every
/// operation finishes entirely against the old store or entirely against the new one.
///
/// All operations run on the calling thread and block until the tier I/O they trigger completes.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # fn main() {
/// use storehouse::{Accessor, HybridStore, MockTier, StorehouseTier};
///
/// let first = MockTier::<i32>::new();
/// let accessor = Accessor::new(HybridStore::<i32>::new(Some(Box::new(first)), None));
/// accessor.set("k", 1, None).unwrap();
///
/// let old = accessor.replace_store(HybridStore::disabled());
/// assert!(accessor.get("k").unwrap_err().is_not_found());
/// assert_eq!(*old.get("k").unwrap().value(), 1);
/// # }
/// # #[cfg(not(feature = "test-util"))]
/// # fn main() {}
/// ```
pub struct Accessor<V> {
    store: RwLock<HybridStore<V>>,
}

impl<V> fmt::Debug for Accessor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor").field("store", &*self.store.read()).finish()
    }
}

impl<V> Accessor<V> {
    /// Wraps `store`.
    #[must_use]
    pub fn new(store: HybridStore<V>) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }

    /// Runs `f` with shared access to the current store.
    pub fn read<R>(&self, f: impl FnOnce(&HybridStore<V>) -> R) -> R {
        f(&self.store.read())
    }

    /// Runs `f` with exclusive access to the current store.
    pub fn write<R>(&self, f: impl FnOnce(&HybridStore<V>) -> R) -> R {
        f(&self.store.write())
    }

    /// Installs `store` and returns the one it replaces.
    ///
    /// The returned store is no longer reachable through the accessor; dropping it releases its tiers.
    pub fn replace_store(&self, store: HybridStore<V>) -> HybridStore<V> {
        let old = std::mem::replace(&mut *self.store.write(), store);
        emit(old.name(), StoreOperation::Reconfigure, StoreActivity::Replaced);
        old
    }

    /// Builds a replacement from the current store and installs it, holding exclusive access throughout.
    ///
    /// No operation runs between building the new store and installing it, so a replacement that reopens
    /// the same disk directory never races the old tier.
    ///
    /// # Errors
    ///
    /// Returns the error from `build`, in which case the current store stays installed.
    pub fn try_replace_store(&self, build: impl FnOnce(&HybridStore<V>) -> Result<HybridStore<V>>) -> Result<HybridStore<V>> {
        let mut guard = self.store.write();
        let store = build(&guard)?;
        let old = std::mem::replace(&mut *guard, store);
        drop(guard);
        emit(old.name(), StoreOperation::Reconfigure, StoreActivity::Replaced);
        Ok(old)
    }
}

impl<V> StorehouseTier<V> for Accessor<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Entry<V>> {
        self.read(|store| store.get(key))
    }

    fn set(&self, key: &str, value: V, expiry: Option<Expiry>) -> Result<()> {
        self.write(|store| store.set(key, value, expiry))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.write(|store| store.remove(key))
    }

    fn remove_all(&self) -> Result<()> {
        self.write(HybridStore::remove_all)
    }

    fn remove_expired(&self) -> Result<()> {
        self.write(HybridStore::remove_expired)
    }

    fn remove_stored_since(&self, date: SystemTime) -> Result<()> {
        self.write(|store| store.remove_stored_since(date))
    }

    fn remove_if_expired(&self, key: &str) -> Result<()> {
        self.write(|store| store.remove_if_expired(key))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.read(|store| store.exists(key))
    }

    fn len(&self) -> Option<u64> {
        self.read(HybridStore::len)
    }

    fn capacity(&self) -> Option<u64> {
        self.read(HybridStore::capacity)
    }

    fn usage(&self) -> Option<u64> {
        self.read(HybridStore::usage)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
        time::Duration,
    };

    use storehouse_tier::{
        Error, ErrorKind,
        testing::{MockTier, TierOp},
    };

    use super::*;

    fn accessor_over(memory: &MockTier<u32>) -> Accessor<u32> {
        Accessor::new(HybridStore::<u32>::new(Some(Box::new(memory.clone())), None))
    }

    #[test]
    fn failed_rebuild_keeps_current_store() {
        let memory = MockTier::new();
        let accessor = accessor_over(&memory);
        accessor.set("k", 1, None).unwrap();

        let err = accessor
            .try_replace_store(|_| Err(Error::from_kind(ErrorKind::InvalidConfiguration)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(*accessor.get("k").unwrap().value(), 1);
    }

    #[test]
    fn rebuild_sees_the_current_store() {
        let accessor = accessor_over(&MockTier::new());
        let old = accessor
            .try_replace_store(|current| {
                assert!(current.memory().is_some());
                Ok(HybridStore::disabled().with_name("next"))
            })
            .unwrap();
        assert!(!old.is_disabled());
        assert_eq!(accessor.read(HybridStore::name), "next");
    }

    #[test]
    fn reads_do_not_block_each_other() {
        let accessor = Arc::new(accessor_over(&MockTier::new()));
        let inside = Arc::new(AtomicBool::new(false));

        // One reader parks inside the read section until a second reader has entered it too.
        let parked = {
            let accessor = Arc::clone(&accessor);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                accessor.read(|_| {
                    inside.store(true, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(500));
                })
            })
        };
        while !inside.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        assert!(accessor.get("k").unwrap_err().is_not_found());
        assert!(accessor.store.try_write().is_none());
        parked.join().unwrap();
    }

    #[test]
    fn writes_are_totally_ordered() {
        let memory = MockTier::new();
        let accessor = Arc::new(accessor_over(&memory));
        let handles: Vec<_> = (0..8_u32)
            .map(|t| {
                let accessor = Arc::clone(&accessor);
                thread::spawn(move || {
                    for i in 0..50 {
                        accessor.set(&format!("{t}/{i}"), i, None).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let sets = memory.operations().iter().filter(|op| matches!(op, TierOp::Set { .. })).count();
        assert_eq!(sets, 400);
        assert_eq!(accessor.len(), Some(400));
    }
}
