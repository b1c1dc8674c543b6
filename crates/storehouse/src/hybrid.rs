// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Composition of a memory tier and a disk tier.

use std::{fmt, time::SystemTime};

use storehouse_tier::{Entry, Error, Expiry, Result, StorehouseTier};

use crate::telemetry::{StoreActivity, StoreOperation, emit};

/// Name used in events when none is configured.
pub const DEFAULT_STORE_NAME: &str = "storehouse";

type Tier<V> = Box<dyn StorehouseTier<V>>;

/// A read-through, write-through composition of an optional memory tier and an optional disk tier.
///
/// - `get` consults the memory tier first. Any memory failure falls back to the disk tier, and a disk
///   hit is copied into the memory tier with the entry's absolute expiry before it is returned. A failed
///   copy is logged and does not fail the read.
/// - `set` writes both tiers. Both writes are always attempted; the first failure is returned and the
///   other tier is not rolled back.
/// - The `remove*` operations fan out to the memory tier and then the disk tier. Every tier is attempted
///   even if an earlier one fails, and the first failure is returned.
///
/// A store with neither tier is disabled: reads miss and mutations succeed without effect.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # fn main() {
/// use storehouse::{HybridStore, MockTier, StorehouseTier};
///
/// let memory = MockTier::<String>::new();
/// let disk = MockTier::<String>::new();
/// disk.set("c", "v".to_string(), None).unwrap();
///
/// let store = HybridStore::<String>::new(Some(Box::new(memory.clone())), Some(Box::new(disk)));
/// assert_eq!(store.get("c").unwrap().value(), "v");
/// assert!(memory.contains_key("c"));
/// # }
/// # #[cfg(not(feature = "test-util"))]
/// # fn main() {}
/// ```
pub struct HybridStore<V> {
    name: &'static str,
    memory: Option<Tier<V>>,
    disk: Option<Tier<V>>,
}

impl<V> fmt::Debug for HybridStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridStore")
            .field("name", &self.name)
            .field("memory", &self.memory.is_some())
            .field("disk", &self.disk.is_some())
            .finish()
    }
}

impl<V> HybridStore<V> {
    /// Creates a store over the given tiers.
    #[must_use]
    pub fn new(memory: Option<Tier<V>>, disk: Option<Tier<V>>) -> Self {
        Self {
            name: DEFAULT_STORE_NAME,
            memory,
            disk,
        }
    }

    /// Creates a store without tiers.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    /// Sets the name reported in events.
    #[must_use]
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Returns the name reported in events.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the memory tier, if any.
    #[must_use]
    pub fn memory(&self) -> Option<&dyn StorehouseTier<V>> {
        self.memory.as_deref()
    }

    /// Returns the disk tier, if any.
    #[must_use]
    pub fn disk(&self) -> Option<&dyn StorehouseTier<V>> {
        self.disk.as_deref()
    }

    /// Returns `true` if the store has neither tier.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.memory.is_none() && self.disk.is_none()
    }

    fn fan_out(&self, operation: StoreOperation, apply: impl Fn(&dyn StorehouseTier<V>) -> Result<()>) -> Result<()> {
        let mut first_error = None;
        for tier in [self.memory(), self.disk()].into_iter().flatten() {
            if let Err(e) = apply(tier) {
                let _ = first_error.get_or_insert(e);
            }
        }
        self.finish(operation, first_error.map_or(Ok(()), Err))
    }

    fn finish(&self, operation: StoreOperation, result: Result<()>) -> Result<()> {
        let activity = if result.is_ok() { StoreActivity::Ok } else { StoreActivity::Error };
        emit(self.name, operation, activity);
        result
    }
}

impl<V> HybridStore<V>
where
    V: Clone,
{
    fn promote(&self, key: &str, entry: &Entry<V>) {
        let Some(memory) = self.memory() else {
            return;
        };

        // The entry's expiry is already absolute, so the copy expires together with the original.
        match memory.set(key, entry.value().clone(), Some(entry.expiry())) {
            Ok(()) => emit(self.name, StoreOperation::Get, StoreActivity::Promoted),
            Err(e) => {
                tracing::warn!(storehouse.name = self.name, key, error = %e, "promotion to memory tier failed");
                emit(self.name, StoreOperation::Get, StoreActivity::PromotionFailed);
            }
        }
    }
}

impl<V> StorehouseTier<V> for HybridStore<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Entry<V>> {
        if let Some(memory) = self.memory() {
            match memory.get(key) {
                Ok(entry) => {
                    emit(self.name, StoreOperation::Get, StoreActivity::MemoryHit);
                    return Ok(entry);
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::debug!(storehouse.name = self.name, key, error = %e, "memory tier failed, reading disk tier");
                }
            }
        }

        let Some(disk) = self.disk() else {
            emit(self.name, StoreOperation::Get, StoreActivity::Miss);
            return Err(Error::not_found());
        };

        match disk.get(key) {
            Ok(entry) => {
                emit(self.name, StoreOperation::Get, StoreActivity::DiskHit);
                self.promote(key, &entry);
                Ok(entry)
            }
            Err(e) => {
                let activity = if e.is_not_found() { StoreActivity::Miss } else { StoreActivity::Error };
                emit(self.name, StoreOperation::Get, activity);
                Err(e)
            }
        }
    }

    fn set(&self, key: &str, value: V, expiry: Option<Expiry>) -> Result<()> {
        let result = match (self.memory(), self.disk()) {
            (Some(memory), Some(disk)) => {
                let memory_result = memory.set(key, value.clone(), expiry);
                let disk_result = disk.set(key, value, expiry);
                memory_result.and(disk_result)
            }
            (Some(tier), None) | (None, Some(tier)) => tier.set(key, value, expiry),
            (None, None) => Ok(()),
        };
        self.finish(StoreOperation::Set, result)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.fan_out(StoreOperation::Remove, |tier| tier.remove(key))
    }

    fn remove_all(&self) -> Result<()> {
        self.fan_out(StoreOperation::RemoveAll, |tier| tier.remove_all())
    }

    fn remove_expired(&self) -> Result<()> {
        self.fan_out(StoreOperation::RemoveExpired, |tier| tier.remove_expired())
    }

    fn remove_stored_since(&self, date: SystemTime) -> Result<()> {
        self.fan_out(StoreOperation::RemoveStoredSince, |tier| tier.remove_stored_since(date))
    }

    fn remove_if_expired(&self, key: &str) -> Result<()> {
        self.fan_out(StoreOperation::RemoveIfExpired, |tier| tier.remove_if_expired(key))
    }

    /// Entries in the disk tier, or in the memory tier when there is no disk tier.
    fn len(&self) -> Option<u64> {
        self.disk().or_else(|| self.memory()).and_then(|tier| tier.len())
    }

    /// Capacity of the disk tier, or of the memory tier when there is no disk tier.
    fn capacity(&self) -> Option<u64> {
        self.disk().or_else(|| self.memory()).and_then(|tier| tier.capacity())
    }

    /// Usage of the disk tier, or of the memory tier when there is no disk tier.
    fn usage(&self) -> Option<u64> {
        self.disk().or_else(|| self.memory()).and_then(|tier| tier.usage())
    }
}
