// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The reconfigurable cache facade.

use std::{fmt, path::PathBuf, sync::Arc, time::SystemTime};

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use storehouse_memory::{AutoPurgeConfig, MemoryConfig};
use storehouse_tier::{Codec, Entry, Error, ErrorKind, Expiry, JsonCodec, Result, StorehouseTier};
use tick::Clock;

use crate::{
    Accessor, CachePolicy, StorehouseBuilder,
    builder::{MemoryLayout, Parts, Settings},
};

/// A two-tier object cache whose policy and limits can change while it is in use.
///
/// A `Storehouse` owns an [`Accessor`] around a [`HybridStore`](crate::HybridStore) built from its
/// current settings. Changing the policy or a limit builds a fresh store and swaps it in atomically.
/// The disk tier reopens the same directory, so persisted entries survive a reconfiguration while
/// memory contents start empty. When a rebuild fails the previous store and settings stay in place.
///
/// # Examples
///
/// ```
/// use storehouse::{CachePolicy, Storehouse, StorehouseTier};
/// use tick::Clock;
///
/// let root = tempfile::tempdir()?;
/// let store = Storehouse::<String>::builder(Clock::new_frozen(), root.path()).build()?;
///
/// store.set("greeting", "hello".to_string(), None)?;
/// assert_eq!(store.get("greeting")?.value(), "hello");
///
/// store.set_policy(CachePolicy::DiskOnly)?;
/// assert_eq!(store.get("greeting")?.value(), "hello");
///
/// store.set_policy(CachePolicy::Disabled)?;
/// assert!(store.get("greeting").unwrap_err().is_not_found());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Storehouse<V> {
    parts: Parts<V>,
    settings: Mutex<Settings>,
    accessor: Accessor<V>,
}

impl<V> fmt::Debug for Storehouse<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storehouse")
            .field("parts", &self.parts)
            .field("settings", &*self.settings.lock())
            .field("accessor", &self.accessor)
            .finish()
    }
}

impl<V> Storehouse<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a builder that stores values as JSON under `root`.
    #[must_use]
    pub fn builder(clock: Clock, root: impl Into<PathBuf>) -> StorehouseBuilder<V> {
        StorehouseBuilder::new(clock, root.into(), Arc::new(JsonCodec::<V>::new()))
    }
}

impl<V> Storehouse<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a builder that stores values with `codec` under `root`.
    #[must_use]
    pub fn builder_with_codec(clock: Clock, root: impl Into<PathBuf>, codec: impl Codec<V> + 'static) -> StorehouseBuilder<V> {
        StorehouseBuilder::new(clock, root.into(), Arc::new(codec))
    }

    pub(crate) fn from_parts(parts: Parts<V>, settings: Settings) -> Result<Self> {
        let store = parts.build_store(&settings)?;
        Ok(Self {
            parts,
            settings: Mutex::new(settings),
            accessor: Accessor::new(store),
        })
    }

    /// Returns the name reported in events.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.parts.name
    }

    /// Returns the accessor guarding the current store.
    #[must_use]
    pub fn accessor(&self) -> &Accessor<V> {
        &self.accessor
    }

    /// Removes the entry for `key` from every tier.
    ///
    /// # Errors
    ///
    /// Returns the first tier error.
    pub fn remove_by_key(&self, key: &str) -> Result<()> {
        self.accessor.remove(key)
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        self.settings.lock().policy
    }

    /// Switches to `policy`, rebuilding the store when it differs from the active one.
    ///
    /// # Errors
    ///
    /// Returns the error that prevented the new store from opening.
    pub fn set_policy(&self, policy: CachePolicy) -> Result<()> {
        self.reconfigure(|settings| {
            settings.policy = policy;
            Ok(())
        })
    }

    /// Returns the disk budget in bytes, `0` when unbounded.
    #[must_use]
    pub fn max_disk_capacity(&self) -> u64 {
        self.settings.lock().disk.max_size_bytes()
    }

    /// Changes the disk budget. Reopening the disk tier evicts down to the new budget.
    ///
    /// # Errors
    ///
    /// Returns the error that prevented the new store from opening.
    pub fn set_max_disk_capacity(&self, bytes: u64) -> Result<()> {
        self.reconfigure(|settings| {
            settings.disk = settings.disk.clone().with_max_size_bytes(bytes);
            Ok(())
        })
    }

    /// Returns the memory cost limit in bytes, `0` when the bounded memory tier has no limit.
    ///
    /// For an auto-purging memory tier this is its capacity.
    #[must_use]
    pub fn max_memory_total_cost(&self) -> u64 {
        match self.settings.lock().memory {
            MemoryLayout::Bounded(config) => config.total_cost_limit(),
            MemoryLayout::AutoPurging(config) => config.memory_capacity_bytes(),
        }
    }

    /// Changes the memory cost limit.
    ///
    /// For the bounded memory tier `0` removes the limit. An auto-purging tier takes `cost` as its capacity
    /// and lowers its preferred usage to at most `cost`; it has no unbounded form, so `0` is rejected.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error for a zero cost on an auto-purging tier, otherwise the error
    /// that prevented the new store from opening.
    pub fn set_max_memory_total_cost(&self, cost: u64) -> Result<()> {
        self.reconfigure(|settings| {
            settings.memory = match settings.memory {
                MemoryLayout::Bounded(config) => MemoryLayout::Bounded(config.with_total_cost_limit(cost)),
                MemoryLayout::AutoPurging(_) if cost == 0 => {
                    return Err(Error::from_cause(
                        ErrorKind::InvalidConfiguration,
                        "an auto-purging memory tier needs a non-zero capacity",
                    ));
                }
                MemoryLayout::AutoPurging(config) => MemoryLayout::AutoPurging(
                    AutoPurgeConfig::new(cost, config.preferred_usage_after_purge_bytes().min(cost))?.with_expiry(config.expiry()),
                ),
            };
            Ok(())
        })
    }

    /// Replaces the bounded memory tier configuration.
    ///
    /// # Errors
    ///
    /// Returns the error that prevented the new store from opening.
    pub fn set_memory_config(&self, config: MemoryConfig) -> Result<()> {
        self.reconfigure(|settings| {
            settings.memory = MemoryLayout::Bounded(config);
            Ok(())
        })
    }

    /// Returns the memory tier capacity, or `None` without a bounded memory tier.
    #[must_use]
    pub fn memory_capacity(&self) -> Option<u64> {
        self.accessor.read(|store| store.memory().and_then(|tier| tier.capacity()))
    }

    /// Returns the memory tier usage, or `None` without a memory tier.
    #[must_use]
    pub fn memory_usage(&self) -> Option<u64> {
        self.accessor.read(|store| store.memory().and_then(|tier| tier.usage()))
    }

    /// Returns the disk tier capacity, or `None` without a bounded disk tier.
    #[must_use]
    pub fn disk_capacity(&self) -> Option<u64> {
        self.accessor.read(|store| store.disk().and_then(|tier| tier.capacity()))
    }

    /// Returns the bytes held by the disk tier, or `None` without a disk tier.
    #[must_use]
    pub fn disk_usage(&self) -> Option<u64> {
        self.accessor.read(|store| store.disk().and_then(|tier| tier.usage()))
    }

    fn reconfigure(&self, change: impl FnOnce(&mut Settings) -> Result<()>) -> Result<()> {
        let mut settings = self.settings.lock();
        let mut next = settings.clone();
        change(&mut next)?;
        if next == *settings {
            return Ok(());
        }

        let previous = self.accessor.try_replace_store(|_| self.parts.build_store(&next))?;
        *settings = next;
        drop(previous);
        Ok(())
    }
}

impl<V> StorehouseTier<V> for Storehouse<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &str) -> Result<Entry<V>> {
        self.accessor.get(key)
    }

    fn set(&self, key: &str, value: V, expiry: Option<Expiry>) -> Result<()> {
        self.accessor.set(key, value, expiry)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.accessor.remove(key)
    }

    fn remove_all(&self) -> Result<()> {
        self.accessor.remove_all()
    }

    fn remove_expired(&self) -> Result<()> {
        self.accessor.remove_expired()
    }

    fn remove_stored_since(&self, date: SystemTime) -> Result<()> {
        self.accessor.remove_stored_since(date)
    }

    fn remove_if_expired(&self, key: &str) -> Result<()> {
        self.accessor.remove_if_expired(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.accessor.exists(key)
    }

    fn len(&self) -> Option<u64> {
        self.accessor.len()
    }

    fn capacity(&self) -> Option<u64> {
        self.accessor.capacity()
    }

    fn usage(&self) -> Option<u64> {
        self.accessor.usage()
    }
}
