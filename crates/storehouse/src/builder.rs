// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`Storehouse`] and the pieces it rebuilds stores from.

use std::{fmt, path::PathBuf, sync::Arc};

use storehouse_disk::{DiskConfig, DiskTier};
use storehouse_memory::{AutoPurgeConfig, AutoPurgingTier, InMemoryTier, MemoryConfig, Weigher};
use storehouse_tier::{Codec, Result, StorehouseTier};
use tick::Clock;

use crate::{CachePolicy, HybridStore, Storehouse, hybrid::DEFAULT_STORE_NAME};

/// Default cost limit of the memory tier: 30 MiB.
pub const DEFAULT_MEMORY_TOTAL_COST_BYTES: u64 = 30 * 1024 * 1024;

/// Which memory tier a store runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum MemoryLayout {
    Bounded(MemoryConfig),
    AutoPurging(AutoPurgeConfig),
}

/// Everything that can change when a store is reconfigured.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Settings {
    pub policy: CachePolicy,
    pub memory: MemoryLayout,
    pub disk: DiskConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            policy: CachePolicy::Hybrid,
            memory: MemoryLayout::Bounded(MemoryConfig::new().with_total_cost_limit(DEFAULT_MEMORY_TOTAL_COST_BYTES)),
            disk: DiskConfig::default(),
        }
    }
}

/// The fixed inputs stores are built from.
pub(crate) struct Parts<V> {
    pub name: &'static str,
    pub clock: Clock,
    pub root: PathBuf,
    pub codec: Arc<dyn Codec<V>>,
    pub weigher: Weigher<V>,
}

impl<V> fmt::Debug for Parts<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parts")
            .field("name", &self.name)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl<V> Parts<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn build_store(&self, settings: &Settings) -> Result<HybridStore<V>> {
        let memory = if settings.policy.uses_memory() {
            Some(self.memory_tier(settings.memory)?)
        } else {
            None
        };

        let disk: Option<Box<dyn StorehouseTier<V>>> = if settings.policy.uses_disk() {
            let tier = DiskTier::open(&self.root, settings.disk.clone(), Arc::clone(&self.codec), self.clock.clone())?;
            Some(Box::new(tier))
        } else {
            None
        };

        Ok(HybridStore::new(memory, disk).with_name(self.name))
    }

    fn memory_tier(&self, layout: MemoryLayout) -> Result<Box<dyn StorehouseTier<V>>> {
        let tier: Box<dyn StorehouseTier<V>> = match layout {
            MemoryLayout::Bounded(config) => Box::new(
                InMemoryTier::builder(self.clock.clone())
                    .config(config)
                    .shared_weigher(Some(Arc::clone(&self.weigher)))
                    .build(),
            ),
            MemoryLayout::AutoPurging(config) => Box::new(AutoPurgingTier::new(config, Arc::clone(&self.codec), self.clock.clone())?),
        };
        Ok(tier)
    }
}

/// Builder for a [`Storehouse`].
///
/// Created by [`Storehouse::builder`] or [`Storehouse::builder_with_codec`]. Without further
/// configuration the store is hybrid, bounds memory to 30 MiB of encoded values and disk to 150 MiB
/// under `<root>/storehouse`.
///
/// # Examples
///
/// ```
/// use storehouse::{CachePolicy, DiskConfig, MemoryConfig, Storehouse};
/// use tick::Clock;
///
/// let root = tempfile::tempdir()?;
/// let store = Storehouse::<String>::builder(Clock::new_frozen(), root.path())
///     .name("avatars")
///     .memory(MemoryConfig::new().with_count_limit(100))
///     .disk(DiskConfig::new("avatars").with_max_size_bytes(1024 * 1024))
///     .policy(CachePolicy::Hybrid)
///     .build()?;
///
/// assert_eq!(store.max_disk_capacity(), 1024 * 1024);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct StorehouseBuilder<V> {
    name: &'static str,
    clock: Clock,
    root: PathBuf,
    codec: Arc<dyn Codec<V>>,
    weigher: Option<Weigher<V>>,
    settings: Settings,
}

impl<V> fmt::Debug for StorehouseBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorehouseBuilder")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<V> StorehouseBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(clock: Clock, root: PathBuf, codec: Arc<dyn Codec<V>>) -> Self {
        Self {
            name: DEFAULT_STORE_NAME,
            clock,
            root,
            codec,
            weigher: None,
            settings: Settings::default(),
        }
    }

    /// Sets the name reported in events.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Uses an [`InMemoryTier`] bounded by `config`.
    #[must_use]
    pub fn memory(mut self, config: MemoryConfig) -> Self {
        self.settings.memory = MemoryLayout::Bounded(config);
        self
    }

    /// Uses an [`AutoPurgingTier`] sized by `config` instead of the bounded memory tier.
    #[must_use]
    pub fn auto_purging(mut self, config: AutoPurgeConfig) -> Self {
        self.settings.memory = MemoryLayout::AutoPurging(config);
        self
    }

    /// Sets the disk tier configuration.
    #[must_use]
    pub fn disk(mut self, config: DiskConfig) -> Self {
        self.settings.disk = config;
        self
    }

    /// Sets which tiers the store starts with.
    #[must_use]
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.settings.policy = policy;
        self
    }

    /// Sets the codec used for disk files and auto-purge sizing.
    #[must_use]
    pub fn codec(mut self, codec: impl Codec<V> + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Sets the cost function of the bounded memory tier.
    ///
    /// By default a value costs the length of its encoded form.
    #[must_use]
    pub fn weigher(mut self, weigher: impl Fn(&V) -> u64 + Send + Sync + 'static) -> Self {
        self.weigher = Some(Arc::new(weigher));
        self
    }

    /// Opens the tiers and builds the store.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error for an invalid disk name or auto-purge sizing, or an `Io`
    /// error if the disk directory cannot be prepared.
    pub fn build(self) -> Result<Storehouse<V>> {
        let weigher = self.weigher.unwrap_or_else(|| {
            let codec = Arc::clone(&self.codec);
            Arc::new(move |value: &V| codec.encode(value).map_or(0, |bytes| bytes.len() as u64))
        });

        let parts = Parts {
            name: self.name,
            clock: self.clock,
            root: self.root,
            codec: self.codec,
            weigher,
        };
        Storehouse::from_parts(parts, self.settings)
    }
}
