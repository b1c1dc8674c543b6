// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Byte-bounded in-memory tier with purge-to-preferred eviction.

use std::{fmt, sync::Arc, time::SystemTime};

use lru::LruCache;
use parking_lot::Mutex;
use storehouse_tier::{Codec, Entry, Error, Expiry, Result, StorehouseTier};
use tick::Clock;

use crate::AutoPurgeConfig;

struct Capsule<V> {
    value: V,
    expiry: Expiry,
    stored_at: SystemTime,
    bytes: u64,
}

struct State<V> {
    capsules: LruCache<String, Capsule<V>>,
    usage: u64,
}

impl<V> State<V> {
    fn remove(&mut self, key: &str) {
        if let Some(capsule) = self.capsules.pop(key) {
            self.usage -= capsule.bytes;
        }
    }

    fn retain(&mut self, keep: impl Fn(&Capsule<V>) -> bool) {
        let doomed: Vec<String> = self
            .capsules
            .iter()
            .filter(|(_, capsule)| !keep(capsule))
            .map(|(key, _)| key.clone())
            .collect();
        for key in doomed {
            self.remove(&key);
        }
    }
}

/// An in-memory tier that accounts for entries by their encoded size.
///
/// Each entry is sized by encoding it with the tier's [`Codec`]. Once usage exceeds
/// [`AutoPurgeConfig::memory_capacity_bytes`], least recently accessed entries are purged until usage
/// is at most [`AutoPurgeConfig::preferred_usage_after_purge_bytes`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use storehouse_memory::{AutoPurgeConfig, AutoPurgingTier};
/// use storehouse_tier::{BytesCodec, StorehouseTier};
/// use tick::Clock;
///
/// let config = AutoPurgeConfig::new(10, 4)?;
/// let tier = AutoPurgingTier::new(config, Arc::new(BytesCodec), Clock::new_frozen())?;
///
/// tier.set("a", vec![0; 4], None)?;
/// tier.set("b", vec![0; 4], None)?;
/// tier.set("c", vec![0; 4], None)?;
///
/// assert_eq!(tier.usage(), Some(4));
/// assert!(tier.get("c").is_ok());
/// # Ok::<(), storehouse_tier::Error>(())
/// ```
pub struct AutoPurgingTier<V> {
    config: AutoPurgeConfig,
    codec: Arc<dyn Codec<V>>,
    clock: Clock,
    state: Mutex<State<V>>,
}

impl<V> fmt::Debug for AutoPurgingTier<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AutoPurgingTier")
            .field("config", &self.config)
            .field("len", &state.capsules.len())
            .field("usage", &state.usage)
            .finish_non_exhaustive()
    }
}

impl<V> AutoPurgingTier<V> {
    /// Creates an empty tier.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if the configuration's preferred usage exceeds its
    /// capacity.
    pub fn new(config: AutoPurgeConfig, codec: Arc<dyn Codec<V>>, clock: Clock) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            codec,
            clock,
            state: Mutex::new(State {
                capsules: LruCache::unbounded(),
                usage: 0,
            }),
        })
    }

    /// Returns the sizing this tier enforces.
    #[must_use]
    pub fn config(&self) -> &AutoPurgeConfig {
        &self.config
    }

    /// Returns `true` if an entry is held for `key`, expired or not, without refreshing its recency.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.lock().capsules.contains(key)
    }

    fn purge_if_needed(&self, state: &mut State<V>) {
        if state.usage <= self.config.memory_capacity_bytes() {
            return;
        }

        let before = state.usage;
        let mut purged = 0_usize;
        while state.usage > self.config.preferred_usage_after_purge_bytes() {
            let Some((_, capsule)) = state.capsules.pop_lru() else {
                break;
            };
            state.usage -= capsule.bytes;
            purged += 1;
        }
        tracing::debug!(purged, before, after = state.usage, "memory tier purged entries");
    }
}

impl<V> StorehouseTier<V> for AutoPurgingTier<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Entry<V>> {
        let now = self.clock.system_time();
        let mut state = self.state.lock();
        let capsule = state.capsules.get(key).ok_or_else(Error::not_found)?;
        if capsule.expiry.is_expired(now) {
            return Err(Error::not_found());
        }
        Ok(Entry::new(capsule.value.clone(), capsule.expiry, capsule.stored_at))
    }

    fn set(&self, key: &str, value: V, expiry: Option<Expiry>) -> Result<()> {
        let bytes = self.codec.encode(&value)?.len() as u64;
        let capsule = Capsule {
            value,
            expiry: expiry.unwrap_or(self.config.expiry()).to_absolute(),
            stored_at: self.clock.system_time(),
            bytes,
        };

        let mut state = self.state.lock();
        if let Some(previous) = state.capsules.put(key.to_string(), capsule) {
            state.usage -= previous.bytes;
        }
        state.usage += bytes;
        self.purge_if_needed(&mut state);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.state.lock().remove(key);
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.capsules.clear();
        state.usage = 0;
        Ok(())
    }

    fn remove_expired(&self) -> Result<()> {
        let now = self.clock.system_time();
        self.state.lock().retain(|capsule| !capsule.expiry.is_expired(now));
        Ok(())
    }

    fn remove_stored_since(&self, date: SystemTime) -> Result<()> {
        self.state.lock().retain(|capsule| capsule.stored_at < date);
        Ok(())
    }

    fn remove_if_expired(&self, key: &str) -> Result<()> {
        let now = self.clock.system_time();
        let mut state = self.state.lock();
        if state.capsules.peek(key).is_some_and(|capsule| capsule.expiry.is_expired(now)) {
            state.remove(key);
        }
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.state.lock().capsules.len() as u64)
    }

    fn capacity(&self) -> Option<u64> {
        Some(self.config.memory_capacity_bytes())
    }

    fn usage(&self) -> Option<u64> {
        Some(self.state.lock().usage)
    }
}
