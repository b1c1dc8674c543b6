// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Count and cost bounded in-memory tier.
//!
//! Entries live in an LRU list guarded by a mutex. Reads refresh recency, and every write that leaves
//! the tier over a limit evicts from the least recently used end until both limits hold again.

use std::{fmt, sync::Arc, time::SystemTime};

use lru::LruCache;
use parking_lot::Mutex;
use storehouse_tier::{Entry, Error, Expiry, Result, StorehouseTier};
use tick::Clock;

use crate::{MemoryConfig, builder::InMemoryTierBuilder};

/// Computes the cost of a value for the total cost limit.
pub type Weigher<V> = Arc<dyn Fn(&V) -> u64 + Send + Sync>;

struct Slot<V> {
    value: V,
    expiry: Expiry,
    stored_at: SystemTime,
    cost: u64,
}

struct State<V> {
    entries: LruCache<String, Slot<V>>,
    total_cost: u64,
}

impl<V> State<V> {
    fn remove(&mut self, key: &str) {
        if let Some(slot) = self.entries.pop(key) {
            self.total_cost -= slot.cost;
        }
    }

    fn retain(&mut self, keep: impl Fn(&Slot<V>) -> bool) {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| !keep(slot))
            .map(|(key, _)| key.clone())
            .collect();
        for key in doomed {
            self.remove(&key);
        }
    }

    fn over_limits(&self, config: &MemoryConfig) -> bool {
        let count = self.entries.len() as u64;
        (config.count_limit() > 0 && count > config.count_limit())
            || (config.total_cost_limit() > 0 && self.total_cost > config.total_cost_limit())
    }
}

/// A bounded, volatile tier keyed by string.
///
/// The tier enforces two independent limits from [`MemoryConfig`]: the number of entries and the summed
/// cost of all entries as computed by the [`Weigher`]. Without a weigher every entry costs `0`, so only
/// the count limit applies. Eviction order is least recently used first, where both `get` and `set`
/// count as a use.
///
/// # Examples
///
/// ```
/// use storehouse_memory::{InMemoryTier, MemoryConfig};
/// use storehouse_tier::StorehouseTier;
/// use tick::Clock;
///
/// let tier = InMemoryTier::<String>::builder(Clock::new_frozen())
///     .config(MemoryConfig::new().with_count_limit(2))
///     .build();
///
/// tier.set("a", "1".to_string(), None)?;
/// tier.set("b", "2".to_string(), None)?;
/// tier.set("c", "3".to_string(), None)?;
///
/// assert!(tier.get("a").unwrap_err().is_not_found());
/// assert_eq!(tier.len(), Some(2));
/// # Ok::<(), storehouse_tier::Error>(())
/// ```
pub struct InMemoryTier<V> {
    config: MemoryConfig,
    clock: Clock,
    weigher: Option<Weigher<V>>,
    state: Mutex<State<V>>,
}

impl<V> fmt::Debug for InMemoryTier<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryTier")
            .field("config", &self.config)
            .field("len", &state.entries.len())
            .field("total_cost", &state.total_cost)
            .finish_non_exhaustive()
    }
}

impl<V> InMemoryTier<V> {
    /// Creates a tier with the given limits and no weigher.
    #[must_use]
    pub fn new(config: MemoryConfig, clock: Clock) -> Self {
        Self::builder(clock).config(config).build()
    }

    /// Creates a builder for configuring a tier.
    #[must_use]
    pub fn builder(clock: Clock) -> InMemoryTierBuilder<V> {
        InMemoryTierBuilder::new(clock)
    }

    pub(crate) fn from_builder(builder: InMemoryTierBuilder<V>) -> Self {
        Self {
            config: builder.config,
            clock: builder.clock,
            weigher: builder.weigher,
            state: Mutex::new(State {
                entries: LruCache::unbounded(),
                total_cost: 0,
            }),
        }
    }

    /// Returns the limits this tier enforces.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Returns `true` if an entry is held for `key`, expired or not, without refreshing its recency.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.lock().entries.contains(key)
    }

    fn evict_over_limits(&self, state: &mut State<V>) {
        while state.over_limits(&self.config) {
            let Some((key, slot)) = state.entries.pop_lru() else {
                break;
            };
            state.total_cost -= slot.cost;
            tracing::debug!(key = %key, cost = slot.cost, "memory tier evicted entry");
        }
    }
}

impl<V> StorehouseTier<V> for InMemoryTier<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Entry<V>> {
        let now = self.clock.system_time();
        let mut state = self.state.lock();
        let slot = state.entries.get(key).ok_or_else(Error::not_found)?;
        if slot.expiry.is_expired(now) {
            return Err(Error::not_found());
        }
        Ok(Entry::new(slot.value.clone(), slot.expiry, slot.stored_at))
    }

    fn set(&self, key: &str, value: V, expiry: Option<Expiry>) -> Result<()> {
        let cost = self.weigher.as_ref().map_or(0, |weigh| weigh(&value));
        let slot = Slot {
            value,
            expiry: expiry.unwrap_or(self.config.expiry()).to_absolute(),
            stored_at: self.clock.system_time(),
            cost,
        };

        let mut state = self.state.lock();
        if let Some(previous) = state.entries.put(key.to_string(), slot) {
            state.total_cost -= previous.cost;
        }
        state.total_cost += cost;
        self.evict_over_limits(&mut state);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.state.lock().remove(key);
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.entries.clear();
        state.total_cost = 0;
        Ok(())
    }

    fn remove_expired(&self) -> Result<()> {
        let now = self.clock.system_time();
        self.state.lock().retain(|slot| !slot.expiry.is_expired(now));
        Ok(())
    }

    fn remove_stored_since(&self, date: SystemTime) -> Result<()> {
        self.state.lock().retain(|slot| slot.stored_at < date);
        Ok(())
    }

    fn remove_if_expired(&self, key: &str) -> Result<()> {
        let now = self.clock.system_time();
        let mut state = self.state.lock();
        if state.entries.peek(key).is_some_and(|slot| slot.expiry.is_expired(now)) {
            state.remove(key);
        }
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.state.lock().entries.len() as u64)
    }

    fn capacity(&self) -> Option<u64> {
        (self.config.total_cost_limit() > 0).then_some(self.config.total_cost_limit())
    }

    fn usage(&self) -> Option<u64> {
        Some(self.state.lock().total_cost)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tick::ClockControl;

    use super::*;

    fn tier_with(config: MemoryConfig) -> InMemoryTier<String> {
        InMemoryTier::builder(Clock::new_frozen())
            .config(config)
            .weigher(|value: &String| value.len() as u64)
            .build()
    }

    #[test]
    fn overwrite_replaces_cost() {
        let tier = tier_with(MemoryConfig::new());
        tier.set("a", "12345".to_string(), None).unwrap();
        tier.set("a", "12".to_string(), None).unwrap();
        assert_eq!(tier.usage(), Some(2));
        assert_eq!(tier.len(), Some(1));
    }

    #[test]
    fn cost_limit_evicts_least_recently_used() {
        let tier = tier_with(MemoryConfig::new().with_total_cost_limit(10));
        tier.set("a", "aaaa".to_string(), None).unwrap();
        tier.set("b", "bbbb".to_string(), None).unwrap();
        tier.get("a").unwrap();
        tier.set("c", "cccc".to_string(), None).unwrap();

        assert!(tier.contains_key("a"));
        assert!(!tier.contains_key("b"));
        assert!(tier.contains_key("c"));
        assert_eq!(tier.usage(), Some(8));
    }

    #[test]
    fn entry_larger_than_cost_limit_is_not_retained() {
        let tier = tier_with(MemoryConfig::new().with_total_cost_limit(3));
        tier.set("small", "ab".to_string(), None).unwrap();
        tier.set("huge", "abcdef".to_string(), None).unwrap();

        assert_eq!(tier.usage(), Some(0));
        assert_eq!(tier.len(), Some(0));
    }

    #[test]
    fn capacity_reports_cost_limit() {
        assert_eq!(tier_with(MemoryConfig::new()).capacity(), None);
        assert_eq!(tier_with(MemoryConfig::new().with_total_cost_limit(64)).capacity(), Some(64));
    }

    #[test]
    fn default_expiry_applies_when_unspecified() {
        let control = ClockControl::new_at(SystemTime::UNIX_EPOCH + Duration::from_secs(100));
        let tier = InMemoryTier::<String>::new(
            MemoryConfig::new().with_expiry(Expiry::SecondsFrom1970(150.0)),
            control.to_clock(),
        );
        tier.set("default", "v".to_string(), None).unwrap();
        tier.set("explicit", "v".to_string(), Some(Expiry::Never)).unwrap();

        control.advance(Duration::from_secs(100));
        assert!(tier.get("default").unwrap_err().is_not_found());
        assert!(tier.get("explicit").is_ok());
    }

    #[test]
    fn expired_entries_stay_until_purged() {
        let control = ClockControl::new_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let tier = InMemoryTier::<String>::new(MemoryConfig::new(), control.to_clock());
        tier.set("a", "v".to_string(), Some(Expiry::SecondsFrom1970(5.0))).unwrap();

        assert!(tier.get("a").unwrap_err().is_not_found());
        assert!(tier.contains_key("a"));

        tier.remove_if_expired("a").unwrap();
        assert!(!tier.contains_key("a"));
    }
}
