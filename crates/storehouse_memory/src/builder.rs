// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory tiers.

use std::{fmt, sync::Arc};

use storehouse_tier::Expiry;
use tick::Clock;

use crate::{
    MemoryConfig,
    tier::{InMemoryTier, Weigher},
};

/// Builder for configuring an [`InMemoryTier`].
///
/// # Examples
///
/// ```
/// use storehouse_memory::InMemoryTier;
/// use storehouse_tier::Expiry;
/// use tick::Clock;
///
/// let tier = InMemoryTier::<Vec<u8>>::builder(Clock::new_frozen())
///     .count_limit(1_000)
///     .total_cost_limit(30 * 1024 * 1024)
///     .weigher(|bytes: &Vec<u8>| bytes.len() as u64)
///     .expiry(Expiry::Never)
///     .build();
/// ```
pub struct InMemoryTierBuilder<V> {
    pub(crate) config: MemoryConfig,
    pub(crate) clock: Clock,
    pub(crate) weigher: Option<Weigher<V>>,
}

impl<V> fmt::Debug for InMemoryTierBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTierBuilder")
            .field("config", &self.config)
            .field("weigher", &self.weigher.is_some())
            .finish_non_exhaustive()
    }
}

impl<V> InMemoryTierBuilder<V> {
    /// Creates a builder for an unbounded tier with no weigher.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            config: MemoryConfig::default(),
            clock,
            weigher: None,
        }
    }

    /// Replaces all limits with `config`.
    #[must_use]
    pub fn config(mut self, config: MemoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the maximum number of entries, `0` for unbounded.
    #[must_use]
    pub fn count_limit(mut self, count_limit: u64) -> Self {
        self.config = self.config.with_count_limit(count_limit);
        self
    }

    /// Sets the maximum summed cost, `0` for unbounded.
    ///
    /// Costs come from the [`weigher`](Self::weigher); without one the limit never triggers.
    #[must_use]
    pub fn total_cost_limit(mut self, total_cost_limit: u64) -> Self {
        self.config = self.config.with_total_cost_limit(total_cost_limit);
        self
    }

    /// Sets the expiry applied when a write does not specify one.
    #[must_use]
    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.config = self.config.with_expiry(expiry);
        self
    }

    /// Sets the function computing each value's cost.
    #[must_use]
    pub fn weigher(mut self, weigher: impl Fn(&V) -> u64 + Send + Sync + 'static) -> Self {
        self.weigher = Some(Arc::new(weigher));
        self
    }

    /// Sets a shared weigher, typically one reused across rebuilt tiers.
    #[must_use]
    pub fn shared_weigher(mut self, weigher: Option<Weigher<V>>) -> Self {
        self.weigher = weigher;
        self
    }

    /// Builds the configured tier.
    #[must_use]
    pub fn build(self) -> InMemoryTier<V> {
        InMemoryTier::from_builder(self)
    }
}
