// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration for the in-memory tiers.

use serde::{Deserialize, Serialize};
use storehouse_tier::{Error, ErrorKind, Expiry, Result};

/// Default auto-purge capacity: 100 MiB.
pub const DEFAULT_MEMORY_CAPACITY_BYTES: u64 = 100 * 1024 * 1024;

/// Default usage an auto-purge brings the tier down to: 60 MiB.
pub const DEFAULT_PREFERRED_USAGE_AFTER_PURGE_BYTES: u64 = 60 * 1024 * 1024;

/// Limits for an [`InMemoryTier`](crate::InMemoryTier).
///
/// A limit of `0` means unbounded.
///
/// # Examples
///
/// ```
/// use storehouse_memory::MemoryConfig;
/// use storehouse_tier::Expiry;
///
/// let config = MemoryConfig::new()
///     .with_count_limit(500)
///     .with_total_cost_limit(30 * 1024 * 1024)
///     .with_expiry(Expiry::SecondsFrom1970(2_000_000_000.0));
///
/// assert_eq!(config.count_limit(), 500);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    expiry: Expiry,
    count_limit: u64,
    total_cost_limit: u64,
}

impl MemoryConfig {
    /// Creates an unbounded configuration whose entries never expire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expiry applied when a write does not specify one.
    #[must_use]
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Sets the maximum number of entries.
    #[must_use]
    pub fn with_count_limit(mut self, count_limit: u64) -> Self {
        self.count_limit = count_limit;
        self
    }

    /// Sets the maximum summed cost of all entries.
    #[must_use]
    pub fn with_total_cost_limit(mut self, total_cost_limit: u64) -> Self {
        self.total_cost_limit = total_cost_limit;
        self
    }

    /// Returns the default expiry.
    #[must_use]
    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    /// Returns the entry count limit, `0` when unbounded.
    #[must_use]
    pub fn count_limit(&self) -> u64 {
        self.count_limit
    }

    /// Returns the total cost limit, `0` when unbounded.
    #[must_use]
    pub fn total_cost_limit(&self) -> u64 {
        self.total_cost_limit
    }
}

/// Sizing for an [`AutoPurgingTier`](crate::AutoPurgingTier).
///
/// When usage exceeds `memory_capacity_bytes`, the tier purges least recently accessed entries until
/// usage is at most `preferred_usage_after_purge_bytes`. The preferred usage may not exceed the capacity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoPurgeConfig {
    expiry: Expiry,
    memory_capacity_bytes: u64,
    preferred_usage_after_purge_bytes: u64,
}

impl Default for AutoPurgeConfig {
    fn default() -> Self {
        Self {
            expiry: Expiry::Never,
            memory_capacity_bytes: DEFAULT_MEMORY_CAPACITY_BYTES,
            preferred_usage_after_purge_bytes: DEFAULT_PREFERRED_USAGE_AFTER_PURGE_BYTES,
        }
    }
}

impl AutoPurgeConfig {
    /// Creates a configuration with the given capacity and post-purge target.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidConfiguration`] error if the preferred usage exceeds the capacity.
    pub fn new(memory_capacity_bytes: u64, preferred_usage_after_purge_bytes: u64) -> Result<Self> {
        let config = Self {
            expiry: Expiry::Never,
            memory_capacity_bytes,
            preferred_usage_after_purge_bytes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the expiry applied when a write does not specify one.
    #[must_use]
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Checks that the preferred usage does not exceed the capacity.
    ///
    /// Deserialized configurations bypass [`AutoPurgeConfig::new`], so tiers validate again on
    /// construction.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidConfiguration`] error if the invariant does not hold.
    pub fn validate(&self) -> Result<()> {
        if self.preferred_usage_after_purge_bytes > self.memory_capacity_bytes {
            return Err(Error::from_cause(
                ErrorKind::InvalidConfiguration,
                format!(
                    "preferred usage after purge ({} bytes) exceeds memory capacity ({} bytes)",
                    self.preferred_usage_after_purge_bytes, self.memory_capacity_bytes
                ),
            ));
        }
        Ok(())
    }

    /// Returns the default expiry.
    #[must_use]
    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    /// Returns the capacity that triggers a purge.
    #[must_use]
    pub fn memory_capacity_bytes(&self) -> u64 {
        self.memory_capacity_bytes
    }

    /// Returns the usage a purge brings the tier down to.
    #[must_use]
    pub fn preferred_usage_after_purge_bytes(&self) -> u64 {
        self.preferred_usage_after_purge_bytes
    }
}
