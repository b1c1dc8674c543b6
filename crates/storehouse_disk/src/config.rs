// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration for the disk tier.

use serde::{Deserialize, Serialize};
use storehouse_tier::Expiry;

/// Default directory name for a disk tier.
pub const DEFAULT_DISK_NAME: &str = "storehouse";

/// Default disk budget: 150 MiB.
pub const DEFAULT_DISK_CAPACITY_BYTES: u64 = 150 * 1024 * 1024;

/// At-rest protection requested for cache files.
///
/// Platforms with file-level encryption map the classes onto their own protection levels. On unix any
/// class other than [`ProtectionClass::None`] restricts the cache directory and its files to the owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionClass {
    /// No additional protection.
    #[default]
    None,
    /// Files are inaccessible while the device is locked.
    Complete,
    /// Files stay accessible while open, even after the device locks.
    CompleteUnlessOpen,
    /// Files are accessible once the user has authenticated after boot.
    CompleteUntilFirstUserAuthentication,
}

impl ProtectionClass {
    /// Returns `true` if files must be readable by their owner only.
    #[must_use]
    pub fn is_restricted(self) -> bool {
        self != Self::None
    }
}

/// Settings for a [`DiskTier`](crate::DiskTier).
///
/// `name` is the directory created under the tier's root. Two tiers with the same name under the same
/// root must not be open at the same time with different configurations.
///
/// # Examples
///
/// ```
/// use storehouse_disk::{DiskConfig, ProtectionClass};
///
/// let config = DiskConfig::new("thumbnails")
///     .with_max_size_bytes(64 * 1024 * 1024)
///     .with_protection_class(ProtectionClass::Complete);
///
/// assert_eq!(config.name(), "thumbnails");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    name: String,
    expiry: Expiry,
    max_size_bytes: u64,
    protection_class: ProtectionClass,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DISK_NAME)
    }
}

impl DiskConfig {
    /// Creates a configuration for the directory `name` with the default budget.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expiry: Expiry::Never,
            max_size_bytes: DEFAULT_DISK_CAPACITY_BYTES,
            protection_class: ProtectionClass::None,
        }
    }

    /// Sets the expiry applied when a write does not specify one.
    #[must_use]
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Sets the budget for all entry files, `0` for unbounded.
    #[must_use]
    pub fn with_max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Sets the at-rest protection class.
    #[must_use]
    pub fn with_protection_class(mut self, protection_class: ProtectionClass) -> Self {
        self.protection_class = protection_class;
        self
    }

    /// Returns the directory name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the default expiry.
    #[must_use]
    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    /// Returns the budget in bytes, `0` when unbounded.
    #[must_use]
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Returns the at-rest protection class.
    #[must_use]
    pub fn protection_class(&self) -> ProtectionClass {
        self.protection_class
    }
}
