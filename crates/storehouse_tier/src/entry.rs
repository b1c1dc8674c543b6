// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    ops::Deref,
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::Expiry;

/// A stored value with its expiry and storage metadata.
///
/// Entries are produced by tiers on `get`. Each tier builds its own entries; promotion between tiers
/// copies the value into a fresh entry rather than sharing one.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use storehouse_tier::{Entry, Expiry};
///
/// let stored_at = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
/// let entry = Entry::new("data".to_string(), Expiry::Never, stored_at);
///
/// assert_eq!(entry.value(), "data");
/// assert_eq!(entry.stored_at(), stored_at);
/// assert!(entry.disk_path().is_none());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Entry<V> {
    value: V,
    expiry: Expiry,
    stored_at: SystemTime,
    disk_path: Option<PathBuf>,
}

impl<V> Entry<V> {
    /// Creates an entry that is not backed by a file.
    pub fn new(value: V, expiry: Expiry, stored_at: SystemTime) -> Self {
        Self {
            value,
            expiry,
            stored_at,
            disk_path: None,
        }
    }

    /// Attaches the location of the file holding this entry.
    #[must_use]
    pub fn with_disk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.disk_path = Some(path.into());
        self
    }

    /// Returns a reference to the stored value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the expiry the entry was stored with.
    #[must_use]
    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    /// Returns when the entry was written to its tier.
    #[must_use]
    pub fn stored_at(&self) -> SystemTime {
        self.stored_at
    }

    /// Returns the file holding this entry, for entries read from disk.
    #[must_use]
    pub fn disk_path(&self) -> Option<&Path> {
        self.disk_path.as_deref()
    }

    /// Returns `true` if the entry is stale at `now`.
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expiry.is_expired(now)
    }
}

impl<V> Deref for Entry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
