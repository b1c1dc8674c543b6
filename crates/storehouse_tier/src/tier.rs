// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The contract shared by every storage tier.
//!
//! [`StorehouseTier`] is implemented by the memory and disk tiers and by the hybrid store that composes
//! them. The trait is object safe so stores can hold heterogeneous tiers as `Box<dyn StorehouseTier<V>>`.

use std::time::SystemTime;

use crate::{Entry, Expiry, Result};

/// Trait for storehouse tier implementations.
///
/// Keys are opaque strings chosen by the caller. Expiry is evaluated lazily: `get` reports an expired
/// entry as [`ErrorKind::NotFound`](crate::ErrorKind::NotFound) without deleting it, and only the
/// `remove_*` operations reclaim expired entries.
///
/// The sizing methods `len`, `capacity` and `usage` default to `None` for tiers that do not track them.
pub trait StorehouseTier<V>: Send + Sync {
    /// Returns the live entry stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the key is absent or its entry has expired.
    fn get(&self, key: &str) -> Result<Entry<V>>;

    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// When `expiry` is `None` the tier's configured default expiry applies.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be stored.
    fn set(&self, key: &str, value: V, expiry: Option<Expiry>) -> Result<()>;

    /// Removes the entry stored under `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the tier fails to delete the entry.
    fn remove(&self, key: &str) -> Result<()>;

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the tier fails to delete its entries.
    fn remove_all(&self) -> Result<()>;

    /// Removes every entry that is expired now.
    ///
    /// # Errors
    ///
    /// Returns an error if the tier fails to delete an entry.
    fn remove_expired(&self) -> Result<()>;

    /// Removes every entry stored at or after `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tier fails to delete an entry.
    fn remove_stored_since(&self, date: SystemTime) -> Result<()>;

    /// Removes the entry stored under `key` if it is expired now.
    ///
    /// # Errors
    ///
    /// Returns an error if the tier fails to inspect or delete the entry.
    fn remove_if_expired(&self, key: &str) -> Result<()>;

    /// Returns `true` if a live entry exists for `key`.
    ///
    /// # Errors
    ///
    /// Propagates failures other than `NotFound`.
    fn exists(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns `true` if the entry for `key` is expired or absent.
    ///
    /// # Errors
    ///
    /// Propagates failures other than `NotFound`.
    fn is_expired(&self, key: &str) -> Result<bool> {
        self.exists(key).map(|exists| !exists)
    }

    /// Returns the number of stored entries, if tracked.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the tier holds no entries, if tracked.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }

    /// Returns the configured capacity in the tier's unit of account, if bounded.
    fn capacity(&self) -> Option<u64> {
        None
    }

    /// Returns the current usage in the tier's unit of account, if tracked.
    fn usage(&self) -> Option<u64> {
        None
    }
}

impl<V, T> StorehouseTier<V> for Box<T>
where
    T: StorehouseTier<V> + ?Sized,
{
    fn get(&self, key: &str) -> Result<Entry<V>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: V, expiry: Option<Expiry>) -> Result<()> {
        (**self).set(key, value, expiry)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn remove_all(&self) -> Result<()> {
        (**self).remove_all()
    }

    fn remove_expired(&self) -> Result<()> {
        (**self).remove_expired()
    }

    fn remove_stored_since(&self, date: SystemTime) -> Result<()> {
        (**self).remove_stored_since(date)
    }

    fn remove_if_expired(&self, key: &str) -> Result<()> {
        (**self).remove_if_expired(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }

    fn is_expired(&self, key: &str) -> Result<bool> {
        (**self).is_expired(key)
    }

    fn len(&self) -> Option<u64> {
        (**self).len()
    }

    fn capacity(&self) -> Option<u64> {
        (**self).capacity()
    }

    fn usage(&self) -> Option<u64> {
        (**self).usage()
    }
}
