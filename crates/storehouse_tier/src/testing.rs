// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock tier implementation for testing.
//!
//! This module provides `MockTier`, a configurable in-memory tier that records all operations and
//! supports failure injection for testing error paths.

use std::{collections::HashMap, sync::Arc, time::SystemTime};

use parking_lot::Mutex;
use tick::Clock;

use crate::{Entry, Error, ErrorKind, Expiry, Result, StorehouseTier};

/// Recorded tier operation with full context.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOp<V> {
    /// A get operation was performed with the given key.
    Get(String),
    /// A set operation was performed.
    Set {
        /// The key that was written.
        key: String,
        /// The value that was written.
        value: V,
        /// The expiry passed by the caller.
        expiry: Option<Expiry>,
    },
    /// A remove operation was performed with the given key.
    Remove(String),
    /// A remove-all operation was performed.
    RemoveAll,
    /// A remove-expired operation was performed.
    RemoveExpired,
    /// A remove-stored-since operation was performed with the given date.
    RemoveStoredSince(SystemTime),
    /// A remove-if-expired operation was performed with the given key.
    RemoveIfExpired(String),
}

type FailPredicate<V> = Box<dyn Fn(&TierOp<V>) -> bool + Send + Sync>;

/// A configurable mock tier for testing.
///
/// The tier stores entries in memory, honours expiry against its clock and can be configured to fail
/// operations on demand. Clones share state, so a test can keep a handle to a tier after moving it into
/// a store.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # fn main() {
/// use storehouse_tier::{StorehouseTier, testing::{MockTier, TierOp}};
///
/// let tier = MockTier::<i32>::new();
/// tier.set("key", 42, None).unwrap();
/// assert_eq!(*tier.get("key").unwrap().value(), 42);
///
/// assert_eq!(tier.operations(), vec![
///     TierOp::Set { key: "key".to_string(), value: 42, expiry: None },
///     TierOp::Get("key".to_string()),
/// ]);
/// # }
/// # #[cfg(not(feature = "test-util"))]
/// # fn main() {}
/// ```
///
/// # Failure Injection
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # fn main() {
/// use storehouse_tier::{StorehouseTier, testing::{MockTier, TierOp}};
///
/// let tier = MockTier::<i32>::new();
/// tier.fail_when(|op| matches!(op, TierOp::Get(k) if k == "forbidden"));
///
/// assert!(tier.get("forbidden").is_err());
/// assert!(tier.get("allowed").unwrap_err().is_not_found());
/// # }
/// # #[cfg(not(feature = "test-util"))]
/// # fn main() {}
/// ```
pub struct MockTier<V> {
    data: Arc<Mutex<HashMap<String, Entry<V>>>>,
    operations: Arc<Mutex<Vec<TierOp<V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<V>>>>,
    clock: Clock,
}

impl<V> std::fmt::Debug for MockTier<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTier")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl<V> Clone for MockTier<V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            clock: self.clock.clone(),
        }
    }
}

impl<V> Default for MockTier<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MockTier<V> {
    /// Creates an empty mock tier with a frozen clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::new_frozen())
    }

    /// Creates an empty mock tier that reads time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            clock,
        }
    }

    /// Returns the number of stored entries, expired ones included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if an entry is physically stored for `key`, regardless of expiry.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// Failing operations are still recorded but leave the stored data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&TierOp<V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn check(&self, op: TierOp<V>) -> Result<()> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);
        if fail {
            return Err(Error::caused_by(ErrorKind::Other, "mock: operation failed"));
        }
        Ok(())
    }

    fn retain(&self, keep: impl Fn(&Entry<V>) -> bool) {
        self.data.lock().retain(|_, entry| keep(entry));
    }
}

impl<V: Clone> MockTier<V> {
    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<TierOp<V>> {
        self.operations.lock().clone()
    }
}

impl<V> StorehouseTier<V> for MockTier<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Entry<V>> {
        self.check(TierOp::Get(key.to_string()))?;
        let now = self.clock.system_time();
        self.data
            .lock()
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .cloned()
            .ok_or_else(Error::not_found)
    }

    fn set(&self, key: &str, value: V, expiry: Option<Expiry>) -> Result<()> {
        self.check(TierOp::Set {
            key: key.to_string(),
            value: value.clone(),
            expiry,
        })?;
        let expiry = expiry.unwrap_or_default().to_absolute();
        let entry = Entry::new(value, expiry, self.clock.system_time());
        self.data.lock().insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check(TierOp::Remove(key.to_string()))?;
        self.data.lock().remove(key);
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        self.check(TierOp::RemoveAll)?;
        self.data.lock().clear();
        Ok(())
    }

    fn remove_expired(&self) -> Result<()> {
        self.check(TierOp::RemoveExpired)?;
        let now = self.clock.system_time();
        self.retain(|entry| !entry.is_expired(now));
        Ok(())
    }

    fn remove_stored_since(&self, date: SystemTime) -> Result<()> {
        self.check(TierOp::RemoveStoredSince(date))?;
        self.retain(|entry| entry.stored_at() < date);
        Ok(())
    }

    fn remove_if_expired(&self, key: &str) -> Result<()> {
        self.check(TierOp::RemoveIfExpired(key.to_string()))?;
        let now = self.clock.system_time();
        let mut data = self.data.lock();
        if data.get(key).is_some_and(|entry| entry.is_expired(now)) {
            data.remove(key);
        }
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tick::ClockControl;

    use super::*;

    #[test]
    fn records_operations_in_order() {
        let tier = MockTier::<i32>::new();
        tier.set("a", 1, None).unwrap();
        tier.get("a").unwrap();
        tier.remove("a").unwrap();
        tier.remove_all().unwrap();

        assert_eq!(
            tier.operations(),
            vec![
                TierOp::Set {
                    key: "a".to_string(),
                    value: 1,
                    expiry: None,
                },
                TierOp::Get("a".to_string()),
                TierOp::Remove("a".to_string()),
                TierOp::RemoveAll,
            ]
        );
    }

    #[test]
    fn failed_operations_leave_data_untouched() {
        let tier = MockTier::<i32>::new();
        tier.set("a", 1, None).unwrap();
        tier.fail_when(|op| matches!(op, TierOp::Remove(_) | TierOp::Set { .. }));

        assert_eq!(tier.remove("a").unwrap_err().kind(), ErrorKind::Other);
        assert!(tier.set("b", 2, None).is_err());
        assert!(tier.contains_key("a"));
        assert!(!tier.contains_key("b"));

        tier.clear_failures();
        tier.remove("a").unwrap();
        assert_eq!(tier.entry_count(), 0);
    }

    #[test]
    fn expiry_follows_the_clock() {
        let control = ClockControl::new_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let tier = MockTier::<i32>::with_clock(control.to_clock());
        tier.set("a", 1, Some(Expiry::SecondsFrom1970(1_010.0))).unwrap();
        assert!(tier.get("a").is_ok());

        control.advance(Duration::from_secs(20));
        assert!(tier.get("a").unwrap_err().is_not_found());
        assert!(tier.contains_key("a"));

        tier.remove_if_expired("a").unwrap();
        assert!(!tier.contains_key("a"));
    }

    #[test]
    fn remove_stored_since_keeps_older_entries() {
        let control = ClockControl::new_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let tier = MockTier::<i32>::with_clock(control.to_clock());
        tier.set("old", 1, None).unwrap();
        control.advance(Duration::from_secs(10));
        let cutoff = control.to_clock().system_time();
        tier.set("new", 2, None).unwrap();

        tier.remove_stored_since(cutoff).unwrap();
        assert!(tier.contains_key("old"));
        assert!(!tier.contains_key("new"));
    }

    #[test]
    fn clones_share_state() {
        let tier = MockTier::<i32>::new();
        let handle = tier.clone();
        tier.set("a", 1, None).unwrap();
        assert!(handle.contains_key("a"));
        assert_eq!(handle.len(), Some(1));
        handle.clear_operations();
        assert!(tier.operations().is_empty());
    }
}
