// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core abstractions for the storehouse object cache.
//!
//! This crate defines the [`StorehouseTier`] trait implemented by every storage tier, the [`Entry`]
//! returned by reads, the [`Expiry`] policy attached to writes, the [`Codec`] used by tiers that
//! need bytes, and the shared [`Error`] type.
//!
//! # Overview
//!
//! Storage backends live in `storehouse_memory` and `storehouse_disk`; the `storehouse` crate composes
//! them into a hybrid store with a concurrency-safe accessor in front of it.
//!
//! # Implementing a Tier
//!
//! ```
//! use std::{collections::HashMap, sync::RwLock, time::SystemTime};
//!
//! use storehouse_tier::{Entry, Error, Expiry, Result, StorehouseTier};
//!
//! struct SimpleTier(RwLock<HashMap<String, Entry<String>>>);
//!
//! impl StorehouseTier<String> for SimpleTier {
//!     fn get(&self, key: &str) -> Result<Entry<String>> {
//!         self.0.read().unwrap().get(key).cloned().ok_or_else(Error::not_found)
//!     }
//!
//!     fn set(&self, key: &str, value: String, expiry: Option<Expiry>) -> Result<()> {
//!         let entry = Entry::new(value, expiry.unwrap_or_default(), SystemTime::now());
//!         self.0.write().unwrap().insert(key.to_string(), entry);
//!         Ok(())
//!     }
//!
//!     fn remove(&self, key: &str) -> Result<()> {
//!         self.0.write().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     fn remove_all(&self) -> Result<()> {
//!         self.0.write().unwrap().clear();
//!         Ok(())
//!     }
//!
//!     fn remove_expired(&self) -> Result<()> {
//!         let now = SystemTime::now();
//!         self.0.write().unwrap().retain(|_, e| !e.is_expired(now));
//!         Ok(())
//!     }
//!
//!     fn remove_stored_since(&self, date: SystemTime) -> Result<()> {
//!         self.0.write().unwrap().retain(|_, e| e.stored_at() < date);
//!         Ok(())
//!     }
//!
//!     fn remove_if_expired(&self, key: &str) -> Result<()> {
//!         let mut map = self.0.write().unwrap();
//!         if map.get(key).is_some_and(|e| e.is_expired(SystemTime::now())) {
//!             map.remove(key);
//!         }
//!         Ok(())
//!     }
//! }
//! ```

mod codec;
mod entry;
pub mod error;
mod expiry;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub(crate) mod tier;

#[doc(inline)]
pub use codec::{BytesCodec, Codec, JsonCodec};
#[doc(inline)]
pub use entry::Entry;
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use expiry::{Expiry, NEVER_EXPIRES_OFFSET};
#[doc(inline)]
pub use tier::StorehouseTier;
