// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Bounded in-memory tiers for the storehouse object cache.
//!
//! Two tiers implement [`StorehouseTier`](storehouse_tier::StorehouseTier):
//!
//! - [`InMemoryTier`] bounds its contents by entry count and by a caller-defined cost per value,
//!   evicting the least recently used entry whenever a write leaves it over either limit.
//! - [`AutoPurgingTier`] sizes entries by their encoded bytes and, once usage exceeds its capacity,
//!   purges least recently used entries down to a preferred usage.
//!
//! Both tiers expire entries lazily: an expired entry reads as a miss but stays resident until a purge
//! operation or eviction removes it.
//!
//! # Examples
//!
//! ```
//! use storehouse_memory::InMemoryTier;
//! use storehouse_tier::{Expiry, StorehouseTier};
//! use tick::Clock;
//!
//! let tier = InMemoryTier::<Vec<u8>>::builder(Clock::new_frozen())
//!     .total_cost_limit(1024)
//!     .weigher(|value: &Vec<u8>| value.len() as u64)
//!     .build();
//!
//! tier.set("greeting", b"hello".to_vec(), Some(Expiry::Never))?;
//! assert_eq!(tier.get("greeting")?.value(), b"hello");
//! assert_eq!(tier.usage(), Some(5));
//! # Ok::<(), storehouse_tier::Error>(())
//! ```

mod builder;
mod config;
mod purging;
mod tier;

#[doc(inline)]
pub use builder::InMemoryTierBuilder;
#[doc(inline)]
pub use config::{AutoPurgeConfig, DEFAULT_MEMORY_CAPACITY_BYTES, DEFAULT_PREFERRED_USAGE_AFTER_PURGE_BYTES, MemoryConfig};
#[doc(inline)]
pub use purging::AutoPurgingTier;
#[doc(inline)]
pub use tier::{InMemoryTier, Weigher};
