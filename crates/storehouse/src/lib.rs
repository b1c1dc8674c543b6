// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A two-tier object cache that keeps a bounded memory tier in front of a persistent disk tier.
//!
//! Values are addressed by string keys and carry an [`Expiry`]. Reads consult memory first and fall back
//! to disk; a disk hit is copied into memory with the expiry it was stored with. Writes and removals go
//! to every enabled tier.
//!
//! The main entry point is [`Storehouse`], built with [`Storehouse::builder`]. It can switch its
//! [`CachePolicy`] and change its memory and disk limits while in use. Lower layers are public too:
//! [`HybridStore`] composes any two [`StorehouseTier`] implementations and [`Accessor`] makes a store
//! replaceable under concurrent use.
//!
//! # Examples
//!
//! ```
//! use storehouse::{DiskConfig, Expiry, Storehouse, StorehouseTier};
//! use tick::Clock;
//!
//! let root = tempfile::tempdir()?;
//! let store = Storehouse::<Vec<u32>>::builder(Clock::new_frozen(), root.path())
//!     .disk(DiskConfig::new("numbers"))
//!     .build()?;
//!
//! store.set("primes", vec![2, 3, 5, 7], Some(Expiry::Never))?;
//! assert_eq!(store.get("primes")?.value(), &vec![2, 3, 5, 7]);
//!
//! store.remove_by_key("primes")?;
//! assert!(!store.exists("primes")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! - `test-util`: re-exports [`MockTier`](storehouse_tier::testing::MockTier) and
//!   [`TierOp`](storehouse_tier::testing::TierOp) for tests of code built on these traits.

mod accessor;
mod builder;
mod hybrid;
mod policy;
mod storehouse;
mod telemetry;

#[doc(inline)]
pub use accessor::Accessor;
#[doc(inline)]
pub use builder::{DEFAULT_MEMORY_TOTAL_COST_BYTES, StorehouseBuilder};
#[doc(inline)]
pub use hybrid::{DEFAULT_STORE_NAME, HybridStore};
#[doc(inline)]
pub use policy::CachePolicy;
#[doc(inline)]
pub use storehouse::Storehouse;
pub use storehouse_disk::{DiskConfig, DiskTier, ProtectionClass};
pub use storehouse_memory::{AutoPurgeConfig, AutoPurgingTier, InMemoryTier, MemoryConfig, Weigher};
pub use storehouse_tier::{BytesCodec, Codec, Entry, Error, ErrorKind, Expiry, JsonCodec, NEVER_EXPIRES_OFFSET, Result, StorehouseTier};
#[cfg(any(feature = "test-util", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub use storehouse_tier::testing::{MockTier, TierOp};
