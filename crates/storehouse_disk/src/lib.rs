// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Durable file-backed tier for the storehouse object cache.
//!
//! [`DiskTier`] persists each entry as one file under a named directory. Entries survive process
//! restarts until removed, expired and purged, or evicted to keep the directory within its
//! [`DiskConfig::max_size_bytes`] budget.
//!
//! # File Layout
//!
//! The file for a key is named by percent-escaping the key: ASCII letters, digits, `-`, `_` and any
//! `.` other than a leading one are kept, every other byte is written as `%XX`. Callers with long keys,
//! such as URLs, should hash them first; escaped names longer than 255 bytes are rejected with
//! [`ErrorKind::InvalidKey`](storehouse_tier::ErrorKind::InvalidKey).
//!
//! Each file carries a fixed header holding the entry's absolute expiry and write time ahead of the
//! encoded value, so expiry checks never decode the value itself.

mod config;
mod format;
mod tier;

#[doc(inline)]
pub use config::{DEFAULT_DISK_CAPACITY_BYTES, DEFAULT_DISK_NAME, DiskConfig, ProtectionClass};
#[doc(inline)]
pub use tier::DiskTier;
