// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `Entry` and `Expiry`.

use std::{
    path::Path,
    time::{Duration, SystemTime},
};

use static_assertions::assert_impl_all;
use storehouse_tier::{Entry, Error, Expiry, JsonCodec};

assert_impl_all!(Entry<String>: Send, Sync, Clone);
assert_impl_all!(Error: Send, Sync, std::error::Error);
assert_impl_all!(JsonCodec<String>: Send, Sync);

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[test]
fn entry_exposes_value_and_metadata() {
    let entry = Entry::new(vec![1, 2, 3], Expiry::AbsoluteDate(at(50)), at(10)).with_disk_path("/tmp/cache/key");

    assert_eq!(entry.value(), &vec![1, 2, 3]);
    assert_eq!(entry.len(), 3);
    assert_eq!(entry.expiry(), Expiry::AbsoluteDate(at(50)));
    assert_eq!(entry.stored_at(), at(10));
    assert_eq!(entry.disk_path(), Some(Path::new("/tmp/cache/key")));
    assert_eq!(entry.into_value(), vec![1, 2, 3]);
}

#[test]
fn entry_expiry_tracks_policy() {
    let entry = Entry::new("v", Expiry::SecondsFrom1970(100.0), at(0));
    assert!(!entry.is_expired(at(100)));
    assert!(entry.is_expired(at(101)));

    let forever = Entry::new("v", Expiry::Never, at(0));
    assert!(!forever.is_expired(at(2_000_000_000)));
}

#[test]
fn expiry_round_trips_through_json() {
    let expiry = Expiry::AbsoluteDate(at(1_234));
    let json = serde_json::to_string(&expiry).expect("serialize");
    let back: Expiry = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, expiry);

    let never: Expiry = serde_json::from_str("\"never\"").expect("deserialize unit variant");
    assert_eq!(never, Expiry::Never);
}

#[test]
fn errors_are_constructible_outside_the_crate() {
    let error = Error::from_cause(storehouse_tier::ErrorKind::InvalidKey, "key too long");
    assert_eq!(error.kind(), storehouse_tier::ErrorKind::InvalidKey);
    assert!(Error::from_kind(storehouse_tier::ErrorKind::NotFound).is_not_found());
}
