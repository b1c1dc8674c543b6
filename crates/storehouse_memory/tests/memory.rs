// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the in-memory tiers.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use storehouse_memory::{AutoPurgeConfig, AutoPurgingTier, InMemoryTier, MemoryConfig};
use storehouse_tier::{BytesCodec, Expiry, StorehouseTier};
use tick::{Clock, ClockControl};

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[test]
fn new_tier_is_empty() {
    let tier = InMemoryTier::<i32>::new(MemoryConfig::new(), Clock::new_frozen());
    assert_eq!(tier.len(), Some(0));
    assert_eq!(tier.usage(), Some(0));
    assert_eq!(tier.is_empty(), Some(true));
}

#[test]
fn set_then_get_returns_value() {
    let tier = InMemoryTier::<String>::new(MemoryConfig::new(), Clock::new_frozen());
    tier.set("key", "value".to_string(), None).expect("set failed");

    let entry = tier.get("key").expect("get failed");
    assert_eq!(entry.value(), "value");
    assert_eq!(entry.expiry(), Expiry::AbsoluteDate(SystemTime::UNIX_EPOCH + storehouse_tier::NEVER_EXPIRES_OFFSET));
    assert_eq!(entry.stored_at(), SystemTime::UNIX_EPOCH);
    assert!(entry.disk_path().is_none());
}

#[test]
fn get_missing_key_is_not_found() {
    let tier = InMemoryTier::<i32>::new(MemoryConfig::new(), Clock::new_frozen());
    assert!(tier.get("missing").unwrap_err().is_not_found());
    assert!(!tier.exists("missing").expect("exists failed"));
}

#[test]
fn count_limit_is_never_exceeded() {
    let tier = InMemoryTier::<u32>::new(MemoryConfig::new().with_count_limit(3), Clock::new_frozen());
    for i in 0..10 {
        tier.set(&format!("k{i}"), i, None).expect("set failed");
        assert!(tier.len().unwrap_or_default() <= 3);
    }

    assert_eq!(tier.len(), Some(3));
    for i in 7..10 {
        assert_eq!(*tier.get(&format!("k{i}")).expect("recent entry").value(), i);
    }
    assert!(tier.get("k0").unwrap_err().is_not_found());
}

#[test]
fn remove_all_clears_everything() {
    let tier = InMemoryTier::<Vec<u8>>::builder(Clock::new_frozen())
        .weigher(|value: &Vec<u8>| value.len() as u64)
        .build();
    tier.set("a", vec![1; 4], None).expect("set failed");
    tier.set("b", vec![2; 4], None).expect("set failed");

    tier.remove_all().expect("remove_all failed");
    assert_eq!(tier.len(), Some(0));
    assert_eq!(tier.usage(), Some(0));
}

#[test]
fn remove_expired_keeps_live_entries() {
    let control = ClockControl::new_at(at(1_000));
    let tier = InMemoryTier::<i32>::new(MemoryConfig::new(), control.to_clock());
    tier.set("short", 1, Some(Expiry::SecondsFrom1970(1_005.0))).expect("set failed");
    tier.set("long", 2, Some(Expiry::AbsoluteDate(at(2_000)))).expect("set failed");
    tier.set("forever", 3, Some(Expiry::Never)).expect("set failed");

    control.advance(Duration::from_secs(10));
    tier.remove_expired().expect("remove_expired failed");

    assert!(!tier.contains_key("short"));
    assert!(tier.contains_key("long"));
    assert!(tier.contains_key("forever"));
}

#[test]
fn remove_stored_since_drops_recent_writes() {
    let control = ClockControl::new_at(at(1_000));
    let tier = InMemoryTier::<i32>::new(MemoryConfig::new(), control.to_clock());
    tier.set("old", 1, None).expect("set failed");
    control.advance(Duration::from_secs(60));
    tier.set("new", 2, None).expect("set failed");

    tier.remove_stored_since(at(1_060)).expect("remove_stored_since failed");
    assert!(tier.contains_key("old"));
    assert!(!tier.contains_key("new"));
}

#[test]
fn remove_if_expired_ignores_live_entries() {
    let control = ClockControl::new_at(at(1_000));
    let tier = InMemoryTier::<i32>::new(MemoryConfig::new(), control.to_clock());
    tier.set("live", 1, Some(Expiry::AbsoluteDate(at(5_000)))).expect("set failed");

    tier.remove_if_expired("live").expect("remove_if_expired failed");
    tier.remove_if_expired("absent").expect("remove_if_expired failed");
    assert!(tier.contains_key("live"));
}

#[test]
fn auto_purging_tier_through_trait_object() {
    let config = AutoPurgeConfig::new(8, 4).expect("valid config");
    let tier: Box<dyn StorehouseTier<Vec<u8>>> =
        Box::new(AutoPurgingTier::new(config, Arc::new(BytesCodec), Clock::new_frozen()).expect("valid tier"));

    tier.set("a", vec![0; 4], None).expect("set failed");
    tier.set("b", vec![0; 4], None).expect("set failed");
    assert_eq!(tier.usage(), Some(8));

    tier.set("c", vec![0; 4], None).expect("set failed");
    assert_eq!(tier.usage(), Some(4));
    assert_eq!(tier.capacity(), Some(8));
    assert!(tier.exists("c").expect("exists failed"));
    assert!(!tier.exists("a").expect("exists failed"));
}

#[test]
fn tiers_are_shareable_across_threads() {
    let tier = Arc::new(InMemoryTier::<u64>::new(MemoryConfig::new().with_count_limit(16), Clock::new_frozen()));
    let handles: Vec<_> = (0..4_u64)
        .map(|t| {
            let tier = Arc::clone(&tier);
            std::thread::spawn(move || {
                for i in 0..100 {
                    tier.set(&format!("{t}-{i}"), i, None).expect("set failed");
                    let _ = tier.get(&format!("{t}-{i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert_eq!(tier.len(), Some(16));
}
