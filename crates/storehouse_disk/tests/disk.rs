// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `DiskTier`.

use std::{
    fs,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};
use storehouse_disk::{DiskConfig, DiskTier};
use storehouse_tier::{BytesCodec, Codec, ErrorKind, Expiry, JsonCodec, StorehouseTier};

const HEADER_LEN: usize = 21;
use tempfile::TempDir;
use tick::{Clock, ClockControl};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Thumbnail {
    width: u32,
    height: u32,
    url: String,
}

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn thumbnails(root: &TempDir, clock: Clock) -> DiskTier<Thumbnail> {
    DiskTier::open(root.path(), DiskConfig::new("thumbnails"), Arc::new(JsonCodec::<Thumbnail>::new()), clock)
        .expect("open failed")
}

fn thumbnail(width: u32) -> Thumbnail {
    Thumbnail {
        width,
        height: width / 2,
        url: format!("https://example.com/{width}.jpg"),
    }
}

#[test]
fn set_then_get_round_trips() {
    let root = TempDir::new().expect("tempdir");
    let tier = thumbnails(&root, Clock::new_frozen());
    tier.set("https://example.com/a.jpg", thumbnail(640), None).expect("set failed");

    let entry = tier.get("https://example.com/a.jpg").expect("get failed");
    assert_eq!(entry.value(), &thumbnail(640));
    assert_eq!(entry.stored_at(), SystemTime::UNIX_EPOCH);
    let path = entry.disk_path().expect("disk entries carry their path");
    assert_eq!(path.parent(), Some(root.path().join("thumbnails").as_path()));
    assert!(path.exists());
}

#[test]
fn missing_key_is_not_found() {
    let root = TempDir::new().expect("tempdir");
    let tier = thumbnails(&root, Clock::new_frozen());
    assert!(tier.get("absent").unwrap_err().is_not_found());
    assert!(!tier.exists("absent").expect("exists failed"));
}

#[test]
fn last_write_wins() {
    let root = TempDir::new().expect("tempdir");
    let tier = thumbnails(&root, Clock::new_frozen());
    tier.set("a", thumbnail(1), None).expect("set failed");
    tier.set("a", thumbnail(2), None).expect("set failed");
    assert_eq!(tier.get("a").expect("get failed").into_value(), thumbnail(2));
    assert_eq!(tier.len(), Some(1));
}

#[test]
fn entries_survive_reopening() {
    let root = TempDir::new().expect("tempdir");
    {
        let tier = thumbnails(&root, Clock::new_frozen());
        tier.set("kept", thumbnail(100), Some(Expiry::Never)).expect("set failed");
        tier.set("gone", thumbnail(200), None).expect("set failed");
        tier.remove("gone").expect("remove failed");
    }

    let reopened = thumbnails(&root, Clock::new_frozen());
    assert_eq!(reopened.len(), Some(1));
    assert_eq!(reopened.get("kept").expect("get failed").into_value(), thumbnail(100));
    assert!(reopened.get("gone").unwrap_err().is_not_found());
}

#[test]
fn past_expiry_reads_as_miss_until_purged() {
    let root = TempDir::new().expect("tempdir");
    let control = ClockControl::new_at(at(10_000));
    let tier = thumbnails(&root, control.to_clock());
    tier.set("b", thumbnail(1), Some(Expiry::SecondsFrom1970(5_000.0))).expect("set failed");
    tier.set("live", thumbnail(2), Some(Expiry::AbsoluteDate(at(20_000)))).expect("set failed");

    assert!(tier.get("b").unwrap_err().is_not_found());
    assert!(tier.is_expired("b").expect("is_expired failed"));
    assert_eq!(tier.len(), Some(2));

    tier.remove_expired().expect("remove_expired failed");
    assert_eq!(tier.len(), Some(1));
    assert!(tier.get("live").is_ok());
}

#[test]
fn remove_if_expired_only_touches_expired_entries() {
    let root = TempDir::new().expect("tempdir");
    let control = ClockControl::new_at(at(1_000));
    let tier = thumbnails(&root, control.to_clock());
    tier.set("soon", thumbnail(1), Some(Expiry::SecondsFrom1970(1_050.0))).expect("set failed");

    tier.remove_if_expired("soon").expect("remove_if_expired failed");
    assert_eq!(tier.len(), Some(1));

    control.advance(Duration::from_secs(100));
    tier.remove_if_expired("soon").expect("remove_if_expired failed");
    assert_eq!(tier.len(), Some(0));
}

#[test]
fn remove_stored_since_undoes_recent_writes() {
    let root = TempDir::new().expect("tempdir");
    let control = ClockControl::new_at(at(1_000));
    let tier = thumbnails(&root, control.to_clock());
    tier.set("before", thumbnail(1), None).expect("set failed");
    control.advance(Duration::from_secs(30));
    tier.set("at", thumbnail(2), None).expect("set failed");
    control.advance(Duration::from_secs(30));
    tier.set("after", thumbnail(3), None).expect("set failed");

    tier.remove_stored_since(at(1_030)).expect("remove_stored_since failed");
    assert!(tier.get("before").is_ok());
    assert!(tier.get("at").unwrap_err().is_not_found());
    assert!(tier.get("after").unwrap_err().is_not_found());
}

#[test]
fn remove_all_empties_the_directory() {
    let root = TempDir::new().expect("tempdir");
    let tier = thumbnails(&root, Clock::new_frozen());
    for i in 0..5 {
        tier.set(&format!("k{i}"), thumbnail(i), None).expect("set failed");
    }

    tier.remove_all().expect("remove_all failed");
    assert_eq!(tier.len(), Some(0));
    assert_eq!(tier.usage(), Some(0));
    assert_eq!(fs::read_dir(tier.directory()).expect("read_dir").count(), 0);
}

#[test]
fn budget_is_never_exceeded() {
    let root = TempDir::new().expect("tempdir");
    let control = ClockControl::new_at(at(1_000));
    let config = DiskConfig::new("blobs").with_max_size_bytes(200);
    let tier = DiskTier::open(root.path(), config, Arc::new(BytesCodec), control.to_clock()).expect("open failed");

    for i in 0..20_u8 {
        tier.set(&format!("blob{i}"), vec![i; 29], None).expect("set failed");
        control.advance(Duration::from_millis(10));
        assert!(tier.usage().unwrap_or_default() <= 200);
    }

    assert_eq!(tier.len(), Some(4));
    assert!(tier.get("blob19").is_ok());
    assert!(tier.get("blob15").unwrap_err().is_not_found());
}

#[test]
fn entry_larger_than_budget_is_not_kept() {
    let root = TempDir::new().expect("tempdir");
    let config = DiskConfig::new("blobs").with_max_size_bytes(64);
    let tier = DiskTier::open(root.path(), config, Arc::new(BytesCodec), Clock::new_frozen()).expect("open failed");

    tier.set("huge", vec![0; 100], None).expect("set failed");
    assert!(tier.get("huge").unwrap_err().is_not_found());
    assert_eq!(tier.usage(), Some(0));
}

#[test]
fn reopening_with_smaller_budget_evicts_oldest() {
    let root = TempDir::new().expect("tempdir");
    let control = ClockControl::new_at(at(1_000));
    {
        let tier = DiskTier::open(root.path(), DiskConfig::new("blobs"), Arc::new(BytesCodec), control.to_clock())
            .expect("open failed");
        for key in ["first", "second", "third"] {
            tier.set(key, vec![0; 29], None).expect("set failed");
            control.advance(Duration::from_secs(1));
        }
    }

    let config = DiskConfig::new("blobs").with_max_size_bytes(100);
    let tier = DiskTier::open(root.path(), config, Arc::new(BytesCodec), control.to_clock()).expect("open failed");
    assert_eq!(tier.len(), Some(2));
    assert!(tier.get("first").unwrap_err().is_not_found());
    assert!(tier.get("third").is_ok());
}

#[test]
fn corrupt_header_is_malformed() {
    let root = TempDir::new().expect("tempdir");
    let tier = thumbnails(&root, Clock::new_frozen());
    tier.set("k", thumbnail(1), None).expect("set failed");
    fs::write(tier.directory().join("k"), b"not a cache file at all").expect("overwrite");

    assert_eq!(tier.get("k").unwrap_err().kind(), ErrorKind::MalformedFileAttributes);
}

#[test]
fn corrupt_files_are_dropped_when_reopening() {
    let root = TempDir::new().expect("tempdir");
    let tier = thumbnails(&root, Clock::new_frozen());
    tier.set("good", thumbnail(1), None).expect("set failed");
    fs::write(tier.directory().join("bad"), b"short").expect("write");
    drop(tier);

    let reopened = thumbnails(&root, Clock::new_frozen());
    assert_eq!(reopened.len(), Some(1));
    assert!(!reopened.directory().join("bad").exists());
}

#[test]
fn wrong_value_type_is_type_mismatch() {
    let root = TempDir::new().expect("tempdir");
    let strings = DiskTier::open(
        root.path(),
        DiskConfig::new("shared"),
        Arc::new(JsonCodec::<String>::new()),
        Clock::new_frozen(),
    )
    .expect("open failed");
    strings.set("k", "plain text".to_string(), None).expect("set failed");

    let thumbnails = DiskTier::open(
        root.path(),
        DiskConfig::new("shared"),
        Arc::new(JsonCodec::<Thumbnail>::new()),
        Clock::new_frozen(),
    )
    .expect("open failed");
    assert_eq!(thumbnails.get("k").unwrap_err().kind(), ErrorKind::TypeNotMatch);
}

#[test]
fn truncated_body_fails_to_decode() {
    let root = TempDir::new().expect("tempdir");
    let tier = thumbnails(&root, Clock::new_frozen());
    tier.set("k", thumbnail(1), None).expect("set failed");

    let path = tier.directory().join("k");
    let bytes = fs::read(&path).expect("read");
    fs::write(&path, &bytes[..bytes.len() - 3]).expect("truncate");
    assert_eq!(tier.get("k").unwrap_err().kind(), ErrorKind::DecodingFailed);
}

struct CountingCodec {
    decodes: AtomicUsize,
}

impl Codec<Vec<u8>> for CountingCodec {
    fn encode(&self, value: &Vec<u8>) -> storehouse_tier::Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> storehouse_tier::Result<Vec<u8>> {
        let _ = self.decodes.fetch_add(1, Ordering::Relaxed);
        Ok(bytes.to_vec())
    }
}

#[test]
fn is_expired_reads_only_the_header() {
    let root = TempDir::new().expect("tempdir");
    let control = ClockControl::new_at(at(100));
    let codec = Arc::new(CountingCodec {
        decodes: AtomicUsize::new(0),
    });
    let shared: Arc<dyn Codec<Vec<u8>>> = Arc::clone(&codec) as _;
    let tier = DiskTier::open(root.path(), DiskConfig::new("counted"), shared, control.to_clock()).expect("open failed");

    tier.set("live", vec![1, 2, 3], Some(Expiry::SecondsFrom1970(500.0))).expect("set failed");
    tier.set("stale", vec![4], Some(Expiry::SecondsFrom1970(50.0))).expect("set failed");

    assert!(!tier.is_expired("live").expect("is_expired failed"));
    assert!(tier.is_expired("stale").expect("is_expired failed"));
    assert!(tier.is_expired("absent").expect("is_expired failed"));
    assert_eq!(codec.decodes.load(Ordering::Relaxed), 0);
}

#[test]
fn is_expired_ignores_an_undecodable_body() {
    let root = TempDir::new().expect("tempdir");
    let tier = thumbnails(&root, Clock::new_frozen());
    tier.set("k", thumbnail(1), None).expect("set failed");

    let path = tier.directory().join("k");
    let mut bytes = fs::read(&path).expect("read");
    bytes.truncate(HEADER_LEN);
    bytes.extend_from_slice(b"{garbage");
    fs::write(&path, &bytes).expect("rewrite");

    assert!(tier.get("k").is_err());
    assert!(!tier.is_expired("k").expect("is_expired failed"));
}

#[test]
fn failed_encoding_writes_nothing() {
    #[derive(Debug, Clone)]
    struct Opaque;

    impl Serialize for Opaque {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("opaque values cannot be stored"))
        }
    }

    impl<'de> Deserialize<'de> for Opaque {
        fn deserialize<D: serde::Deserializer<'de>>(_: D) -> Result<Self, D::Error> {
            Ok(Self)
        }
    }

    let root = TempDir::new().expect("tempdir");
    let tier = DiskTier::open(
        root.path(),
        DiskConfig::new("opaque"),
        Arc::new(JsonCodec::<Opaque>::new()),
        Clock::new_frozen(),
    )
    .expect("open failed");

    assert_eq!(tier.set("k", Opaque, None).unwrap_err().kind(), ErrorKind::EncodingFailed);
    assert_eq!(fs::read_dir(tier.directory()).expect("read_dir").count(), 0);
}

#[test]
fn keys_with_path_separators_stay_inside_the_directory() {
    let root = TempDir::new().expect("tempdir");
    let tier = thumbnails(&root, Clock::new_frozen());
    tier.set("../../escape", thumbnail(1), None).expect("set failed");

    let path = tier.get("../../escape").expect("get failed").disk_path().map(ToOwned::to_owned).expect("path");
    assert_eq!(path.parent(), Some(tier.directory()));
    assert!(!root.path().join("escape").exists());
}
