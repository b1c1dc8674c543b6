// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! File-backed tier.
//!
//! Each entry is one file in the tier's directory. An in-memory index of every entry file's size,
//! expiry and write time is built when the tier opens and kept in step with every mutation, so budget
//! enforcement and the purge operations never read file bodies.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, fs,
    io::{self, Write},
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use parking_lot::Mutex;
use storehouse_tier::{Codec, Entry, Error, ErrorKind, Expiry, Result, StorehouseTier};
use tick::Clock;

use crate::{
    DiskConfig, ProtectionClass,
    format::{HEADER_LEN, Header, TEMP_PREFIX, file_name, from_millis, not_found_or_io, to_millis},
};

#[derive(Clone, Copy, Debug)]
struct Indexed {
    size: u64,
    expires_ms: u64,
    stored_ms: u64,
}

impl Indexed {
    fn is_expired(self, now: SystemTime) -> bool {
        Expiry::AbsoluteDate(from_millis(self.expires_ms)).is_expired(now)
    }
}

#[derive(Debug, Default)]
struct Index {
    files: BTreeMap<String, Indexed>,
    by_age: BTreeSet<(u64, String)>,
    total: u64,
}

impl Index {
    fn insert(&mut self, name: String, entry: Indexed) {
        self.remove(&name);
        self.total += entry.size;
        let _ = self.by_age.insert((entry.stored_ms, name.clone()));
        let _ = self.files.insert(name, entry);
    }

    fn remove(&mut self, name: &str) -> Option<Indexed> {
        let entry = self.files.remove(name)?;
        self.total -= entry.size;
        let _ = self.by_age.remove(&(entry.stored_ms, name.to_string()));
        Some(entry)
    }

    /// The entry written longest ago, ties broken by file name.
    fn oldest(&self) -> Option<String> {
        self.by_age.first().map(|(_, name)| name.clone())
    }

    fn names_where(&self, select: impl Fn(&Indexed) -> bool) -> Vec<String> {
        self.files
            .iter()
            .filter(|(_, entry)| select(entry))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// A durable tier storing one file per key under `<root>/<name>/`.
///
/// Values are converted to bytes with the tier's [`Codec`] and written behind a small header holding
/// the resolved expiry and the write time. Writes land in a hidden temporary file that is renamed over
/// the target, so a failed write never leaves a partial entry behind.
///
/// When the total size of entry files exceeds [`DiskConfig::max_size_bytes`], the entries written
/// longest ago are deleted first until the tier is back within budget. File names break ties between
/// entries written in the same millisecond.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use storehouse_disk::{DiskConfig, DiskTier};
/// use storehouse_tier::{JsonCodec, StorehouseTier};
/// use tick::Clock;
///
/// let root = tempfile::tempdir()?;
/// let tier = DiskTier::open(
///     root.path(),
///     DiskConfig::new("profiles"),
///     Arc::new(JsonCodec::<String>::new()),
///     Clock::new_frozen(),
/// )?;
///
/// tier.set("user/42", "Ada".to_string(), None)?;
/// let entry = tier.get("user/42")?;
/// assert_eq!(entry.value(), "Ada");
/// assert!(entry.disk_path().unwrap().starts_with(root.path().join("profiles")));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DiskTier<V> {
    config: DiskConfig,
    directory: PathBuf,
    codec: Arc<dyn Codec<V>>,
    clock: Clock,
    index: Mutex<Index>,
}

impl<V> fmt::Debug for DiskTier<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.index.lock();
        f.debug_struct("DiskTier")
            .field("config", &self.config)
            .field("directory", &self.directory)
            .field("len", &index.files.len())
            .field("usage", &index.total)
            .finish_non_exhaustive()
    }
}

impl<V> DiskTier<V> {
    /// Opens the tier directory `<root>/<name>`, creating it if needed, and indexes its entries.
    ///
    /// Files that are not valid entries are deleted while indexing, as are temporary files left by
    /// interrupted writes. If the indexed entries exceed the configured budget, the oldest are evicted
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfiguration` error if the configured name is not a single plain path
    /// component, or an `Io` error if the directory cannot be created or read.
    pub fn open(root: impl AsRef<Path>, config: DiskConfig, codec: Arc<dyn Codec<V>>, clock: Clock) -> Result<Self> {
        validate_name(config.name())?;
        let directory = root.as_ref().join(config.name());
        create_directory(&directory, config.protection_class())?;

        let tier = Self {
            config,
            directory,
            codec,
            clock,
            index: Mutex::new(Index::default()),
        };
        tier.rebuild_index()?;
        Ok(tier)
    }

    /// Returns the configuration this tier was opened with.
    #[must_use]
    pub fn config(&self) -> &DiskConfig {
        &self.config
    }

    /// Returns the directory holding the entry files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        Ok(self.directory.join(file_name(key)?))
    }

    fn rebuild_index(&self) -> Result<()> {
        let mut index = Index::default();
        for dir_entry in fs::read_dir(&self.directory)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            let Ok(name) = dir_entry.file_name().into_string() else {
                continue;
            };

            if name.starts_with(TEMP_PREFIX) {
                remove_file_if_exists(&path)?;
                continue;
            }
            if name.starts_with('.') || !dir_entry.file_type()?.is_file() {
                continue;
            }

            match Header::read_from(&path) {
                Ok(header) => index.insert(
                    name,
                    Indexed {
                        size: dir_entry.metadata()?.len(),
                        expires_ms: header.expires_ms,
                        stored_ms: header.stored_ms,
                    },
                ),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "removing unreadable disk cache file");
                    remove_file_if_exists(&path)?;
                }
            }
        }

        let mut guard = self.index.lock();
        *guard = index;
        self.evict_over_budget(&mut guard)
    }

    fn evict_over_budget(&self, index: &mut Index) -> Result<()> {
        let max = self.config.max_size_bytes();
        if max == 0 {
            return Ok(());
        }

        while index.total > max {
            let Some(name) = index.oldest() else {
                break;
            };
            remove_file_if_exists(&self.directory.join(&name))?;
            if let Some(evicted) = index.remove(&name) {
                tracing::debug!(file = %name, size = evicted.size, "disk tier evicted entry");
            }
        }
        Ok(())
    }

    fn write_atomically(&self, name: &str, header: Header, body: &[u8]) -> Result<u64> {
        let mut builder = tempfile::Builder::new();
        let _ = builder.prefix(TEMP_PREFIX);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = if self.config.protection_class().is_restricted() { 0o600 } else { 0o644 };
            let _ = builder.permissions(fs::Permissions::from_mode(mode));
        }

        let mut file = builder.tempfile_in(&self.directory)?;
        file.write_all(&header.encode())?;
        file.write_all(body)?;
        file.as_file().sync_data()?;
        let _ = file.persist(self.directory.join(name)).map_err(|e| Error::from(e.error))?;
        Ok((HEADER_LEN + body.len()) as u64)
    }

    /// Deletes the named files, attempting every one and reporting the first failure.
    fn remove_files(&self, index: &mut Index, names: Vec<String>) -> Result<()> {
        let mut first_error = None;
        for name in names {
            match remove_file_if_exists(&self.directory.join(&name)) {
                Ok(()) => {
                    let _ = index.remove(&name);
                }
                Err(e) => {
                    let _ = first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<V> StorehouseTier<V> for DiskTier<V> {
    fn get(&self, key: &str) -> Result<Entry<V>> {
        let path = self.path_for(key)?;
        let bytes = fs::read(&path).map_err(not_found_or_io)?;
        let header = Header::decode(&bytes)?;
        if header.is_expired(self.clock.system_time()) {
            return Err(Error::not_found());
        }

        let value = self.codec.decode(bytes.get(HEADER_LEN..).unwrap_or_default())?;
        Ok(Entry::new(value, header.expiry(), header.stored_at()).with_disk_path(path))
    }

    fn set(&self, key: &str, value: V, expiry: Option<Expiry>) -> Result<()> {
        let name = file_name(key)?;
        let body = self.codec.encode(&value)?;
        let expires_at = expiry.unwrap_or(self.config.expiry()).resolve();
        let header = Header::new(expires_at, self.clock.system_time());

        let mut index = self.index.lock();
        let size = self.write_atomically(&name, header, &body)?;
        index.insert(
            name,
            Indexed {
                size,
                expires_ms: header.expires_ms,
                stored_ms: header.stored_ms,
            },
        );
        self.evict_over_budget(&mut index)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let name = file_name(key)?;
        let mut index = self.index.lock();
        remove_file_if_exists(&self.directory.join(&name))?;
        let _ = index.remove(&name);
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        let mut index = self.index.lock();
        let names = index.names_where(|_| true);
        self.remove_files(&mut index, names)
    }

    fn remove_expired(&self) -> Result<()> {
        let now = self.clock.system_time();
        let mut index = self.index.lock();
        let names = index.names_where(|entry| entry.is_expired(now));
        self.remove_files(&mut index, names)
    }

    fn remove_stored_since(&self, date: SystemTime) -> Result<()> {
        let cutoff = to_millis(date);
        let mut index = self.index.lock();
        let names = index.names_where(|entry| entry.stored_ms >= cutoff);
        self.remove_files(&mut index, names)
    }

    fn remove_if_expired(&self, key: &str) -> Result<()> {
        let name = file_name(key)?;
        let now = self.clock.system_time();
        let mut index = self.index.lock();
        if index.files.get(&name).is_some_and(|entry| entry.is_expired(now)) {
            remove_file_if_exists(&self.directory.join(&name))?;
            let _ = index.remove(&name);
        }
        Ok(())
    }

    /// Reads only the header, so an entry whose body no longer decodes still reports its expiry.
    fn is_expired(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match Header::read_from(&path) {
            Ok(header) => Ok(header.is_expired(self.clock.system_time())),
            Err(e) if e.is_not_found() => Ok(true),
            Err(e) => Err(e),
        }
    }

    fn len(&self) -> Option<u64> {
        Some(self.index.lock().files.len() as u64)
    }

    fn capacity(&self) -> Option<u64> {
        let max = self.config.max_size_bytes();
        (max > 0).then_some(max)
    }

    fn usage(&self) -> Option<u64> {
        Some(self.index.lock().total)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(component)), None) if component == name => Ok(()),
        _ => Err(Error::from_cause(
            ErrorKind::InvalidConfiguration,
            format!("disk tier name {name:?} must be a single plain path component"),
        )),
    }
}

fn create_directory(directory: &Path, protection: ProtectionClass) -> Result<()> {
    fs::create_dir_all(directory)?;

    #[cfg(unix)]
    if protection.is_restricted() {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(directory, fs::Permissions::from_mode(0o700))?;
    }
    #[cfg(not(unix))]
    let _ = protection;

    Ok(())
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
