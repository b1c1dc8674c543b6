// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! On-disk naming and the entry file header.
//!
//! Every entry file starts with a fixed 21-byte header followed by the encoded value:
//!
//! | bytes  | content                                   |
//! |--------|-------------------------------------------|
//! | 0..4   | magic `SHSE`                              |
//! | 4      | format version                            |
//! | 5..13  | expiry, milliseconds since 1970, LE u64    |
//! | 13..21 | stored at, milliseconds since 1970, LE u64 |

use std::{
    fs::File,
    io::{self, Read},
    path::Path,
    time::{Duration, SystemTime},
};

use storehouse_tier::{Error, ErrorKind, Expiry, NEVER_EXPIRES_OFFSET, Result};

pub(crate) const HEADER_LEN: usize = 21;
const MAGIC: &[u8; 4] = b"SHSE";
const VERSION: u8 = 1;

/// Longest file name accepted by common file systems.
const MAX_FILE_NAME_LEN: usize = 255;

/// Prefix of in-flight write files. Names starting with `.` are never produced for keys.
pub(crate) const TEMP_PREFIX: &str = ".tmp";

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Maps a key to its file name.
///
/// ASCII letters, digits, `-`, `_` and non-leading `.` are kept; every other byte becomes `%XX`. The
/// empty key maps to `%`, which no other key can produce.
pub(crate) fn file_name(key: &str) -> Result<String> {
    if key.is_empty() {
        return Ok("%".to_string());
    }

    let mut name = String::with_capacity(key.len());
    for (index, byte) in key.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') || (byte == b'.' && index > 0);
        if keep {
            name.push(char::from(byte));
        } else {
            name.push('%');
            name.push(char::from(HEX[usize::from(byte >> 4)]));
            name.push(char::from(HEX[usize::from(byte & 0x0F)]));
        }
    }

    if name.len() > MAX_FILE_NAME_LEN {
        return Err(Error::from_cause(
            ErrorKind::InvalidKey,
            format!("escaped key is {} bytes, the limit is {MAX_FILE_NAME_LEN}", name.len()),
        ));
    }
    Ok(name)
}

pub(crate) fn to_millis(time: SystemTime) -> u64 {
    let since_epoch = time.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn from_millis(millis: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH
        .checked_add(Duration::from_millis(millis))
        .unwrap_or(SystemTime::UNIX_EPOCH + NEVER_EXPIRES_OFFSET)
}

/// Metadata stored in front of every entry body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub expires_ms: u64,
    pub stored_ms: u64,
}

impl Header {
    pub fn new(expires_at: SystemTime, stored_at: SystemTime) -> Self {
        Self {
            expires_ms: to_millis(expires_at),
            stored_ms: to_millis(stored_at),
        }
    }

    pub fn expiry(self) -> Expiry {
        Expiry::AbsoluteDate(from_millis(self.expires_ms))
    }

    pub fn stored_at(self) -> SystemTime {
        from_millis(self.stored_ms)
    }

    pub fn is_expired(self, now: SystemTime) -> bool {
        self.expiry().is_expired(now)
    }

    pub fn encode(self) -> [u8; HEADER_LEN] {
        let mut bytes = [0_u8; HEADER_LEN];
        bytes[..4].copy_from_slice(MAGIC);
        bytes[4] = VERSION;
        bytes[5..13].copy_from_slice(&self.expires_ms.to_le_bytes());
        bytes[13..].copy_from_slice(&self.stored_ms.to_le_bytes());
        bytes
    }

    /// Parses the header at the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(malformed(format!("file is {} bytes, shorter than its header", bytes.len())));
        };
        if &header[..4] != MAGIC {
            return Err(malformed("bad magic"));
        }
        if header[4] != VERSION {
            return Err(malformed(format!("unsupported format version {}", header[4])));
        }

        let mut expires = [0_u8; 8];
        let mut stored = [0_u8; 8];
        expires.copy_from_slice(&header[5..13]);
        stored.copy_from_slice(&header[13..HEADER_LEN]);
        Ok(Self {
            expires_ms: u64::from_le_bytes(expires),
            stored_ms: u64::from_le_bytes(stored),
        })
    }

    /// Reads only the header of the file at `path`.
    pub fn read_from(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(not_found_or_io)?;
        let mut bytes = [0_u8; HEADER_LEN];
        match file.read_exact(&mut bytes) {
            Ok(()) => Self::decode(&bytes),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(Error::from_cause(ErrorKind::MalformedFileAttributes, e))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn malformed(message: impl Into<String>) -> Error {
    Error::from_cause(ErrorKind::MalformedFileAttributes, message.into())
}

pub(crate) fn not_found_or_io(error: io::Error) -> Error {
    if error.kind() == io::ErrorKind::NotFound {
        Error::not_found()
    } else {
        error.into()
    }
}
