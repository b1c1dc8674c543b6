// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversion of stored values to and from bytes.
//!
//! Tiers that persist values or account for their size in bytes are generic over a [`Codec`].

use std::{fmt, marker::PhantomData};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::error::Category;

use crate::{Error, ErrorKind, Result};

/// Converts values of type `V` to bytes and back.
///
/// Implementations report failures with [`ErrorKind::EncodingFailed`], [`ErrorKind::DecodingFailed`]
/// or [`ErrorKind::TypeNotMatch`].
pub trait Codec<V>: Send + Sync {
    /// Encodes a value into its stored form.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::EncodingFailed`] error if the value cannot be represented.
    fn encode(&self, value: &V) -> Result<Vec<u8>>;

    /// Decodes a value from its stored form.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TypeNotMatch`] if the bytes are well formed but describe a different type,
    /// or [`ErrorKind::DecodingFailed`] if they are not well formed.
    fn decode(&self, bytes: &[u8]) -> Result<V>;
}

/// A [`Codec`] storing values as JSON via `serde`.
///
/// # Examples
///
/// ```
/// use storehouse_tier::{Codec, ErrorKind, JsonCodec};
///
/// let codec = JsonCodec::<Vec<u32>>::new();
/// let bytes = codec.encode(&vec![1, 2, 3]).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), vec![1, 2, 3]);
///
/// let error = codec.decode(br#"{"not":"a list"}"#).unwrap_err();
/// assert_eq!(error.kind(), ErrorKind::TypeNotMatch);
/// ```
pub struct JsonCodec<V> {
    _phantom: PhantomData<fn() -> V>,
}

impl<V> JsonCodec<V> {
    /// Creates a JSON codec.
    #[must_use]
    pub fn new() -> Self {
        Self { _phantom: PhantomData }
    }
}

impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for JsonCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for JsonCodec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec").finish()
    }
}

impl<V> Codec<V> for JsonCodec<V>
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::caused_by(ErrorKind::EncodingFailed, e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<V> {
        serde_json::from_slice(bytes).map_err(|e| {
            let kind = match e.classify() {
                Category::Data => ErrorKind::TypeNotMatch,
                Category::Io | Category::Syntax | Category::Eof => ErrorKind::DecodingFailed,
            };
            Error::caused_by(kind, e)
        })
    }
}

/// A [`Codec`] for raw byte values, stored as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesCodec;

impl Codec<Vec<u8>> for BytesCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}
