//! Digest computation for RSDKv5 names.
//!
//! The format stores object and variable names as the MD5 digest of the
//! name's ASCII bytes. This module provides:
//!
//! - [`Digest`]: the fixed-width digest value
//! - [`HashAlgorithm`]: the seam for the hashing scheme ([`Md5`] by default)
//! - [`DigestOracle`]: memoizing string hashing backed by a [`DigestCache`]
//!
//! ## Text encoding
//!
//! Names are hashed over their ASCII encoding. Characters outside ASCII are
//! replaced by one `?` per UTF-16 code unit before hashing, matching the
//! engine tooling that produced the digests in the first place.

mod cache;

use crate::error::{Error, Result};
use md5::Digest as _;
use std::borrow::Cow;
use std::fmt;

pub use cache::{CacheStats, DigestCache};

/// Width of a digest in bytes
pub const DIGEST_LEN: usize = 16;

/// A fixed-width name digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wraps raw digest bytes
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Builds a digest from a slice, rejecting any width other than [`DIGEST_LEN`]
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; DIGEST_LEN] = bytes
            .try_into()
            .map_err(|_| Error::invalid_digest_width(bytes.len(), DIGEST_LEN))?;
        Ok(Self(array))
    }

    /// Parses a hex-encoded digest (case-insensitive)
    pub fn from_hex(input: &str) -> Result<Self> {
        let bytes = hex::decode(input).map_err(|e| Error::invalid_hex(input, e))?;
        Self::from_slice(&bytes)
    }

    /// Returns the raw bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex encoding, used as the display name of unresolved symbols
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

/// Trait for the hashing scheme behind the oracle
///
/// Implementations must be pure: the same input always yields the same digest.
pub trait HashAlgorithm: Send + Sync {
    /// Hash a byte sequence
    fn hash(&self, data: &[u8]) -> Digest;
}

/// MD5, the scheme RSDKv5 uses for names
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5;

impl HashAlgorithm for Md5 {
    fn hash(&self, data: &[u8]) -> Digest {
        let output = md5::Md5::digest(data);
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&output);
        Digest(bytes)
    }
}

/// Encode a name the way the engine does before hashing it
pub fn encode_name(text: &str) -> Cow<'_, [u8]> {
    if text.is_ascii() {
        Cow::Borrowed(text.as_bytes())
    } else {
        let mut bytes = Vec::with_capacity(text.len());
        for c in text.chars() {
            if c.is_ascii() {
                bytes.push(c as u8);
            } else {
                // Characters outside the BMP are surrogate pairs: two `?`
                bytes.extend(std::iter::repeat(b'?').take(c.len_utf16()));
            }
        }
        Cow::Owned(bytes)
    }
}

/// Computes digests, memoizing string lookups in an owned [`DigestCache`]
#[derive(Debug, Default)]
pub struct DigestOracle<A: HashAlgorithm = Md5> {
    algorithm: A,
    cache: DigestCache,
}

impl DigestOracle<Md5> {
    /// Creates an MD5 oracle with an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: HashAlgorithm> DigestOracle<A> {
    /// Creates an oracle over a custom hashing scheme
    pub fn with_algorithm(algorithm: A) -> Self {
        Self {
            algorithm,
            cache: DigestCache::new(),
        }
    }

    /// Hash raw bytes, bypassing the cache
    pub fn digest(&self, data: &[u8]) -> Digest {
        self.algorithm.hash(data)
    }

    /// Hash a name, consulting the cache first
    pub fn digest_str(&self, text: &str) -> Digest {
        self.cache
            .get_or_insert_with(text, |t| self.algorithm.hash(&encode_name(t)))
    }

    /// Returns the cache backing this oracle
    pub fn cache(&self) -> &DigestCache {
        &self.cache
    }
}
