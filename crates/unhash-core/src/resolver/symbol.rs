//! Name references as handed over by scene and config readers.

use crate::digest::{Digest, DigestOracle, HashAlgorithm};
use crate::error::Result;
use std::borrow::Cow;
use std::fmt;

/// A name reference: always a digest, sometimes with the original text
///
/// When `text` is present it is trusted to hash to `digest`; nothing here
/// re-verifies that.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    digest: Digest,
    text: Option<String>,
}

impl Symbol {
    /// A digest-only symbol
    pub fn hashed(digest: Digest) -> Self {
        Self { digest, text: None }
    }

    /// A symbol carrying its text alongside the stored digest
    pub fn inline(text: impl Into<String>, digest: Digest) -> Self {
        Self {
            digest,
            text: Some(text.into()),
        }
    }

    /// A symbol for known text, hashing it through the oracle
    pub fn from_text<A: HashAlgorithm>(oracle: &DigestOracle<A>, text: impl Into<String>) -> Self {
        let text = text.into();
        let digest = oracle.digest_str(&text);
        Self::inline(text, digest)
    }

    /// A digest-only symbol from raw bytes, rejecting the wrong width
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        Ok(Self::hashed(Digest::from_slice(bytes)?))
    }

    /// A digest-only symbol from its hex encoding
    pub fn from_hex(input: &str) -> Result<Self> {
        Ok(Self::hashed(Digest::from_hex(input)?))
    }

    /// The stored digest
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// The inline text, if the reader had it
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns true if the symbol needs dictionary resolution
    pub fn is_digest_only(&self) -> bool {
        self.text.is_none()
    }
}

/// Where a resolved name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolSource {
    /// The symbol carried its own text
    Inline,
    /// A dictionary candidate hashed to the stored digest
    Dictionary,
    /// No candidate matched
    Unresolved,
}

impl SymbolSource {
    /// Short lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolSource::Inline => "inline",
            SymbolSource::Dictionary => "dictionary",
            SymbolSource::Unresolved => "unresolved",
        }
    }
}

/// Outcome of resolving one [`Symbol`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Digest of the resolved symbol
    pub digest: Digest,
    /// Recovered text, absent when unresolved
    pub text: Option<String>,
    /// How the text was obtained
    pub source: SymbolSource,
}

impl Resolution {
    /// Returns true if text was recovered
    pub fn is_resolved(&self) -> bool {
        self.source != SymbolSource::Unresolved
    }

    /// The recovered text, or the hex encoding of the digest
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.text {
            Some(text) => Cow::Borrowed(text),
            None => Cow::Owned(self.digest.to_hex()),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}
