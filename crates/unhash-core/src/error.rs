//! Error types for the unhash-core library.
//!
//! Failing to resolve a digest is not an error: it is reported through
//! [`SymbolSource::Unresolved`](crate::resolver::SymbolSource). The variants
//! below cover contract violations by the caller and the I/O done by helpers
//! that load word lists and entity dumps.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for unhash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all unhash operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A digest was handed over with the wrong number of bytes
    #[error("invalid digest width: got {actual} bytes, expected {expected}")]
    InvalidDigestWidth {
        /// Number of bytes supplied
        actual: usize,
        /// Number of bytes a digest must have
        expected: usize,
    },

    /// A hex-encoded digest could not be decoded
    #[error("invalid hex digest '{input}': {source}")]
    InvalidHex {
        /// The offending input
        input: String,
        /// Underlying decode error
        #[source]
        source: hex::FromHexError,
    },

    /// A variable type tag outside the known set
    #[error("unknown variable type tag {tag}")]
    UnknownVariableType {
        /// The raw tag value
        tag: u8,
    },

    /// A variable type name outside the known set
    #[error("unknown variable type name '{name}'")]
    UnknownVariableTypeName {
        /// The unrecognized name
        name: String,
    },

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Malformed line in an entity dump
    #[error("invalid entity dump at line {line}: {details}")]
    DumpParse {
        /// 1-based line number
        line: usize,
        /// Detailed description of the issue
        details: String,
    },
}

impl Error {
    /// Creates a new digest width error
    pub fn invalid_digest_width(actual: usize, expected: usize) -> Self {
        Self::InvalidDigestWidth { actual, expected }
    }

    /// Creates a new hex decode error
    pub fn invalid_hex(input: impl Into<String>, source: hex::FromHexError) -> Self {
        Self::InvalidHex {
            input: input.into(),
            source,
        }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new dump parse error
    pub fn dump_parse(line: usize, details: impl Into<String>) -> Self {
        Self::DumpParse {
            line,
            details: details.into(),
        }
    }

    /// Returns true if processing can skip the offending input and go on
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FileRead { .. } | Self::DumpParse { .. })
    }
}
