//! # unhash-core
//!
//! A library for recovering object and variable names that RSDKv5 assets
//! store only as MD5 digests.
//!
//! This crate provides the core functionality for:
//! - Hashing candidate names with a memoizing digest oracle
//! - Matching digest-only symbols against an ordered candidate dictionary
//! - Synthesizing one field layout per distinct entity type
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`digest`]: Digest type, hashing scheme and memoization cache
//! - [`dictionary`]: The ordered set of candidate names
//! - [`resolver`]: Symbol resolution against the dictionary
//! - [`schema`]: Entity schema synthesis and rendering
//! - [`run`]: Run aggregation over a stream of entity instances
//! - [`dump`]: The line-based entity dump format
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use unhash_core::{EntityInstance, RenderConfig, RunAggregator, RunConfig, Symbol, VariableType};
//!
//! let mut run = RunAggregator::new(RunConfig::default());
//! run.seed(["Ring", "Player"]);
//!
//! let ring = Symbol::hashed(run.oracle().digest(b"Ring"));
//! let kind = Symbol::from_text(run.oracle(), "type");
//! run.process(&EntityInstance::new(ring).with_field(kind, VariableType::Enum));
//!
//! let report = run.finish();
//! assert!(report.unresolved.is_empty());
//! print!("{}", report.render(&RenderConfig::default()));
//! ```
//!
//! ## Extensibility
//!
//! The library provides several traits for customization:
//!
//! - [`SchemaWriter`]: Customize how schemas are written
//! - [`HashAlgorithm`]: Swap the hashing scheme behind the oracle
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod dictionary;
pub mod digest;
pub mod dump;
pub mod error;
pub mod resolver;
pub mod run;
pub mod schema;

// Re-export primary types for convenience
pub use dictionary::CandidateDictionary;
pub use digest::{Digest, DigestCache, DigestOracle, HashAlgorithm, Md5, DIGEST_LEN};
pub use error::{Error, Result};
pub use resolver::{Resolution, ResolveStrategy, Resolver, Symbol, SymbolSource};
pub use run::{EntityInstance, FieldRef, RunAggregator, RunConfig, RunReport, RunStats};
pub use schema::{
    EntityTypeSchema, FieldDescriptor, NullWriter, RenderConfig, SchemaSynthesizer, SchemaWriter,
    StatsWriter, VariableType, BASE_FIELDS,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
