//! Symbol resolution against the candidate dictionary.
//!
//! ## Algorithm Overview
//!
//! 1. A symbol with inline text resolves to that text without hashing anything
//! 2. Otherwise every candidate is hashed (memoized by the oracle) in
//!    dictionary order and compared with the stored digest
//! 3. The first equal candidate wins; no match yields
//!    [`SymbolSource::Unresolved`]
//!
//! Two distinct candidates hashing to the same digest is a genuine collision.
//! It is not detected: the earlier candidate in dictionary order wins.
//!
//! [`ResolveStrategy::Indexed`] answers lookups from a [`DigestIndex`], a
//! digest -> first position map built once over the dictionary. It gives the
//! same answers as the scan, since it records each digest's earliest candidate.

mod symbol;

use crate::dictionary::CandidateDictionary;
use crate::digest::{Digest, DigestOracle, HashAlgorithm, Md5};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing::{debug, trace};

pub use symbol::{Resolution, Symbol, SymbolSource};

/// How digest-only symbols are matched against the dictionary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// Hash candidates in order until one matches
    #[default]
    Scan,
    /// Precompute a digest index over the whole dictionary
    Indexed,
}

/// Counters collected while resolving
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Symbols answered from inline text
    pub inline: u64,
    /// Symbols matched against a dictionary candidate
    pub dictionary: u64,
    /// Symbols nothing matched
    pub unresolved: u64,
    /// Dictionary lookups performed (scans or index probes)
    pub lookups: u64,
}

/// Digest -> earliest dictionary position
#[derive(Debug, Clone, Default)]
pub struct DigestIndex {
    positions: HashMap<Digest, usize>,
    candidates: usize,
}

impl DigestIndex {
    /// Hash every candidate once and record where each digest first appears
    pub fn build<A: HashAlgorithm>(
        dictionary: &CandidateDictionary,
        oracle: &DigestOracle<A>,
    ) -> Self {
        let mut positions = HashMap::with_capacity(dictionary.len());
        for (position, candidate) in dictionary.all().enumerate() {
            positions
                .entry(oracle.digest_str(candidate))
                .or_insert(position);
        }
        debug!(
            "Built digest index: {} digests over {} candidates",
            positions.len(),
            dictionary.len()
        );
        Self {
            positions,
            candidates: dictionary.len(),
        }
    }

    /// Returns true if the index still covers every candidate
    ///
    /// The dictionary only grows, so its length identifies its contents.
    pub fn is_current(&self, dictionary: &CandidateDictionary) -> bool {
        self.candidates == dictionary.len()
    }

    /// Earliest dictionary position hashing to `digest`
    pub fn position(&self, digest: &Digest) -> Option<usize> {
        self.positions.get(digest).copied()
    }
}

#[derive(Debug, Default)]
struct Counters {
    inline: AtomicU64,
    dictionary: AtomicU64,
    unresolved: AtomicU64,
    lookups: AtomicU64,
}

/// Resolves symbols against a read-only dictionary
///
/// The resolver borrows the dictionary immutably, so the dictionary cannot
/// grow while any resolution (sequential or parallel) is in flight.
#[derive(Debug)]
pub struct Resolver<'a, A: HashAlgorithm = Md5> {
    dictionary: &'a CandidateDictionary,
    oracle: &'a DigestOracle<A>,
    strategy: ResolveStrategy,
    index: OnceLock<DigestIndex>,
    shared_index: Option<&'a DigestIndex>,
    counters: Counters,
}

impl<'a, A: HashAlgorithm> Resolver<'a, A> {
    /// Creates a scanning resolver
    pub fn new(dictionary: &'a CandidateDictionary, oracle: &'a DigestOracle<A>) -> Self {
        Self::with_strategy(dictionary, oracle, ResolveStrategy::Scan)
    }

    /// Creates a resolver with the given strategy
    pub fn with_strategy(
        dictionary: &'a CandidateDictionary,
        oracle: &'a DigestOracle<A>,
        strategy: ResolveStrategy,
    ) -> Self {
        Self {
            dictionary,
            oracle,
            strategy,
            index: OnceLock::new(),
            shared_index: None,
            counters: Counters::default(),
        }
    }

    /// Creates an indexed resolver over a prebuilt index
    ///
    /// The index must have been built from this dictionary.
    pub fn with_index(
        dictionary: &'a CandidateDictionary,
        oracle: &'a DigestOracle<A>,
        index: &'a DigestIndex,
    ) -> Self {
        debug_assert!(index.is_current(dictionary));
        Self {
            shared_index: Some(index),
            ..Self::with_strategy(dictionary, oracle, ResolveStrategy::Indexed)
        }
    }

    /// Resolve a single symbol
    pub fn resolve(&self, symbol: &Symbol) -> Resolution {
        if let Some(text) = symbol.text() {
            self.counters.inline.fetch_add(1, Ordering::Relaxed);
            return Resolution {
                digest: *symbol.digest(),
                text: Some(text.to_string()),
                source: SymbolSource::Inline,
            };
        }

        self.counters.lookups.fetch_add(1, Ordering::Relaxed);
        let found = match self.strategy {
            ResolveStrategy::Scan => self.scan(symbol.digest()),
            ResolveStrategy::Indexed => self.lookup_index(symbol.digest()),
        };

        match found {
            Some(text) => {
                trace!("Resolved {} -> {}", symbol.digest(), text);
                self.counters.dictionary.fetch_add(1, Ordering::Relaxed);
                Resolution {
                    digest: *symbol.digest(),
                    text: Some(text.to_string()),
                    source: SymbolSource::Dictionary,
                }
            }
            None => {
                trace!("No candidate for {}", symbol.digest());
                self.counters.unresolved.fetch_add(1, Ordering::Relaxed);
                Resolution {
                    digest: *symbol.digest(),
                    text: None,
                    source: SymbolSource::Unresolved,
                }
            }
        }
    }

    /// Resolve many symbols, keeping input order
    ///
    /// With the `parallel` feature the symbols are spread over the rayon pool.
    pub fn resolve_all<S>(&self, symbols: &[S]) -> Vec<Resolution>
    where
        S: Borrow<Symbol> + Sync,
    {
        debug!(
            "Resolving {} symbols against {} candidates",
            symbols.len(),
            self.dictionary.len()
        );

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            symbols.par_iter().map(|s| self.resolve(s.borrow())).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.resolve_all_sequential(symbols)
        }
    }

    /// Resolve many symbols on the calling thread
    pub fn resolve_all_sequential<S: Borrow<Symbol>>(&self, symbols: &[S]) -> Vec<Resolution> {
        symbols.iter().map(|s| self.resolve(s.borrow())).collect()
    }

    fn scan(&self, digest: &Digest) -> Option<&'a str> {
        let dictionary = self.dictionary;
        dictionary
            .all()
            .find(|candidate| self.oracle.digest_str(candidate) == *digest)
    }

    fn lookup_index(&self, digest: &Digest) -> Option<&'a str> {
        let dictionary = self.dictionary;
        let index = match self.shared_index {
            Some(index) => index,
            None => self
                .index
                .get_or_init(|| DigestIndex::build(dictionary, self.oracle)),
        };
        index
            .position(digest)
            .and_then(|position| dictionary.get(position))
    }

    /// Returns the counters collected so far
    pub fn stats(&self) -> ResolveStats {
        ResolveStats {
            inline: self.counters.inline.load(Ordering::Relaxed),
            dictionary: self.counters.dictionary.load(Ordering::Relaxed),
            unresolved: self.counters.unresolved.load(Ordering::Relaxed),
            lookups: self.counters.lookups.load(Ordering::Relaxed),
        }
    }

    /// The dictionary being resolved against
    pub fn dictionary(&self) -> &'a CandidateDictionary {
        self.dictionary
    }
}
