//! Candidate dictionary of known names.
//!
//! An insertion-ordered, duplicate-free set of strings that digest-only
//! symbols are matched against. It only ever grows during a run.

use crate::error::{Error, Result};
use crate::schema::BASE_FIELDS;
use indexmap::IndexSet;
use std::path::Path;
use tracing::debug;

/// Ordered set of candidate names
#[derive(Debug, Clone, Default)]
pub struct CandidateDictionary {
    names: IndexSet<String>,
}

impl CandidateDictionary {
    /// Creates an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dictionary seeded with the base entity field names
    ///
    /// Scenes store those names as digests too, so they are always worth trying.
    pub fn with_base_fields() -> Self {
        BASE_FIELDS.iter().copied().collect()
    }

    /// Adds a single name, returning true if it was not present yet
    pub fn add(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Merges names in order, ignoring ones already present
    ///
    /// Returns the number of names that were new.
    pub fn add_all<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.names.len();
        self.names.extend(names.into_iter().map(Into::into));
        let added = self.names.len() - before;
        debug!("Added {} new candidates ({} total)", added, self.names.len());
        added
    }

    /// Merges the names of a word list: one per line, blank lines and `#` comments skipped
    pub fn add_word_list(&mut self, contents: &str) -> usize {
        self.add_all(parse_word_list(contents))
    }

    /// Reads a word list file and merges it
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Ok(self.add_word_list(&contents))
    }

    /// Iterates the names in insertion order
    pub fn all(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }

    /// Returns the name at the given scan position
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get_index(index).map(String::as_str)
    }

    /// Returns the scan position of a name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    /// Returns true if the name is present
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if there are no names
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CandidateDictionary {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut dictionary = Self::new();
        dictionary.add_all(iter);
        dictionary
    }
}

/// Split word list text into names
pub fn parse_word_list(contents: &str) -> impl Iterator<Item = &str> + '_ {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}
