//! Bidirectional token/word index.

use crate::error::{DictionaryError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dense mapping between string entries and integer indices.
///
/// Several entries may share one index (aliases); the first entry added for an
/// index is the one returned by [`TokenIndex::entry`]. When a default index is
/// set, lookups of unknown entries resolve to it instead of failing.
#[derive(Clone, Debug, Default)]
pub struct TokenIndex {
    entry_to_index: HashMap<String, usize>,
    index_to_entry: HashMap<usize, String>,
    default_index: Option<usize>,
}

impl TokenIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an index from a reader.
    ///
    /// Each non-empty line lists one or more whitespace-separated aliases that
    /// all map to the next free index.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut index = Self::new();

        for line in reader.lines() {
            let line = line?;
            let mut aliases = line.split_whitespace().peekable();
            if aliases.peek().is_none() {
                continue;
            }

            let next = index.index_size();
            for alias in aliases {
                index.add_entry_with_index(alias, next)?;
            }
        }

        Ok(index)
    }

    /// Load an index from a file, one entry (or alias group) per line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Add an entry at the next free index, returning its index.
    ///
    /// Re-adding an existing entry returns the existing index.
    pub fn add_entry(&mut self, entry: &str) -> usize {
        if let Some(&index) = self.entry_to_index.get(entry) {
            return index;
        }

        let index = self.index_size();
        self.entry_to_index.insert(entry.to_string(), index);
        self.index_to_entry.insert(index, entry.to_string());
        index
    }

    /// Add an entry at a given index.
    ///
    /// Fails if the entry is already present, at any index.
    pub fn add_entry_with_index(&mut self, entry: &str, index: usize) -> Result<()> {
        if let Some(&existing) = self.entry_to_index.get(entry) {
            return Err(DictionaryError::DuplicateEntry {
                entry: entry.to_string(),
                index: existing,
            }
            .into());
        }

        self.entry_to_index.insert(entry.to_string(), index);
        self.index_to_entry
            .entry(index)
            .or_insert_with(|| entry.to_string());
        Ok(())
    }

    /// Look up the entry for an index.
    pub fn entry(&self, index: usize) -> Result<&str> {
        self.index_to_entry
            .get(&index)
            .map(String::as_str)
            .ok_or_else(|| DictionaryError::InvalidIndex(index).into())
    }

    /// Look up the index of an entry, falling back to the default index.
    pub fn index(&self, entry: &str) -> Result<usize> {
        self.entry_to_index
            .get(entry)
            .copied()
            .or(self.default_index)
            .ok_or_else(|| DictionaryError::UnknownEntry(entry.to_string()).into())
    }

    /// Whether the entry is present (ignores the default index).
    pub fn contains(&self, entry: &str) -> bool {
        self.entry_to_index.contains_key(entry)
    }

    /// Set the index returned for unknown entries.
    pub fn set_default_index(&mut self, index: usize) {
        self.default_index = Some(index);
    }

    pub fn default_index(&self) -> Option<usize> {
        self.default_index
    }

    /// Number of entries, aliases included.
    pub fn entry_size(&self) -> usize {
        self.entry_to_index.len()
    }

    /// Number of distinct indices.
    pub fn index_size(&self) -> usize {
        self.index_to_entry.len()
    }

    /// Whether indices are exactly `0..index_size()`.
    pub fn is_contiguous(&self) -> bool {
        (0..self.index_size()).all(|i| self.index_to_entry.contains_key(&i))
            && self.entry_to_index.values().all(|&i| i < self.index_size())
    }

    /// Iterate `(entry, index)` pairs, aliases included, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entry_to_index.iter().map(|(e, &i)| (e.as_str(), i))
    }

    pub fn map_entries_to_indices<S: AsRef<str>>(&self, entries: &[S]) -> Result<Vec<usize>> {
        entries.iter().map(|e| self.index(e.as_ref())).collect()
    }

    pub fn map_indices_to_entries(&self, indices: &[usize]) -> Result<Vec<String>> {
        indices
            .iter()
            .map(|&i| self.entry(i).map(str::to_string))
            .collect()
    }
}
