//! String Interning Pool
//!
//! Deduplicated storage for element names, attribute names and values,
//! namespace URIs, and decoded text. Ids are stable `u32` indices; id 0 is
//! always the empty string.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// String interning pool
///
/// Memory layout:
/// - `entries`: (offset, len) into `data` for each interned string ID
/// - `data`: one buffer holding every distinct string
/// - `hash_index`: hash -> list of IDs (handles rare collisions)
#[derive(Debug, Clone)]
pub struct StringPool {
    entries: Vec<(u32, u32)>,
    data: String,
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    /// Create a new empty string pool
    pub fn new() -> Self {
        let mut pool = StringPool {
            entries: Vec::with_capacity(256),
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        };
        // Entry 0 is reserved for the empty string
        pool.entries.push((0, 0));
        pool
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning its id
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get(id) == s {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);

        let id = self.entries.len() as u32;
        self.entries.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Look up an already interned string without adding it
    pub fn find(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        self.hash_index
            .get(&Self::compute_hash(s))?
            .iter()
            .copied()
            .find(|&id| self.get(id) == s)
    }

    /// Get a string by id. Unknown ids resolve to the empty string.
    pub fn get(&self, id: u32) -> &str {
        match self.entries.get(id as usize) {
            Some(&(offset, len)) => {
                let start = offset as usize;
                self.data.get(start..start + len as usize).unwrap_or("")
            }
            None => "",
        }
    }

    /// Number of unique strings stored (including the empty string)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool holds only the empty string
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Total bytes used for string storage
    pub fn bytes_used(&self) -> usize {
        self.data.len()
    }
}
