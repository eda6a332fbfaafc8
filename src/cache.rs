//! Result cache for repeated batch runs.
//!
//! The engine is deterministic: the same input bytes, budget and output
//! format always produce the same result. The batch driver uses this cache
//! to skip searches whose answer is already on disk; the engine itself never
//! sees it.
//!
//! ## Keys
//!
//! A [`CacheKey`] is the SHA-256 of the input bytes paired with the SHA-256 of
//! the budget and output format. Paths play no part in it, so renaming an
//! input keeps its result while editing the bytes or the budget does not.
//!
//! ## Entries
//!
//! Each key maps to a [`CachedResult`]: the output file name plus what the
//! search settled on (size, dimensions, quality) and the SHA-256 of the bytes
//! written. A lookup only succeeds when that file still exists with exactly
//! those bytes. When the same content is wanted under a new name the driver
//! copies the file.
//!
//! ## Storage
//!
//! `<output_dir>/.imgbudget-cache.json`, versioned. A missing, unreadable or
//! outdated file opens as an empty cache.

use crate::budget::CompressionBudget;
use crate::imaging::OutputFormat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_FILENAME: &str = ".imgbudget-cache.json";

/// Bump when the key derivation or the search policy changes.
const CACHE_VERSION: u32 = 3;

/// Identity of one compression: input content plus every parameter that
/// shapes the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: String,
    params: String,
}

impl CacheKey {
    pub fn new(input: &[u8], budget: &CompressionBudget, format: OutputFormat) -> Self {
        Self::from_parts(hash_bytes(input), hash_budget_params(budget, format))
    }

    pub fn from_parts(source: String, params: String) -> Self {
        Self { source, params }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.params)
    }
}

/// A result previously written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResult {
    /// File name relative to the output directory.
    pub output: String,
    pub bytes: u64,
    pub width: u32,
    pub height: u32,
    pub quality: u32,
    /// Hex SHA-256 of the output file.
    pub sha256: String,
}

/// Cache of results, keyed by [`CacheKey`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCache {
    version: u32,
    /// `"{source}:{params}"` → result. Ordered so the file diffs cleanly.
    results: BTreeMap<String, CachedResult>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            results: BTreeMap::new(),
        }
    }
}

impl ResultCache {
    /// Open the cache stored in `output_dir`, or start an empty one.
    pub fn open(output_dir: &Path) -> Self {
        std::fs::read_to_string(cache_path(output_dir))
            .ok()
            .and_then(|json| serde_json::from_str::<Self>(&json).ok())
            .filter(|cache| cache.version == CACHE_VERSION)
            .unwrap_or_default()
    }

    pub fn persist(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(cache_path(output_dir), json)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The stored result for `key`, if its file is still intact on disk.
    ///
    /// The returned `output` may differ from the name the caller wants now;
    /// copying is the caller's job.
    pub fn lookup(&self, key: &CacheKey, output_dir: &Path) -> Option<&CachedResult> {
        let result = self.results.get(&key.to_string())?;
        let on_disk = std::fs::read(output_dir.join(&result.output)).ok()?;
        (on_disk.len() as u64 == result.bytes && hash_bytes(&on_disk) == result.sha256)
            .then_some(result)
    }

    /// Record that `result.output` now holds the compression identified by `key`.
    ///
    /// Any other entry pointing at the same file is dropped, since the file
    /// was just overwritten.
    pub fn record(&mut self, key: &CacheKey, result: CachedResult) {
        let key = key.to_string();
        self.results
            .retain(|k, existing| *k == key || existing.output != result.output);
        self.results.insert(key, result);
    }

    /// Forget every result stored in `output`, which now holds something else.
    pub fn evict_output(&mut self, output: &str) {
        self.results.retain(|_, existing| existing.output != output);
    }
}

/// SHA-256 of raw input bytes, as hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of everything that shapes a compression result.
pub fn hash_budget_params(budget: &CompressionBudget, format: OutputFormat) -> String {
    let digest = Sha256::new()
        .chain_update(b"budget\0")
        .chain_update(budget.max_output_bytes().to_le_bytes())
        .chain_update(budget.max_dimension().to_le_bytes())
        .chain_update(budget.initial_quality().value().to_le_bytes())
        .chain_update(format.name().as_bytes())
        .finalize();
    format!("{:x}", digest)
}

/// Where the cache file lives for an output directory.
pub fn cache_path(output_dir: &Path) -> PathBuf {
    output_dir.join(CACHE_FILENAME)
}

/// How a batch used the cache.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Result already at the expected path.
    pub hits: u32,
    /// Result found under another name and copied.
    pub copies: u32,
    /// Searched from scratch.
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if self.hits > 0 {
            parts.push(format!("{} cached", self.hits));
        }
        if self.copies > 0 {
            parts.push(format!("{} copied", self.copies));
        }
        parts.push(format!("{} compressed", self.misses));
        write!(f, "{}", parts.join(", "))?;
        if parts.len() > 1 {
            write!(f, " ({} total)", self.total())?;
        }
        Ok(())
    }
}
