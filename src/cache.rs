//! Flat-file translation cache.
//!
//! A mapping from normalized source text to the translated string, persisted
//! as a single human-readable JSON document. The file is replaced atomically
//! on every flush so a crash mid-write never corrupts prior entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, HanvietError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub translation: String,
    /// Unix seconds at insertion time
    pub cached_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub file_size_bytes: u64,
    pub file_exists: bool,
}

/// Keys are the trimmed source text, matched exactly. No fuzzy lookup.
pub fn normalize_key(text: &str) -> &str {
    text.trim()
}

pub struct TranslationCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl TranslationCache {
    /// Load the cache from disk. A missing file starts empty; a corrupt file
    /// is logged and also starts empty rather than failing the process.
    pub fn load<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&content) {
                Ok(entries) => {
                    info!("Loaded {} cached translations from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    warn!(
                        "Translation cache {} is corrupt ({}), starting empty",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Self { path, entries }
    }

    pub fn get(&self, text: &str) -> Option<&str> {
        self.entries
            .get(normalize_key(text))
            .map(|entry| entry.translation.as_str())
    }

    /// Insert or overwrite an entry and persist the full mapping before
    /// returning. The in-memory map is updated even if the flush fails.
    pub fn put(&mut self, text: &str, translation: &str) -> Result<()> {
        let key = normalize_key(text).to_string();
        self.entries.insert(
            key,
            CacheEntry {
                translation: translation.to_string(),
                cached_at: chrono::Utc::now().timestamp(),
            },
        );
        self.flush()
    }

    /// Write the full mapping atomically: serialize to a temporary file in
    /// the target directory, then rename over the cache file.
    pub fn flush(&self) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let content = serde_json::to_string_pretty(&self.entries)?;

        let tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| HanvietError::Cache(format!("Failed to create temp cache file: {}", e)))?;
        std::fs::write(tmp.path(), content)?;
        tmp.persist(&self.path)
            .map_err(|e| HanvietError::Cache(format!("Failed to replace cache file: {}", e)))?;

        debug!("Flushed {} cache entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    /// Empty the mapping and persist the empty state. Idempotent.
    pub fn clear(&mut self) -> Result<usize> {
        let removed = self.entries.len();
        self.entries.clear();
        self.flush()?;
        if removed > 0 {
            info!("Cleared {} cached translations", removed);
        }
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        let file_size_bytes = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .unwrap_or(0);
        CacheStats {
            entries: self.entries.len(),
            file_size_bytes,
            file_exists: self.path.exists(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
