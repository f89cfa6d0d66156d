//! Response cache module
//!
//! This module provides a persistent URL → response body cache backed by a
//! single JSON file. Entries are never expired; every insertion rewrites the
//! whole file so the cache on disk always mirrors the one in memory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to create the directory holding the cache file
    #[error("Failed to create cache directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read the cache file
    #[error("Failed to read cache file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the cache file
    #[error("Failed to write cache file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize the cache file
    #[error("Failed to deserialize cache file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize the cache contents
    #[error("Failed to serialize cache: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Outcome of loading the cache file from disk
///
/// A cache that could not be read is never an error for the caller: it is
/// reported as `Recovered` and treated exactly like a cold start.
#[derive(Debug)]
pub enum CacheLoad {
    /// The file was read and parsed successfully
    Loaded(BTreeMap<String, String>),
    /// There was no cache file yet
    Missing,
    /// The file exists but could not be used; the cache starts empty
    Recovered { reason: CacheError },
}

impl CacheLoad {
    /// Consumes the outcome, yielding the entries to start with
    pub fn into_entries(self) -> BTreeMap<String, String> {
        match self {
            CacheLoad::Loaded(entries) => entries,
            CacheLoad::Missing | CacheLoad::Recovered { .. } => BTreeMap::new(),
        }
    }
}

/// Persistent mapping from request URL to raw response body
#[derive(Debug)]
pub struct CacheStore {
    /// Location of the JSON cache file
    path: PathBuf,
    /// In-memory copy of every cached response
    entries: BTreeMap<String, String>,
}

impl CacheStore {
    /// Opens the cache stored at `path`
    ///
    /// Missing, unreadable or malformed cache files yield an empty cache.
    /// The file itself is left untouched until the first `put`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match Self::load_all(&path) {
            CacheLoad::Loaded(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "loaded response cache");
                entries
            }
            CacheLoad::Missing => {
                debug!(path = %path.display(), "no response cache yet, starting empty");
                BTreeMap::new()
            }
            CacheLoad::Recovered { reason } => {
                warn!(path = %path.display(), "ignoring unusable response cache: {reason}");
                BTreeMap::new()
            }
        };

        Self { path, entries }
    }

    /// Reads and parses the whole cache file
    pub fn load_all(path: &Path) -> CacheLoad {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheLoad::Missing,
            Err(e) => {
                return CacheLoad::Recovered {
                    reason: CacheError::ReadFailed {
                        path: path.to_path_buf(),
                        source: e,
                    },
                };
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => CacheLoad::Loaded(entries),
            Err(e) => CacheLoad::Recovered {
                reason: CacheError::DeserializationFailed {
                    path: path.to_path_buf(),
                    source: e,
                },
            },
        }
    }

    /// Returns the cached body for `url`, if any
    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    /// Stores `body` under `url` and immediately rewrites the cache file
    ///
    /// If the file cannot be written the entry is rolled back, so memory
    /// never holds a response the file lacks.
    pub fn put(&mut self, url: &str, body: String) -> Result<(), CacheError> {
        let previous = self.entries.insert(url.to_string(), body);

        if let Err(e) = self.persist() {
            match previous {
                Some(old) => self.entries.insert(url.to_string(), old),
                None => self.entries.remove(url),
            };
            return Err(e);
        }

        Ok(())
    }

    /// Rewrites the entire cache file from the in-memory entries
    ///
    /// The data is written to a sibling `.tmp` file first and then renamed
    /// over the cache file.
    pub fn persist(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CacheError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string(&self.entries)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(|e| CacheError::WriteFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| CacheError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }

    /// Number of cached responses
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no responses
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = CacheStore::open(&path);
        assert!(cache.is_empty());
        cache
            .put("https://example.com/a", "<html>body</html>".to_string())
            .unwrap();
        drop(cache);

        let reopened = CacheStore::open(&path);
        assert_eq!(reopened.get("https://example.com/a"), Some("<html>body</html>"));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_corrupted_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ this is not json").unwrap();

        assert!(matches!(
            CacheStore::load_all(&path),
            CacheLoad::Recovered {
                reason: CacheError::DeserializationFailed { .. }
            }
        ));

        let cache = CacheStore::open(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_file_is_reported_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");

        assert!(matches!(CacheStore::load_all(&path), CacheLoad::Missing));
        assert!(!path.exists());
    }

    #[test]
    fn test_wrong_json_shape_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let load = CacheStore::load_all(&path);
        assert!(matches!(load, CacheLoad::Recovered { .. }));
        assert!(load.into_entries().is_empty());
    }

    #[test]
    fn test_put_rewrites_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let mut cache = CacheStore::open(&path);
        cache.put("u1", "one".to_string()).unwrap();
        cache.put("u2", "two".to_string()).unwrap();

        let on_disk = match CacheStore::load_all(&path) {
            CacheLoad::Loaded(entries) => entries,
            other => panic!("expected loaded cache, got {:?}", other),
        };
        assert_eq!(on_disk.len(), 2);
        assert_eq!(on_disk["u1"], "one");
        assert_eq!(on_disk["u2"], "two");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_is_a_plain_json_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = CacheStore::open(&path);
        cache.put("https://x/?t=a+b", "{\"Response\":\"False\"}".to_string()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["https://x/?t=a+b"], "{\"Response\":\"False\"}");
    }

    #[test]
    fn test_failed_write_leaves_no_entry_behind() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a regular file").unwrap();

        let mut cache = CacheStore::open(blocker.join("cache.json"));
        let err = cache.put("u", "x".to_string()).unwrap_err();

        assert!(matches!(err, CacheError::DirectoryCreationFailed { .. }));
        assert_eq!(cache.get("u"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_overwrite_keeps_previous_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = CacheStore::open(&path);
        cache.put("u", "old".to_string()).unwrap();

        // A directory in place of the temp file makes the write fail
        fs::create_dir(path.with_extension("tmp")).unwrap();
        assert!(cache.put("u", "new".to_string()).is_err());

        assert_eq!(cache.get("u"), Some("old"));
    }
}
