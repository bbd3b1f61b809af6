//! File-backed review preference storage.
//!
//! A single JSON file maps repository keys (`owner/name`) to review
//! priorities. The whole mapping is read on every `get` and
//! read-modified-written on every `set`; the last writer wins for the
//! whole file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Review preferences for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    /// User-declared review priorities, embedded verbatim in the prompt.
    pub priorities: String,
}

/// Whole-file key-value preference store.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the whole mapping. A missing backing file is an empty map;
    /// malformed content is an error for the current request only.
    fn load(&self) -> Result<BTreeMap<String, PreferenceRecord>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preferences file {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Malformed preferences file {}", self.path.display()))
    }

    /// Look up the preferences for a repository key.
    pub fn get(&self, key: &str) -> Result<Option<PreferenceRecord>> {
        Ok(self.load()?.remove(key))
    }

    /// Upsert the preferences for a repository key, rewriting the whole
    /// file.
    pub fn set(&self, key: &str, priorities: &str) -> Result<()> {
        let mut prefs = self.load()?;
        prefs.insert(
            key.to_string(),
            PreferenceRecord {
                priorities: priorities.to_string(),
            },
        );
        let pretty = serde_json::to_string_pretty(&prefs).context("Failed to serialize preferences")?;
        fs::write(&self.path, pretty)
            .with_context(|| format!("Failed to write preferences file {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> PreferenceStore {
        PreferenceStore::new(dir.path().join("user-preferences.json"))
    }

    #[test]
    fn test_missing_file_is_absent_for_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.get("acme/infra").unwrap().is_none());
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.set("acme/infra", "cost and security").unwrap();
        let record = store.get("acme/infra").unwrap().unwrap();
        assert_eq!(record.priorities, "cost and security");
        assert!(store.get("acme/other").unwrap().is_none());
    }

    #[test]
    fn test_idempotent_upsert_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.set("a/b", "p1").unwrap();
        store.set("a/b", "p2").unwrap();

        let raw = fs::read_to_string(dir.path().join("user-preferences.json")).unwrap();
        let prefs: BTreeMap<String, PreferenceRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs["a/b"].priorities, "p2");
    }

    #[test]
    fn test_set_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.set("a/b", "cost").unwrap();
        store.set("c/d", "security").unwrap();

        assert_eq!(store.get("a/b").unwrap().unwrap().priorities, "cost");
        assert_eq!(store.get("c/d").unwrap().unwrap().priorities, "security");
    }

    #[test]
    fn test_malformed_file_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user-preferences.json");
        fs::write(&path, "not json").unwrap();

        let store = PreferenceStore::new(&path);
        assert!(store.get("a/b").is_err());
        assert!(store.set("a/b", "p").is_err());
    }

    #[test]
    fn test_file_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.set("a/b", "cost").unwrap();
        let raw = fs::read_to_string(dir.path().join("user-preferences.json")).unwrap();
        assert!(raw.contains('\n'));
    }
}
