//! JSON side-file cache: `{normalizedKey: entry}`, human-editable.
//!
//! Loaded once at init, written at session end when dirty, keys sorted so
//! diffs stay reviewable. A missing file is an empty cache, not an error.

use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
    dirty: bool,
}

impl CacheStore {
    pub async fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, Value>>(&raw) {
                Ok(map) => map,
                Err(err) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("malformed cache file {}: {err}", path.display()),
                    ))
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err),
        };
        Ok(Self { path, entries, dirty: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, entry: Value) {
        self.entries.insert(key, entry);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the cache back if anything changed; returns the path written.
    pub async fn persist(&mut self) -> io::Result<Option<PathBuf>> {
        if !self.dirty {
            return Ok(None);
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_string_pretty(&self.entries)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        tokio::fs::write(&self.path, serialized).await?;
        self.dirty = false;
        Ok(Some(self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::load(dir.path().join("absent.json")).await.unwrap();
        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
    }

    #[tokio::test]
    async fn persist_round_trips_and_clears_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cache.json");
        let mut cache = CacheStore::load(&path).await.unwrap();
        cache.insert("beta".into(), json!({"type": "Tool"}));
        cache.insert("alpha".into(), json!({"type": "Person"}));
        assert!(cache.is_dirty());
        let written = cache.persist().await.unwrap();
        assert_eq!(written.as_deref(), Some(path.as_path()));
        assert!(!cache.is_dirty());
        assert!(cache.persist().await.unwrap().is_none());

        let reloaded = CacheStore::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("alpha").unwrap()["type"], "Person");

        // Keys come back sorted in the file.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.find("alpha").unwrap() < raw.find("beta").unwrap());
    }

    #[tokio::test]
    async fn malformed_cache_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(CacheStore::load(&path).await.is_err());
    }
}
