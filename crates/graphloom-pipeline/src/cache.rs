//! Ingest cache: per-document content hashes for changed-only runs.

use anyhow::{Context, Result};
use graphloom_core::NormalizedDoc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CACHE_FILE: &str = "data/graphloom/ingest-cache.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestCacheEntry {
    pub hash: String,
    pub locale: String,
    pub updated_at: Option<String>,
    pub written_at: String,
}

/// Gate decision for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDecision {
    pub process: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
pub struct IngestCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, IngestCacheEntry>,
}

impl IngestCache {
    /// A cache that never persists (`--no-cache`).
    pub fn disabled() -> Self {
        Self::default()
    }

    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed ingest cache {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("reading ingest cache {}", path.display()))
            }
        };
        Ok(Self { path: Some(path), entries })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A document is skipped on a changed-only run iff its current hash
    /// equals the cached hash.
    pub fn should_process(&self, doc: &NormalizedDoc, changed_only: bool) -> CacheDecision {
        if !changed_only {
            return CacheDecision { process: true, reason: None };
        }
        match self.entries.get(&doc.id) {
            None => CacheDecision {
                process: true,
                reason: Some("cache miss".to_string()),
            },
            Some(entry) if entry.hash != doc.hash => CacheDecision {
                process: true,
                reason: Some("content changed".to_string()),
            },
            Some(_) => CacheDecision {
                process: false,
                reason: Some("hash unchanged".to_string()),
            },
        }
    }

    pub fn update(&mut self, doc: &NormalizedDoc, written_at: &str) {
        self.entries.insert(
            doc.id.clone(),
            IngestCacheEntry {
                hash: doc.hash.clone(),
                locale: doc.locale.clone(),
                updated_at: doc.updated_at.map(|ts| ts.to_rfc3339()),
                written_at: written_at.to_string(),
            },
        );
    }

    /// Write the cache back; disabled caches are a no-op.
    pub async fn save(&self) -> Result<Option<PathBuf>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_string_pretty(&self.entries)?;
        tokio::fs::write(path, serialized)
            .await
            .with_context(|| format!("writing ingest cache {}", path.display()))?;
        Ok(Some(path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, hash: &str) -> NormalizedDoc {
        NormalizedDoc {
            id: id.into(),
            source_path: format!("/content/{id}.md"),
            relative_path: format!("{id}.md"),
            locale: "en".into(),
            title: "T".into(),
            description: "D".into(),
            categories: Vec::new(),
            tags: Vec::new(),
            updated_at: None,
            frontmatter: json!({}),
            chunks: Vec::new(),
            hash: hash.into(),
        }
    }

    #[tokio::test]
    async fn changed_only_gates_on_the_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingest-cache.json");
        let mut cache = IngestCache::load(&path).await.unwrap();

        let first = doc("en/a", "h1");
        assert_eq!(
            cache.should_process(&first, true).reason.as_deref(),
            Some("cache miss")
        );
        cache.update(&first, "2026-05-01T00:00:00Z");
        cache.save().await.unwrap();

        let reloaded = IngestCache::load(&path).await.unwrap();
        let unchanged = reloaded.should_process(&doc("en/a", "h1"), true);
        assert!(!unchanged.process);
        assert_eq!(unchanged.reason.as_deref(), Some("hash unchanged"));

        let changed = reloaded.should_process(&doc("en/a", "h2"), true);
        assert!(changed.process);
        assert_eq!(changed.reason.as_deref(), Some("content changed"));
    }

    #[tokio::test]
    async fn full_runs_always_process() {
        let cache = IngestCache::disabled();
        let decision = cache.should_process(&doc("en/a", "h1"), false);
        assert!(decision.process);
        assert!(decision.reason.is_none());
        assert!(cache.save().await.unwrap().is_none());
    }
}
