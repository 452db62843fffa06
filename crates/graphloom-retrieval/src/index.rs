//! Embedding index: cosine math, the vector-config side-file, and the
//! cached document-embedding table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "data/graphloom/vector-config.json";

/// Scale to unit length; zero vectors stay zero.
pub fn normalize_vector(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Cosine similarity in double precision; zero when either side is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Map a published URL back onto its document id.
pub fn url_to_doc_id(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    let mut path = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches('/')
        .to_string();
    if let Some(stripped) = path.strip_suffix(".html") {
        path = format!("{stripped}/index");
    } else if path.ends_with("/index") {
        // already normalized
    } else if path.ends_with('/') {
        path.push_str("index");
    } else if !path.ends_with("index") {
        path.push_str("/index");
    }
    Some(path)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub name: String,
    pub embeddings_path: PathBuf,
    pub model: String,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexConfig {
    pub default_index: String,
    pub indexes: Vec<IndexDefinition>,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            default_index: "doc-default".to_string(),
            indexes: vec![IndexDefinition {
                name: "doc-default".to_string(),
                embeddings_path: PathBuf::from("data/graphloom/embeddings.json"),
                model: "all-MiniLM-L6-v2".to_string(),
                normalize: true,
                description: "default document embeddings".to_string(),
            }],
        }
    }
}

impl VectorIndexConfig {
    /// Load from JSON; a missing file is the default config.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed vector config {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("reading vector config {}", path.display()))
            }
        }
    }

    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|index| index.name == name)
    }
}

/// One embedded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub doc_id: Option<String>,
    pub url: String,
    pub title: Option<String>,
    pub lang: Option<String>,
    pub embedding: Vec<f32>,
}

/// The loaded embedding table for one index.
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    pub name: String,
    pub model: String,
    pub normalize: bool,
    pub entries: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsFile {
    #[serde(default)]
    items: Vec<EmbeddingsItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsItem {
    url: String,
    title: Option<String>,
    lang: Option<String>,
    #[serde(default)]
    embedding: Vec<f32>,
}

impl EmbeddingIndex {
    pub async fn load(definition: &IndexDefinition) -> Result<Self> {
        let raw = tokio::fs::read_to_string(&definition.embeddings_path)
            .await
            .with_context(|| {
                format!(
                    "reading embeddings file {}",
                    definition.embeddings_path.display()
                )
            })?;
        let file: EmbeddingsFile = serde_json::from_str(&raw).with_context(|| {
            format!(
                "malformed embeddings file {}",
                definition.embeddings_path.display()
            )
        })?;
        let entries = file
            .items
            .into_iter()
            .map(|item| {
                let mut embedding = item.embedding;
                if definition.normalize {
                    normalize_vector(&mut embedding);
                }
                IndexEntry {
                    doc_id: url_to_doc_id(&item.url),
                    url: item.url,
                    title: item.title,
                    lang: item.lang,
                    embedding,
                }
            })
            .collect();
        Ok(Self {
            name: definition.name.clone(),
            model: definition.model.clone(),
            normalize: definition.normalize,
            entries,
        })
    }

    pub fn from_entries(
        name: impl Into<String>,
        model: impl Into<String>,
        entries: Vec<IndexEntry>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            normalize: true,
            entries,
        }
    }
}

/// Per-run index cache; loaded once, reused for the process lifetime.
#[derive(Debug, Default)]
pub struct IndexCache {
    config: VectorIndexConfig,
    loaded: HashMap<String, EmbeddingIndex>,
}

impl IndexCache {
    pub fn new(config: VectorIndexConfig) -> Self {
        Self { config, loaded: HashMap::new() }
    }

    pub fn default_index_name(&self) -> &str {
        &self.config.default_index
    }

    pub async fn get(&mut self, name: &str) -> Result<&EmbeddingIndex> {
        if !self.loaded.contains_key(name) {
            let definition = self
                .config
                .index(name)
                .with_context(|| format!("unknown vector index: {name}"))?;
            let index = EmbeddingIndex::load(definition).await?;
            self.loaded.insert(name.to_string(), index);
        }
        Ok(&self.loaded[name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_is_symmetric_and_bounded() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        let c = vec![1.0f32, 0.0];
        assert!((cosine_similarity(&a, &b)).abs() < 1e-9);
        assert!((cosine_similarity(&a, &c) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn url_mapping_normalizes_variants() {
        assert_eq!(
            url_to_doc_id("https://example.com/zh/posts/a.html").as_deref(),
            Some("example.com/zh/posts/a/index")
        );
        assert_eq!(
            url_to_doc_id("/zh/posts/a/").as_deref(),
            Some("zh/posts/a/index")
        );
        assert_eq!(
            url_to_doc_id("zh/posts/a/index").as_deref(),
            Some("zh/posts/a/index")
        );
        assert_eq!(url_to_doc_id(""), None);
    }

    #[tokio::test]
    async fn index_loads_and_normalizes_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let embeddings = dir.path().join("embeddings.json");
        std::fs::write(
            &embeddings,
            serde_json::json!({
                "items": [
                    { "url": "/en/a/", "title": "A", "lang": "en", "embedding": [3.0, 4.0] }
                ]
            })
            .to_string(),
        )
        .unwrap();
        let definition = IndexDefinition {
            name: "test".into(),
            embeddings_path: embeddings,
            model: "mock".into(),
            normalize: true,
            description: String::new(),
        };
        let index = EmbeddingIndex::load(&definition).await.unwrap();
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.entries[0].doc_id.as_deref(), Some("en/a/index"));
        let norm: f32 = index.entries[0].embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }
}
