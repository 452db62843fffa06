//! Process-wide wiring: store, classifier, embedder, normalizers.
//!
//! Everything is constructed once per invocation and passed down; no
//! module-level globals.

use anyhow::{Context, Result};
use graphloom_core::traits::{Classifier, EmbeddingProvider};
use graphloom_graph::MemoryGraphStore;
use graphloom_llm::{
    provider_chain_from_env, ChainClassifier, HttpEmbeddingProvider, MockEmbeddingProvider,
    ProviderRegistry,
};
use graphloom_normalize::{EntityTypeNormalizer, PropertyNormalizer, RelationshipTypeNormalizer};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|value| value == "1").unwrap_or(false)
}

/// Open the snapshot-backed store. In write mode the snapshot location
/// must be usable up front; failing fast here keeps a misconfigured run
/// from doing any work.
pub fn open_store(path: &Path, writable: bool) -> Result<Arc<MemoryGraphStore>> {
    if writable {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("store location {} is not writable", parent.display()))?;
        }
    }
    let store = MemoryGraphStore::load_snapshot(path)
        .with_context(|| format!("loading graph snapshot {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Shared classifier for all normalizers, honoring the provider chain
/// from the environment. `None` when normalization is globally disabled.
pub fn build_classifier(model: Option<&str>) -> Arc<dyn Classifier> {
    let chain = provider_chain_from_env(None);
    Arc::new(ChainClassifier::new(
        chain,
        model.map(str::to_string),
        ProviderRegistry::from_env(),
    ))
}

/// The question embedder: an OpenAI-compatible endpoint when configured,
/// otherwise the deterministic mock (useful offline and in tests).
pub fn build_embedder() -> Arc<dyn EmbeddingProvider> {
    match std::env::var("GRAPHLOOM_EMBEDDINGS_BASE_URL") {
        Ok(base_url) if !base_url.is_empty() => {
            let api_key = std::env::var("GRAPHLOOM_EMBEDDINGS_API_KEY").ok();
            let model = std::env::var("GRAPHLOOM_EMBEDDINGS_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string());
            let dimensions = std::env::var("GRAPHLOOM_EMBEDDINGS_DIMENSIONS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(384);
            Arc::new(HttpEmbeddingProvider::new(base_url, api_key, model, dimensions))
        }
        _ => {
            warn!("GRAPHLOOM_EMBEDDINGS_BASE_URL not set, using the mock embedder");
            Arc::new(MockEmbeddingProvider::default())
        }
    }
}

pub struct Normalizers {
    pub entity_types: EntityTypeNormalizer,
    pub relation_types: RelationshipTypeNormalizer,
    pub properties: PropertyNormalizer,
}

/// Build the three normalizers with their side-files under `data_root`,
/// honoring the per-domain disable switches.
pub async fn build_normalizers(
    data_root: &Path,
    classifier: Arc<dyn Classifier>,
) -> Result<Normalizers> {
    let entity_enabled = !env_flag("GRAPHLOOM_TYPE_NORMALIZER_DISABLE");
    let relation_enabled = !env_flag("GRAPHLOOM_RELATION_NORMALIZER_DISABLE");
    let property_enabled = !env_flag("GRAPHLOOM_OBJECT_NORMALIZER_DISABLE");

    let entity_types = EntityTypeNormalizer::init(
        EntityTypeNormalizer::default_options(data_root, entity_enabled),
        Some(classifier.clone()),
    )
    .await
    .context("initializing the entity-type normalizer")?;
    let relation_types = RelationshipTypeNormalizer::init(
        RelationshipTypeNormalizer::default_options(data_root, relation_enabled),
        Some(classifier.clone()),
    )
    .await
    .context("initializing the relationship-type normalizer")?;
    let properties = PropertyNormalizer::init(
        PropertyNormalizer::default_options(data_root, property_enabled),
        Some(classifier),
    )
    .await
    .context("initializing the property normalizer")?;

    Ok(Normalizers { entity_types, relation_types, properties })
}
