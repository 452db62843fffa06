//! Embedding providers: an OpenAI-compatible HTTP backend and a
//! deterministic mock for tests and offline runs.

use crate::gemini::classify_status;
use async_trait::async_trait;
use graphloom_core::traits::EmbeddingProvider;
use graphloom_core::EmbeddingError;
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Scale a vector to unit length in place; zero vectors are left as-is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// OpenAI-compatible `/embeddings` backend.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        dimensions: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "input": [text] }))
            .timeout(REQUEST_TIMEOUT);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|err| EmbeddingError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Http(classify_status(status, text).to_string()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| EmbeddingError::InvalidResponse(err.to_string()))?;
        let raw = payload
            .pointer("/data/0/embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| EmbeddingError::InvalidResponse("missing embedding".to_string()))?;
        let mut vector: Vec<f32> = raw
            .iter()
            .filter_map(Value::as_f64)
            .map(|value| value as f32)
            .collect();
        if vector.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()));
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Deterministic hash-seeded embeddings; identical text always embeds to
/// the same unit vector, so similarity tests are reproducible.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::with_dimensions(384)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = Vec::with_capacity(self.dimensions);
        let mut state = {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            hasher.finish()
        };
        for _ in 0..self.dimensions {
            // xorshift keeps the sequence cheap and fully determined by the seed
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            vector.push(((state % 2000) as f32 / 1000.0) - 1.0);
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic_and_normalized() {
        let provider = MockEmbeddingProvider::with_dimensions(64);
        let a = provider.embed("hello world").await.unwrap();
        let b = provider.embed("hello world").await.unwrap();
        let c = provider.embed("something else").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn l2_normalize_handles_zero_vectors() {
        let mut zeros = vec![0.0f32; 4];
        l2_normalize(&mut zeros);
        assert_eq!(zeros, vec![0.0; 4]);
    }
}
