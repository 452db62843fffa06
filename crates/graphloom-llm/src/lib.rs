//! LLM provider clients for graphloom.
//!
//! Providers hide behind the [`provider::LlmProvider`] strategy trait with
//! a registry mapping provider ids to constructors; the
//! [`classifier::ChainClassifier`] resolves a configured chain lazily and
//! reuses the first provider that builds. Transient failures (rate limits,
//! service unavailability) retry with exponential backoff and jitter up to
//! a fixed cap, then surface.

pub mod classifier;
pub mod embeddings;
pub mod gemini;
pub mod openai;
pub mod provider;
pub mod retry;

pub use classifier::ChainClassifier;
pub use embeddings::{l2_normalize, HttpEmbeddingProvider, MockEmbeddingProvider};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use provider::{
    provider_chain_from_env, resolve_provider_chain, LlmProvider, ProviderKind, ProviderRegistry,
    ProviderSettings,
};
