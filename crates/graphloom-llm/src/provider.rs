//! Provider identities, settings, and the construction registry.

use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;
use async_trait::async_trait;
use graphloom_core::ClassifierError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Known LLM providers. DeepSeek speaks the OpenAI wire surface with a
/// different base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    DeepSeek,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Parse a comma-separated provider chain, deduplicated in order.
/// Unknown names are dropped; an empty result falls back to Gemini.
pub fn resolve_provider_chain(raw: &str) -> Vec<ProviderKind> {
    let mut chain = Vec::new();
    for token in raw.split(',') {
        if let Ok(kind) = token.parse::<ProviderKind>() {
            if !chain.contains(&kind) {
                chain.push(kind);
            }
        }
    }
    if chain.is_empty() {
        chain.push(ProviderKind::Gemini);
    }
    chain
}

/// Read the provider chain from the environment, most specific first.
pub fn provider_chain_from_env(override_value: Option<&str>) -> Vec<ProviderKind> {
    let raw = override_value
        .map(str::to_string)
        .or_else(|| std::env::var("GRAPHLOOM_PROVIDERS").ok())
        .or_else(|| std::env::var("GRAPHLOOM_PROVIDER").ok())
        .unwrap_or_else(|| "gemini".to_string());
    resolve_provider_chain(&raw)
}

/// One schema-constrained structured-output call.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;
    fn model_name(&self) -> &str;
    async fn invoke_structured(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> Result<Value, ClassifierError>;
}

/// Credentials and endpoints for every known provider; resolved once from
/// the environment and passed down (no module-level globals).
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub gemini_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub deepseek_base_url: Option<String>,
    pub deepseek_model: Option<String>,
}

impl ProviderSettings {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
        Self {
            gemini_api_key: var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
            gemini_base_url: var("GEMINI_API_BASE"),
            gemini_model: var("GEMINI_DEFAULT_MODEL"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_API_BASE"),
            openai_model: var("OPENAI_DEFAULT_MODEL"),
            deepseek_api_key: var("DEEPSEEK_API_KEY"),
            deepseek_base_url: var("DEEPSEEK_API_BASE"),
            deepseek_model: var("DEEPSEEK_MODEL"),
        }
    }
}

const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";
const DEEPSEEK_DEFAULT_BASE: &str = "https://api.deepseek.com/v1";

/// Maps a provider id to its constructor. Construction fails when the
/// required credentials are missing; callers walk the chain and keep the
/// first provider that builds.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    settings: ProviderSettings,
}

impl ProviderRegistry {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }

    pub fn from_env() -> Self {
        Self::new(ProviderSettings::from_env())
    }

    pub fn build(
        &self,
        kind: ProviderKind,
        requested_model: Option<&str>,
    ) -> Result<Box<dyn LlmProvider>, String> {
        let requested = requested_model.map(str::trim).filter(|model| !model.is_empty());
        match kind {
            ProviderKind::Gemini => {
                let api_key = self
                    .settings
                    .gemini_api_key
                    .clone()
                    .ok_or_else(|| "GEMINI_API_KEY or GOOGLE_API_KEY not set".to_string())?;
                let model = requested
                    .map(str::to_string)
                    .or_else(|| self.settings.gemini_model.clone())
                    .unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string());
                Ok(Box::new(GeminiProvider::new(
                    api_key,
                    model,
                    self.settings.gemini_base_url.clone(),
                )))
            }
            ProviderKind::OpenAi => {
                let api_key = self
                    .settings
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| "OPENAI_API_KEY not set".to_string())?;
                let model = requested
                    .map(str::to_string)
                    .or_else(|| self.settings.openai_model.clone())
                    .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string());
                Ok(Box::new(OpenAiProvider::new(
                    ProviderKind::OpenAi,
                    api_key,
                    model,
                    self.settings.openai_base_url.clone(),
                )))
            }
            ProviderKind::DeepSeek => {
                let api_key = self
                    .settings
                    .deepseek_api_key
                    .clone()
                    .ok_or_else(|| "DEEPSEEK_API_KEY not set".to_string())?;
                let model = requested
                    .map(str::to_string)
                    .or_else(|| self.settings.deepseek_model.clone())
                    .unwrap_or_else(|| DEEPSEEK_DEFAULT_MODEL.to_string());
                let base = self
                    .settings
                    .deepseek_base_url
                    .clone()
                    .unwrap_or_else(|| DEEPSEEK_DEFAULT_BASE.to_string());
                Ok(Box::new(OpenAiProvider::new(
                    ProviderKind::DeepSeek,
                    api_key,
                    model,
                    Some(base),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_parsing_dedupes_and_defaults() {
        assert_eq!(
            resolve_provider_chain("gemini, openai,gemini"),
            vec![ProviderKind::Gemini, ProviderKind::OpenAi]
        );
        assert_eq!(resolve_provider_chain(""), vec![ProviderKind::Gemini]);
        assert_eq!(resolve_provider_chain("bogus"), vec![ProviderKind::Gemini]);
        assert_eq!(
            resolve_provider_chain("DeepSeek"),
            vec![ProviderKind::DeepSeek]
        );
    }

    #[test]
    fn registry_requires_credentials() {
        let registry = ProviderRegistry::new(ProviderSettings::default());
        assert!(registry.build(ProviderKind::Gemini, None).is_err());
        assert!(registry.build(ProviderKind::OpenAi, None).is_err());

        let registry = ProviderRegistry::new(ProviderSettings {
            openai_api_key: Some("sk-test".into()),
            ..ProviderSettings::default()
        });
        let provider = registry.build(ProviderKind::OpenAi, Some("gpt-4o")).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o");
        assert_eq!(provider.kind(), ProviderKind::OpenAi);
    }
}
