//! Resolution decisions and their provenance.

use serde::{Deserialize, Serialize};

/// Which tier produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    /// Curated alias table; highest priority, never calls the classifier.
    Alias,
    /// Persistent JSON cache from a previous session.
    Cache,
    /// Live classifier call this session.
    Llm,
    /// Degraded: the original value was kept.
    Fallback,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::Cache => "cache",
            Self::Llm => "llm",
            Self::Fallback => "fallback",
        }
    }
}

/// Outcome of resolving one raw label.
///
/// Once a key resolves, the same decision is replayed (`reused = true`) for
/// every later occurrence in the session; a cached decision is never
/// re-escalated to the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Canonical value (entity type, relation label, or property key).
    pub value: String,
    pub source: DecisionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// True when replayed from the in-session memo.
    #[serde(default)]
    pub reused: bool,
}

impl Decision {
    pub fn fallback(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source: DecisionSource::Fallback,
            reason: Some(reason.into()),
            provider: None,
            model: None,
            reused: false,
        }
    }
}
