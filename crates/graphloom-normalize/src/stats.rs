//! Per-normalizer run statistics and the summary shape consumed by guards
//! and telemetry.

use crate::decision::{Decision, DecisionSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Samples kept per bucket for observability; the rest are dropped.
pub const MAX_SAMPLE_ITEMS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStats {
    pub total: u64,
    pub updated: u64,
    #[serde(default)]
    pub entities: u64,
    #[serde(default)]
    pub doc_roots: u64,
    #[serde(default)]
    pub relationships: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub alias: u64,
    pub cache: u64,
    pub llm: u64,
    pub fallback: u64,
    /// Decisions replayed from the in-session memo, counted in addition to
    /// their original source bucket.
    pub reuse: u64,
}

impl SourceStats {
    pub fn bump(&mut self, decision: &Decision) {
        match decision.source {
            DecisionSource::Alias => self.alias += 1,
            DecisionSource::Cache => self.cache += 1,
            DecisionSource::Llm => self.llm += 1,
            DecisionSource::Fallback => self.fallback += 1,
        }
        if decision.reused {
            self.reuse += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub path: Option<String>,
    pub size: usize,
    pub updated: bool,
    pub writes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmStats {
    pub attempts: u64,
    pub success: u64,
    pub failures: u64,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub disabled_reason: Option<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub updates: Vec<Value>,
    pub fallback: Vec<Value>,
    pub failures: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Updates,
    Fallback,
    Failures,
}

impl SampleStats {
    pub fn record(&mut self, kind: SampleKind, payload: Value) {
        let bucket = match kind {
            SampleKind::Updates => &mut self.updates,
            SampleKind::Fallback => &mut self.fallback,
            SampleKind::Failures => &mut self.failures,
        };
        if bucket.len() < MAX_SAMPLE_ITEMS {
            bucket.push(payload);
        }
    }
}

/// Everything a normalizer learned about itself in one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizerStats {
    pub enabled: bool,
    pub records: RecordStats,
    pub sources: SourceStats,
    pub cache: CacheStats,
    pub llm: LlmStats,
    pub samples: SampleStats,
}

/// A normalizer's summary tagged with its domain, as fed to guard
/// evaluation and appended to telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerSummary {
    pub domain: String,
    pub enabled: bool,
    pub records: RecordStats,
    pub sources: SourceStats,
    pub cache: CacheStats,
    pub llm: LlmStats,
    pub samples: SampleStats,
    pub alias_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn samples_cap_at_five() {
        let mut samples = SampleStats::default();
        for i in 0..8 {
            samples.record(SampleKind::Fallback, json!({ "i": i }));
        }
        assert_eq!(samples.fallback.len(), MAX_SAMPLE_ITEMS);
        assert!(samples.updates.is_empty());
    }

    #[test]
    fn bump_counts_reuse_separately() {
        let mut sources = SourceStats::default();
        let mut decision = Decision::fallback("Concept", "llm-unavailable");
        sources.bump(&decision);
        decision.reused = true;
        sources.bump(&decision);
        assert_eq!(sources.fallback, 2);
        assert_eq!(sources.reuse, 1);
        assert_eq!(sources.llm, 0);
    }
}
