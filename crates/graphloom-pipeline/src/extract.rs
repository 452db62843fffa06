//! Extraction adapters behind the [`Extractor`] capability.

use async_trait::async_trait;
use graphloom_core::graph::{Diagnostic, DiagnosticLevel};
use graphloom_core::traits::Extractor;
use graphloom_core::{ExtractError, ExtractionResult, NormalizedDoc};

/// Default adapter: extracts nothing, by design. Real NER/LLM adapters
/// plug in through the same trait.
pub struct PlaceholderExtractor;

#[async_trait]
impl Extractor for PlaceholderExtractor {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn extract(&self, _doc: &NormalizedDoc) -> Result<ExtractionResult, ExtractError> {
        Ok(ExtractionResult {
            diagnostics: vec![Diagnostic {
                level: DiagnosticLevel::Info,
                message: "placeholder extractor returned empty collections".to_string(),
            }],
            ..ExtractionResult::default()
        })
    }
}

/// Resolve an adapter by name. `_model` is forwarded to adapters that
/// load one; the placeholder ignores it.
pub fn create_extractor(
    name: &str,
    _model: Option<&str>,
) -> Result<Box<dyn Extractor>, ExtractError> {
    match name.trim().to_lowercase().as_str() {
        "" | "placeholder" => Ok(Box::new(PlaceholderExtractor)),
        other => Err(ExtractError::UnknownAdapter(other.to_string())),
    }
}
