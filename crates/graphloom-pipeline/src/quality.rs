//! Quality gate: required front-matter fields, tag cap, blacklist
//! patterns, and PII masking, with a JSONL audit log.

use anyhow::{Context, Result};
use chrono::Utc;
use graphloom_core::NormalizedDoc;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const REDACTION_TOKEN: &str = "[REDACTED]";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QualityConfig {
    pub required_fields: Vec<String>,
    pub blacklist_patterns: Vec<String>,
    pub pii_patterns: BTreeMap<String, String>,
    pub max_tag_count: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            required_fields: ["title", "description", "updatedAt", "categories"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            blacklist_patterns: Vec::new(),
            pii_patterns: BTreeMap::new(),
            max_tag_count: 10,
        }
    }
}

impl QualityConfig {
    /// Load from a JSON file; a missing file is the default config.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed quality config {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("reading quality config {}", path.display()))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityOutcome {
    pub passed: bool,
    pub errors: Vec<QualityIssue>,
    pub warnings: Vec<QualityIssue>,
}

pub struct QualityChecker {
    config: QualityConfig,
    blacklist: Vec<regex::Regex>,
    pii: Vec<(String, regex::Regex)>,
    log_path: PathBuf,
}

impl QualityChecker {
    pub fn new(config: QualityConfig, log_path: PathBuf) -> Result<Self> {
        let blacklist = config
            .blacklist_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("invalid blacklist pattern {pattern}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let pii = config
            .pii_patterns
            .iter()
            .map(|(name, pattern)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (name.clone(), regex))
                    .with_context(|| format!("invalid pii pattern {name}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config, blacklist, pii, log_path })
    }

    pub async fn load(config_path: &Path, log_path: PathBuf) -> Result<Self> {
        let config = QualityConfig::load(config_path).await?;
        Self::new(config, log_path)
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Check one document. PII masking mutates chunk text in place and is
    /// a warning; everything else that trips is a hard failure. Every
    /// outcome is appended to the JSONL audit log.
    pub async fn check(&self, doc: &mut NormalizedDoc) -> Result<QualityOutcome> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for field in &self.config.required_fields {
            let missing = match field.as_str() {
                "categories" => doc.categories.is_empty(),
                "tags" => doc.tags.is_empty(),
                "title" => doc.title.trim().is_empty(),
                "description" => doc.description.trim().is_empty(),
                "updatedAt" | "updated_at" => doc.updated_at.is_none(),
                other => doc
                    .frontmatter
                    .get(other)
                    .map(|value| value.is_null())
                    .unwrap_or(true),
            };
            if missing {
                errors.push(QualityIssue {
                    kind: "FRONTMATTER_MISSING".into(),
                    message: format!("field {field} is missing"),
                });
            }
        }

        if self.config.max_tag_count > 0 && doc.tags.len() > self.config.max_tag_count {
            errors.push(QualityIssue {
                kind: "TAG_LIMIT_EXCEEDED".into(),
                message: format!(
                    "tag count {} exceeds limit {}",
                    doc.tags.len(),
                    self.config.max_tag_count
                ),
            });
        }

        for regex in &self.blacklist {
            if let Some(chunk) = doc.chunks.iter().find(|chunk| regex.is_match(&chunk.text)) {
                errors.push(QualityIssue {
                    kind: "BLACKLIST_MATCH".into(),
                    message: format!(
                        "chunk {} matches blacklist pattern {}",
                        chunk.id,
                        regex.as_str()
                    ),
                });
            }
        }

        for (name, regex) in &self.pii {
            for chunk in &mut doc.chunks {
                let replaced = regex.replace_all(&chunk.text, REDACTION_TOKEN);
                if replaced != chunk.text {
                    chunk.text = replaced.into_owned();
                    warnings.push(QualityIssue {
                        kind: "PII_MASKED".into(),
                        message: format!("chunk {} matched pii pattern {name}, masked", chunk.id),
                    });
                }
            }
        }

        let outcome = QualityOutcome {
            passed: errors.is_empty(),
            errors,
            warnings,
        };
        self.log_outcome(doc, &outcome).await?;
        Ok(outcome)
    }

    async fn log_outcome(&self, doc: &NormalizedDoc, outcome: &QualityOutcome) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let event = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "doc_id": doc.id,
            "passed": outcome.passed,
            "errors": outcome.errors,
            "warnings": outcome.warnings,
        });
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .with_context(|| format!("opening quality log {}", self.log_path.display()))?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphloom_core::document::{Chunk, TagRef};
    use serde_json::json as j;

    fn doc_with(chunk_text: &str, tags: usize) -> NormalizedDoc {
        NormalizedDoc {
            id: "en/test".into(),
            source_path: "/content/en/test.md".into(),
            relative_path: "en/test.md".into(),
            locale: "en".into(),
            title: "Title".into(),
            description: "Description".into(),
            categories: vec![graphloom_core::document::CategoryRef {
                name: "AI".into(),
                slug: "ai".into(),
            }],
            tags: (0..tags)
                .map(|i| TagRef { name: format!("t{i}"), slug: format!("t{i}") })
                .collect(),
            updated_at: Some(Utc::now()),
            frontmatter: j!({}),
            chunks: vec![Chunk { id: "en/test#001".into(), order: 1, text: chunk_text.into() }],
            hash: "h".into(),
        }
    }

    fn checker(config: QualityConfig, dir: &Path) -> QualityChecker {
        QualityChecker::new(config, dir.join("quality-log.jsonl")).unwrap()
    }

    #[tokio::test]
    async fn passes_a_complete_document() {
        let dir = tempfile::tempdir().unwrap();
        let checker = checker(QualityConfig::default(), dir.path());
        let mut doc = doc_with("clean text", 2);
        let outcome = checker.check(&mut doc).await.unwrap();
        assert!(outcome.passed);
        assert!(outcome.errors.is_empty());
        // The audit log got one line.
        let log = std::fs::read_to_string(dir.path().join("quality-log.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[tokio::test]
    async fn missing_required_fields_fail() {
        let dir = tempfile::tempdir().unwrap();
        let checker = checker(QualityConfig::default(), dir.path());
        let mut doc = doc_with("text", 1);
        doc.title.clear();
        doc.updated_at = None;
        let outcome = checker.check(&mut doc).await.unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.errors.len(), 2);
    }

    #[tokio::test]
    async fn tag_cap_and_blacklist_are_hard_failures() {
        let dir = tempfile::tempdir().unwrap();
        let config = QualityConfig {
            max_tag_count: 3,
            blacklist_patterns: vec!["forbidden".into()],
            ..QualityConfig::default()
        };
        let checker = checker(config, dir.path());
        let mut doc = doc_with("this text is FORBIDDEN here", 5);
        let outcome = checker.check(&mut doc).await.unwrap();
        assert!(!outcome.passed);
        let kinds: Vec<&str> = outcome.errors.iter().map(|e| e.kind.as_str()).collect();
        assert!(kinds.contains(&"TAG_LIMIT_EXCEEDED"));
        assert!(kinds.contains(&"BLACKLIST_MATCH"));
    }

    #[tokio::test]
    async fn pii_is_masked_as_a_warning_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = QualityConfig {
            pii_patterns: [("email".to_string(), r"[\w.]+@[\w.]+".to_string())]
                .into_iter()
                .collect(),
            ..QualityConfig::default()
        };
        let checker = checker(config, dir.path());
        let mut doc = doc_with("contact me at someone@example.com please", 1);
        let outcome = checker.check(&mut doc).await.unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(doc.chunks[0].text, format!("contact me at {REDACTION_TOKEN} please"));
    }
}
