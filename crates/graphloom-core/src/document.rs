//! Document shapes: raw collected files and their normalized form.

use crate::hashing::content_hash;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// A file as collected from the content root, front-matter split but not
/// yet interpreted.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Absolute path on disk.
    pub source_path: String,
    /// Path relative to the content root, forward slashes.
    pub relative_path: String,
    /// First path segment, or `default` for root-level files.
    pub locale: String,
    /// Parsed YAML front-matter as JSON.
    pub frontmatter: Value,
    /// Markdown body without front-matter.
    pub content: String,
}

/// Category or tag reference derived from front-matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

/// Same shape as [`CategoryRef`]; separate type keeps payload fields honest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub name: String,
    pub slug: String,
}

/// Paragraph-level chunk of a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `docId#NNN`, 1-based, zero-padded.
    pub id: String,
    pub order: usize,
    pub text: String,
}

/// A document with derived identity, metadata, chunks, and content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedDoc {
    pub id: String,
    pub source_path: String,
    pub relative_path: String,
    pub locale: String,
    pub title: String,
    pub description: String,
    pub categories: Vec<CategoryRef>,
    pub tags: Vec<TagRef>,
    pub updated_at: Option<DateTime<Utc>>,
    pub frontmatter: Value,
    pub chunks: Vec<Chunk>,
    pub hash: String,
}

static SLUG_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[。！？.!?]").unwrap());

/// Lowercase, hyphen-joined slug for category/tag names.
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    SLUG_STRIP
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// First sentence of the body, capped at 280 characters; used as the
/// description when front-matter provides none.
pub fn first_sentence(content: &str) -> String {
    let paragraph = match content
        .split("\n\n")
        .map(str::trim)
        .find(|block| !block.is_empty())
    {
        Some(p) => p,
        None => return String::new(),
    };
    let capped: String = paragraph.chars().take(280).collect();
    match SENTENCE_END.find(&capped) {
        Some(m) => capped[..m.end()].trim().to_string(),
        None => capped.trim().to_string(),
    }
}

/// Split a body into trimmed, non-empty paragraph chunks with derived ids.
pub fn split_into_chunks(doc_id: &str, content: &str) -> Vec<Chunk> {
    static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());
    BLANK_LINES
        .split(content)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .enumerate()
        .map(|(index, text)| Chunk {
            id: chunk_id(doc_id, index + 1),
            order: index + 1,
            text: text.to_string(),
        })
        .collect()
}

/// `docId#NNN` chunk identifier.
pub fn chunk_id(doc_id: &str, order: usize) -> String {
    format!("{doc_id}#{order:03}")
}

/// Document id: relative path with the extension removed.
pub fn doc_id_from_path(relative_path: &str) -> String {
    let path = Path::new(relative_path);
    match path.extension() {
        Some(ext) => {
            let suffix_len = ext.len() + 1;
            relative_path[..relative_path.len() - suffix_len].to_string()
        }
        None => relative_path.to_string(),
    }
}

impl NormalizedDoc {
    /// Compute the change-detection hash for this document's inputs.
    pub fn compute_hash(frontmatter: &Value, content: &str) -> String {
        content_hash(frontmatter, content)
    }

    /// Context lines embedded in classifier prompts: title, description,
    /// categories, tags — whatever is present.
    pub fn context_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.title.is_empty() {
            parts.push(format!("Title: {}", self.title));
        }
        if !self.description.is_empty() {
            parts.push(format!("Summary: {}", self.description));
        }
        if !self.categories.is_empty() {
            let names: Vec<&str> = self.categories.iter().map(|c| c.name.as_str()).collect();
            parts.push(format!("Categories: {}", names.join(", ")));
        }
        if !self.tags.is_empty() {
            let names: Vec<&str> = self.tags.iter().map(|t| t.name.as_str()).collect();
            parts.push(format!("Tags: {}", names.join(", ")));
        }
        parts.join("\n")
    }
}
