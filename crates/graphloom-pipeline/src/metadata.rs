//! Metadata normalization: derive identity, chunks, categories/tags, and
//! the change-detection hash from a collected document.

use chrono::{DateTime, NaiveDate, Utc};
use graphloom_core::document::{
    doc_id_from_path, first_sentence, slugify, split_into_chunks, CategoryRef, TagRef,
};
use graphloom_core::{NormalizedDoc, RawDocument};
use serde_json::Value;

/// Scalar-or-list front-matter fields flatten to a list of strings.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.trim().to_string()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .filter(|text| !text.is_empty())
            .collect(),
        Some(Value::String(text)) if !text.trim().is_empty() => vec![text.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Parse dates in RFC 3339 or plain `YYYY-MM-DD` form.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.to_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Derive the normalized document from collected raw content.
pub fn normalize_document(document: RawDocument) -> NormalizedDoc {
    let doc_id = doc_id_from_path(&document.relative_path);
    let frontmatter = &document.frontmatter;

    let tags = string_list(
        frontmatter
            .get("tags")
            .or_else(|| frontmatter.get("tags_zh")),
    );
    let categories = string_list(
        frontmatter
            .get("category")
            .or_else(|| frontmatter.get("category_zh")),
    );

    let updated_at = ["updated", "lastUpdated", "date"]
        .iter()
        .filter_map(|key| frontmatter.get(*key))
        .find_map(parse_date);

    let title = frontmatter
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let description = frontmatter
        .get("description")
        .or_else(|| frontmatter.get("excerpt"))
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| first_sentence(&document.content));

    let chunks = split_into_chunks(&doc_id, &document.content);
    let hash = NormalizedDoc::compute_hash(frontmatter, &document.content);

    NormalizedDoc {
        id: doc_id,
        source_path: document.source_path,
        relative_path: document.relative_path,
        locale: document.locale,
        title,
        description,
        categories: categories
            .into_iter()
            .map(|name| CategoryRef { slug: slugify(&name), name })
            .collect(),
        tags: tags
            .into_iter()
            .map(|name| TagRef { slug: slugify(&name), name })
            .collect(),
        updated_at,
        frontmatter: document.frontmatter,
        chunks,
        hash,
    }
}
