//! Canonical key derivation for noisy labels.
//!
//! Two raw strings that differ only by bracketed annotations, case, or
//! insignificant punctuation must derive the same key, so every resolver
//! (entity type, relationship type, property key) memoizes on these keys.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Bracketed spans are annotations, not identity: `Rust (language)` and
/// `Rust` are the same label. Non-greedy, single level per pair.
static BRACKETED: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"（.*?）",
        r"\(.*?\)",
        r"【.*?】",
        r"\[.*?\]",
        r"<.*?>",
        r"\{.*?\}",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Everything outside ASCII alphanumerics and the CJK unified block is
/// insignificant punctuation for key purposes.
static NON_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9A-Za-z\u{4e00}-\u{9fa5}]+").unwrap());

/// Derive the canonical key for an entity name or entity-type label.
///
/// NFKC-normalizes, strips bracketed annotations, drops everything outside
/// `[0-9A-Za-z\u{4e00}-\u{9fa5}]`, and lowercases. Returns an empty string
/// when nothing survives.
pub fn normalize_entity_key(value: &str) -> String {
    let mut text: String = value.nfkc().collect();
    for pattern in BRACKETED.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    let text = NON_LABEL.replace_all(&text, "");
    text.to_lowercase()
}

/// Derive the loose key for relationship labels and property keys.
///
/// Same as [`normalize_entity_key`] but without bracket stripping: property
/// keys like `weight(kg)` keep their parenthesized unit as part of identity.
pub fn normalize_loose_label(value: &str) -> String {
    let text: String = value.nfkc().collect();
    let text = NON_LABEL.replace_all(&text, "");
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_key_ignores_bracketed_annotations() {
        assert_eq!(normalize_entity_key("Rust (language)"), "rust");
        assert_eq!(normalize_entity_key("Rust（编程语言）"), "rust");
        assert_eq!(normalize_entity_key("Rust【2015】"), "rust");
        assert_eq!(normalize_entity_key("Rust"), "rust");
    }

    #[test]
    fn entity_key_ignores_case_and_punctuation() {
        assert_eq!(normalize_entity_key("Node A"), normalize_entity_key("node-a"));
        assert_eq!(normalize_entity_key("GraphRAG!"), normalize_entity_key("graph_rag"));
        assert_eq!(normalize_entity_key("  spaced out  "), "spacedout");
    }

    #[test]
    fn entity_key_keeps_cjk() {
        assert_eq!(normalize_entity_key("知识图谱"), "知识图谱");
        assert_eq!(normalize_entity_key("知识 图谱 v2"), "知识图谱v2");
    }

    #[test]
    fn entity_key_empty_when_nothing_survives() {
        assert_eq!(normalize_entity_key("(annotation only)"), "");
        assert_eq!(normalize_entity_key("!!!"), "");
        assert_eq!(normalize_entity_key(""), "");
    }

    #[test]
    fn loose_label_keeps_bracket_contents() {
        assert_eq!(normalize_loose_label("weight(kg)"), "weightkg");
        assert_eq!(normalize_loose_label("Related-To"), "relatedto");
        assert_eq!(normalize_loose_label("发布于"), "发布于");
    }

    #[test]
    fn nfkc_folds_fullwidth_forms() {
        // Fullwidth latin letters normalize to ASCII under NFKC.
        assert_eq!(normalize_entity_key("Ｒｕｓｔ"), "rust");
        assert_eq!(normalize_loose_label("ｗｅｉｇｈｔ"), "weight");
    }
}
