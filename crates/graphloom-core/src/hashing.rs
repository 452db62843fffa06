//! Content hashing for change detection.

use serde_json::Value;

/// Hash a document's front-matter and body into a stable hex digest.
///
/// The ingest cache compares this against its stored value to decide whether
/// a document changed since the last run. Front-matter is serialized as JSON
/// so key order follows the parsed mapping order, which is stable for a
/// given file content.
pub fn content_hash(frontmatter: &Value, body: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(frontmatter.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(body.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable_for_identical_input() {
        let fm = json!({"title": "Hello", "tags": ["a", "b"]});
        assert_eq!(content_hash(&fm, "body"), content_hash(&fm, "body"));
    }

    #[test]
    fn hash_changes_with_body_or_frontmatter() {
        let fm = json!({"title": "Hello"});
        let base = content_hash(&fm, "body");
        assert_ne!(base, content_hash(&fm, "body changed"));
        assert_ne!(base, content_hash(&json!({"title": "Other"}), "body"));
    }
}
