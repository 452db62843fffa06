//! Document collection: walk the content root, split front-matter, detect
//! locale, honor draft status and include/ignore lists.

use anyhow::{Context, Result};
use graphloom_core::RawDocument;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    pub content_root: PathBuf,
    pub locale: Option<String>,
    pub include_drafts: bool,
    /// When non-empty, only these relative paths are collected.
    pub include: HashSet<String>,
    /// Relative paths skipped unconditionally.
    pub ignore: HashSet<String>,
}

/// Read a filter file (one relative path per line). A missing file warns
/// and yields an empty set rather than failing the run.
pub async fn read_filter_file(path: &Path) -> Result<HashSet<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "filter file not found, ignoring");
            Ok(HashSet::new())
        }
        Err(err) => Err(err).with_context(|| format!("reading filter file {}", path.display())),
    }
}

/// Collect every markdown document under the content root.
pub async fn collect_documents(options: &CollectOptions) -> Result<Vec<RawDocument>> {
    let pattern = options
        .content_root
        .join("**/*.md")
        .to_string_lossy()
        .replace('\\', "/");
    let paths = glob::glob(&pattern)
        .with_context(|| format!("invalid content glob {pattern}"))?
        .filter_map(|entry| entry.ok())
        .collect::<Vec<_>>();

    let mut documents = Vec::new();
    for absolute in paths {
        let relative = match absolute.strip_prefix(&options.content_root) {
            Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        if !options.include.is_empty() && !options.include.contains(&relative) {
            continue;
        }
        if options.ignore.contains(&relative) {
            continue;
        }

        let locale = detect_locale(&relative);
        if let Some(wanted) = &options.locale {
            if &locale != wanted {
                continue;
            }
        }

        let raw = tokio::fs::read_to_string(&absolute)
            .await
            .with_context(|| format!("reading {}", absolute.display()))?;
        let (frontmatter, content) = split_frontmatter(&raw)
            .with_context(|| format!("parsing front-matter in {}", absolute.display()))?;

        if !options.include_drafts
            && frontmatter.get("draft").and_then(Value::as_bool) == Some(true)
        {
            continue;
        }

        documents.push(RawDocument {
            source_path: absolute.to_string_lossy().to_string(),
            relative_path: relative,
            locale,
            frontmatter,
            content,
        });
    }

    Ok(documents)
}

/// Locale is the first path segment; root-level files use `default`.
pub fn detect_locale(relative_path: &str) -> String {
    match relative_path.split_once('/') {
        Some((first, _)) => first.to_string(),
        None => "default".to_string(),
    }
}

/// Split a `---` fenced YAML front-matter block from the body. Documents
/// without front-matter parse as an empty mapping.
pub fn split_frontmatter(raw: &str) -> Result<(Value, String)> {
    let rest = match raw.strip_prefix("---") {
        Some(rest) if rest.starts_with('\n') || rest.starts_with("\r\n") => rest,
        _ => return Ok((Value::Object(serde_json::Map::new()), raw.to_string())),
    };

    for (index, _) in rest.match_indices("\n---") {
        let after = &rest[index + 4..];
        let terminated = after.is_empty()
            || after.starts_with('\n')
            || after.starts_with("\r\n")
            || after.starts_with('\r');
        if !terminated {
            continue;
        }
        let yaml = &rest[..index];
        let frontmatter: Value =
            serde_yaml::from_str(yaml).context("front-matter is not valid YAML")?;
        let frontmatter = match frontmatter {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };
        let body = after.trim_start_matches(['\n', '\r']).to_string();
        return Ok((frontmatter, body));
    }

    Ok((Value::Object(serde_json::Map::new()), raw.to_string()))
}
