//! Append-only metrics ring buffer: one JSON record per run, newest first,
//! oldest silently dropped past the cap. Historical records are never
//! updated or deleted.

use chrono::Utc;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct MetricsStore {
    path: PathBuf,
    limit: usize,
}

impl MetricsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), limit: DEFAULT_LIMIT }
    }

    pub fn with_limit(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self { path: path.into(), limit: limit.max(1) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepend a record (stamping `timestamp` when absent) and truncate to
    /// the cap. Returns the stored record.
    pub async fn append(&self, record: Value) -> io::Result<Value> {
        let mut record = record;
        if let Some(object) = record.as_object_mut() {
            object
                .entry("timestamp".to_string())
                .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        }

        let mut entries = self.read().await?;
        entries.insert(0, record.clone());
        entries.truncate(self.limit);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_string_pretty(&entries)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        tokio::fs::write(&self.path, serialized).await?;
        Ok(record)
    }

    /// All records, newest first; a missing file reads as empty.
    pub async fn read(&self) -> io::Result<Vec<Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(entries)) => Ok(entries),
                Ok(_) => Ok(Vec::new()),
                Err(err) => Err(io::Error::new(io::ErrorKind::InvalidData, err)),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }
}
