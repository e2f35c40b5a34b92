//! Durable per-partition cache on local disk.
//!
//! Each (collection, partition) pair is one JSON file holding an object of
//! `id -> fields`. The cache is the only store in local mode and a
//! write-through copy of the last snapshot in remote mode.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{ShiftboardError, ShiftboardResult};
use crate::partition::PartitionKey;
use crate::record::{Fields, RecordId, StoredRecord};

const CACHE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalCache { root: root.into() }
    }

    fn path(&self, collection: &str, partition: &PartitionKey) -> PathBuf {
        self.root.join(format!(
            "{}__{}.{CACHE_EXTENSION}",
            escape(collection),
            escape(partition.as_str())
        ))
    }

    /// Replace the cached record set for one partition.
    pub fn save(
        &self,
        collection: &str,
        partition: &PartitionKey,
        records: &[StoredRecord],
    ) -> ShiftboardResult<()> {
        std::fs::create_dir_all(&self.root)?;

        let blob: BTreeMap<&str, &Fields> = records
            .iter()
            .map(|r| (r.id.as_str(), &r.fields))
            .collect();
        let content = serde_json::to_string(&blob)?;

        let path = self.path(collection, partition);
        let temp = path.with_extension(format!("{CACHE_EXTENSION}.tmp"));

        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    /// Read the cached record set for one partition.
    ///
    /// Missing or unreadable entries yield an empty set; corruption is logged
    /// and otherwise ignored.
    pub fn load(&self, collection: &str, partition: &PartitionKey) -> Vec<StoredRecord> {
        let path = self.path(collection, partition);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "could not read cache: {e}");
                return Vec::new();
            }
        };

        match parse(&content) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring corrupt cache: {e}");
                Vec::new()
            }
        }
    }
}

fn parse(content: &str) -> ShiftboardResult<Vec<StoredRecord>> {
    let blob: BTreeMap<String, Value> =
        serde_json::from_str(content).map_err(|e| ShiftboardError::ParseFailure(e.to_string()))?;

    blob.into_iter()
        .map(|(id, value)| match value {
            Value::Object(fields) => Ok(StoredRecord {
                id: RecordId::new(id),
                fields,
            }),
            other => Err(ShiftboardError::ParseFailure(format!(
                "record {id} is {other}, expected an object"
            ))),
        })
        .collect()
}

/// Keep `[A-Za-z0-9-]` and hex-escape every other byte, so distinct keys
/// never map to the same file name.
fn escape(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("_{byte:02x}"));
        }
    }
    out
}
