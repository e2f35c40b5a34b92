//! Typed records and their wire form.
//!
//! Every record shares one envelope (`id`, partition, `created_at`) and carries
//! one of a closed set of payloads: calendar entries, map pins or map strokes.
//! Stores only ever see [`StoredRecord`], a flat JSON object; payloads are
//! validated whenever they come back in from either store.

mod entry;
mod pin;
mod stroke;

pub use entry::Entry;
pub use pin::{Pin, PinPatch};
pub use stroke::{Point, Stroke};

use std::cmp::Ordering;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{CREATED_AT_FIELD, LOCAL_ID_PREFIX};
use crate::error::{ShiftboardError, ShiftboardResult};
use crate::partition::PartitionKey;

/// Field map of one stored record.
pub type Fields = serde_json::Map<String, Value>;

/// Store-assigned record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    /// Generate an id for a record created while offline. The prefix keeps
    /// the local id space apart from store-assigned ids.
    pub fn local() -> Self {
        RecordId(format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Entry,
    Pin,
    Stroke,
}

/// Domain fields of one record kind.
pub trait Payload: Clone + Serialize + DeserializeOwned + Send + 'static {
    const KIND: RecordKind;

    /// Collection used when configuration doesn't name one.
    const DEFAULT_COLLECTION: &'static str;

    /// Name of the field holding the partition key on the wire.
    const PARTITION_FIELD: &'static str;

    /// Primary ordering within a partition. Ties fall back to `created_at`.
    fn sort_key(&self) -> i64 {
        0
    }

    fn validate(&self) -> ShiftboardResult<()>;
}

/// Payloads that can be changed in place after creation.
pub trait Mutable: Payload {
    type Patch: Serialize + Clone + Send + Sync;

    fn apply(&mut self, patch: &Self::Patch);
}

/// Names the remote collection and partition field for one payload kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    pub partition_field: &'static str,
}

impl Collection {
    pub fn of<P: Payload>() -> Self {
        Collection {
            name: P::DEFAULT_COLLECTION.to_string(),
            partition_field: P::PARTITION_FIELD,
        }
    }

    pub fn named<P: Payload>(name: &str) -> Self {
        Collection {
            name: name.to_string(),
            partition_field: P::PARTITION_FIELD,
        }
    }
}

/// A record as it travels to and from stores.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub fields: Fields,
}

/// A record whose fields have not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub partition: PartitionKey,
    pub created_at: i64,
    pub fields: Fields,
}

/// The common envelope around a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<P> {
    pub id: RecordId,
    pub partition: PartitionKey,
    pub created_at: i64,
    pub payload: P,
}

impl<P: Payload> Record<P> {
    /// Payload fields only, without envelope.
    pub fn payload_fields(payload: &P) -> ShiftboardResult<Fields> {
        match serde_json::to_value(payload)? {
            Value::Object(fields) => Ok(fields),
            other => Err(ShiftboardError::Serialization(format!(
                "payload serialized to {other}, expected an object"
            ))),
        }
    }

    /// Full wire fields: payload plus partition and creation time.
    pub fn to_fields(&self) -> ShiftboardResult<Fields> {
        let mut fields = Self::payload_fields(&self.payload)?;
        fields.insert(
            P::PARTITION_FIELD.to_string(),
            Value::String(self.partition.to_string()),
        );
        fields.insert(CREATED_AT_FIELD.to_string(), Value::from(self.created_at));
        Ok(fields)
    }

    pub fn to_stored(&self) -> ShiftboardResult<StoredRecord> {
        Ok(StoredRecord {
            id: self.id.clone(),
            fields: self.to_fields()?,
        })
    }

    /// Decode and validate a record coming back from a store.
    pub fn from_stored(stored: &StoredRecord) -> ShiftboardResult<Self> {
        let partition = stored
            .fields
            .get(P::PARTITION_FIELD)
            .and_then(Value::as_str)
            .map(PartitionKey::from_stored)
            .ok_or_else(|| {
                ShiftboardError::InvalidInput(format!(
                    "record {} has no '{}' field",
                    stored.id,
                    P::PARTITION_FIELD
                ))
            })?;

        // Records written before timestamps existed sort first.
        let created_at = match stored.fields.get(CREATED_AT_FIELD) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            _ => 0,
        };

        let payload: P = serde_json::from_value(Value::Object(stored.fields.clone()))
            .map_err(|e| ShiftboardError::InvalidInput(format!("record {}: {e}", stored.id)))?;
        payload.validate()?;

        Ok(Record {
            id: stored.id.clone(),
            partition,
            created_at,
            payload,
        })
    }
}

/// Partition ordering: primary key, then creation time, then id.
pub fn compare<P: Payload>(a: &Record<P>, b: &Record<P>) -> Ordering {
    a.payload
        .sort_key()
        .cmp(&b.payload.sort_key())
        .then(a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, day: u32, created_at: i64) -> Record<Entry> {
        Record {
            id: RecordId::from(id),
            partition: PartitionKey::from_stored("2025-12"),
            created_at,
            payload: Entry {
                day,
                name: "Sato".to_string(),
                text: "off".to_string(),
            },
        }
    }

    #[test]
    fn orders_by_day_then_creation_time() {
        let mut records = vec![entry("a", 3, 100), entry("b", 1, 200), entry("c", 3, 50)];
        records.sort_by(compare);

        let order: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn stored_form_carries_envelope_fields() {
        let record = entry("x", 5, 1234);
        let stored = record.to_stored().unwrap();

        assert_eq!(stored.fields["ym"], "2025-12");
        assert_eq!(stored.fields["createdAt"], 1234);
        assert_eq!(stored.fields["day"], 5);
        assert_eq!(Record::<Entry>::from_stored(&stored).unwrap(), record);
    }

    #[test]
    fn missing_created_at_reads_as_zero() {
        let mut stored = entry("x", 5, 99).to_stored().unwrap();
        stored.fields.remove("createdAt");

        assert_eq!(Record::<Entry>::from_stored(&stored).unwrap().created_at, 0);
    }

    #[test]
    fn rejects_records_without_partition() {
        let mut stored = entry("x", 5, 1).to_stored().unwrap();
        stored.fields.remove("ym");

        assert!(matches!(
            Record::<Entry>::from_stored(&stored),
            Err(ShiftboardError::InvalidInput(_))
        ));
    }

    #[test]
    fn local_ids_are_prefixed_and_unique() {
        let a = RecordId::local();
        let b = RecordId::local();
        assert!(a.is_local());
        assert_ne!(a, b);
        assert!(!RecordId::from("-NxAbc").is_local());
    }
}
