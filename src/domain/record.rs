//! Record representations flowing through the sync pipeline
//!
//! A [`RemoteRecord`] is one normalized ERP row. A [`LocalRecord`] is the
//! mapped, keyed row the storage layer persists, and an [`ExistingRecord`] is
//! the summary of an already-persisted row the resolution index holds.

use crate::domain::entity::EntityKind;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// A single coerced field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// True for null and for whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// String form used for identifiers and filter expressions
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Timestamp(ts) => Some(ts.format(ERP_DATETIME_FORMAT).to_string()),
            FieldValue::Text(s) => Some(s.clone()),
        }
    }

    /// JSON form stored in the local record's field blob
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Timestamp(ts) => Value::String(ts.format(ERP_DATETIME_FORMAT).to_string()),
            FieldValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Date-time layout the ERP uses on the wire
pub const ERP_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One remote row after normalization
///
/// Field names match the integration's declared remote field names exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl RemoteRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, FieldValue)> for RemoteRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A unique identifier after normalization
///
/// Numeric identifiers compare as integers, so `"003018"`, `"3018"` and
/// `3018` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NormalizedKey {
    Numeric(i64),
    Text(String),
}

impl NormalizedKey {
    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            NormalizedKey::Numeric(n) => Some(*n),
            NormalizedKey::Text(_) => None,
        }
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedKey::Numeric(n) => write!(f, "{n}"),
            NormalizedKey::Text(s) => f.write_str(s),
        }
    }
}

/// A record ready to be written to local storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub kind: EntityKind,

    /// Storage primary key
    pub pk: i64,

    /// Normalized unique identifier (string form of [`NormalizedKey`])
    pub unique_value: String,

    /// Customer reference, for kinds that carry one
    pub customer_ref: Option<String>,

    /// Parent primary key, for kinds with a parent
    pub parent_pk: Option<i64>,

    /// Mapped local fields
    pub fields: Map<String, Value>,

    /// SHA-256 of `fields`
    pub fingerprint: String,
}

impl LocalRecord {
    /// Builds a record and computes its fingerprint
    pub fn new(
        kind: EntityKind,
        pk: i64,
        unique_value: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Self {
        let fingerprint = fingerprint(&fields);
        let customer_ref = kind
            .customer_ref_field()
            .and_then(|name| fields.get(name))
            .and_then(json_to_ref);
        let parent_pk = kind
            .parent_ref_field()
            .and_then(|name| fields.get(name))
            .and_then(json_to_ref)
            .and_then(|s| parse_numeric_id(&s));

        Self {
            kind,
            pk,
            unique_value: unique_value.into(),
            customer_ref,
            parent_pk,
            fields,
            fingerprint,
        }
    }
}

/// Parses a numeric identifier, ignoring surrounding whitespace and leading zeros
///
/// ```
/// use parksync::domain::record::parse_numeric_id;
///
/// assert_eq!(parse_numeric_id("003018"), Some(3018));
/// assert_eq!(parse_numeric_id("000"), Some(0));
/// assert_eq!(parse_numeric_id("30A"), None);
/// ```
pub fn parse_numeric_id(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = trimmed.trim_start_matches('0');
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

fn json_to_ref(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Summary of a persisted record held by the resolution index
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingRecord {
    pub pk: i64,
    pub unique_value: String,
    pub customer_ref: Option<String>,
    pub fingerprint: Option<String>,
    pub synced_at: DateTime<Utc>,
}

impl ExistingRecord {
    /// Whether this record references a customer
    pub fn has_customer(&self) -> bool {
        self.customer_ref
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}

impl From<&LocalRecord> for ExistingRecord {
    fn from(record: &LocalRecord) -> Self {
        Self {
            pk: record.pk,
            unique_value: record.unique_value.clone(),
            customer_ref: record.customer_ref.clone(),
            fingerprint: Some(record.fingerprint.clone()),
            synced_at: Utc::now(),
        }
    }
}

/// SHA-256 over the canonical JSON of a field map
///
/// `serde_json::Map` iterates in key order, so equal maps hash equally.
pub fn fingerprint(fields: &Map<String, Value>) -> String {
    let canonical = Value::Object(fields.clone()).to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = map(json!({"name": "ACME", "code": "C001"}));
        let b = map(json!({"code": "C001", "name": "ACME"}));
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = map(json!({"name": "ACME"}));
        let b = map(json!({"name": "ACME Ltd"}));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_local_record_extracts_references() {
        let contract = LocalRecord::new(
            EntityKind::Contract,
            3018,
            "3018",
            map(json!({"customer_id": "C-17", "name": "Monthly"})),
        );
        assert_eq!(contract.customer_ref.as_deref(), Some("C-17"));
        assert_eq!(contract.parent_pk, None);

        let line = LocalRecord::new(
            EntityKind::ContractLine,
            9,
            "9",
            map(json!({"contract_id": "003018", "plate": "ABC1234"})),
        );
        assert_eq!(line.parent_pk, Some(3018));
        assert_eq!(line.customer_ref, None);
    }

    #[test]
    fn test_blank_customer_reference_is_none() {
        let contract = LocalRecord::new(
            EntityKind::Contract,
            1,
            "1",
            map(json!({"customer_id": "   "})),
        );
        assert!(contract.customer_ref.is_none());
        assert!(!ExistingRecord::from(&contract).has_customer());
    }

    #[test]
    fn test_field_value_json() {
        let ts = NaiveDateTime::parse_from_str("2024-03-01 10:00:00", ERP_DATETIME_FORMAT).unwrap();
        assert_eq!(FieldValue::Timestamp(ts).to_json(), json!("2024-03-01 10:00:00"));
        assert_eq!(FieldValue::Int(7).to_json(), json!(7));
        assert_eq!(FieldValue::Null.to_json(), Value::Null);
        assert!(FieldValue::Text("  ".into()).is_blank());
    }

    #[test]
    fn test_normalized_key_display() {
        assert_eq!(NormalizedKey::Numeric(3018).to_string(), "3018");
        assert_eq!(NormalizedKey::Text("ITM-01".into()).to_string(), "ITM-01");
    }
}
