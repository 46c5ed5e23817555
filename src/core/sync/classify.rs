//! Classification and gating of normalized records
//!
//! Each normalized record is mapped to its local shape, passed through the
//! parent gate where the kind has one, and classified as a create, an
//! update or a labeled skip.

use crate::config::IntegrationConfig;
use crate::core::gate::{validate_parent, GateDecision};
use crate::core::resolve::{resolve_key, ResolutionIndex};
use crate::core::sync::summary::skip;
use crate::domain::record::parse_numeric_id;
use crate::domain::{
    EntityKind, FieldValue, LocalRecord, NormalizedKey, ParentGate, RemoteRecord,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Whether a queued record is new locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Create,
    Update,
}

/// A record queued for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub action: WriteAction,
    pub record: LocalRecord,
}

/// Verdict for one normalized record
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Write(PendingWrite),
    Skip(&'static str),
}

/// Everything classification reads; built once per run
pub struct ClassifyContext<'a> {
    pub integration: &'a IntegrationConfig,

    /// Watermark to compare timestamps against; `None` on full reads
    pub incremental_since: Option<DateTime<Utc>>,

    pub index: &'a ResolutionIndex,

    /// Contract index for kinds gated on their parent
    pub parents: Option<&'a ResolutionIndex>,
}

impl ClassifyContext<'_> {
    fn kind(&self) -> EntityKind {
        self.integration.entity
    }

    /// Classifies one record
    pub fn classify(&self, remote: &RemoteRecord) -> Classification {
        let kind = self.kind();

        let Some(key) = self.unique_key(remote) else {
            return Classification::Skip(skip::MISSING_UNIQUE_ID);
        };

        let parent_pk = match kind.parent_gate() {
            ParentGate::None => None,
            ParentGate::ContractWithCustomer => {
                let empty = ResolutionIndex::new();
                let parents = self.parents.unwrap_or(&empty);
                let raw = self
                    .integration
                    .parent_remote_field
                    .as_deref()
                    .and_then(|field| lookup(remote, field));
                match validate_parent(EntityKind::Contract, raw, parents) {
                    GateDecision::Accept(pk) => Some(pk),
                    GateDecision::Reject(reason) => return Classification::Skip(reason),
                }
            }
        };

        let existing = self.index.get(&key);

        let mut action = match self.incremental_since {
            Some(since) if kind.has_reliable_timestamps() => {
                let inserted = self.timestamp(remote, &self.integration.inserted_at_field);
                let updated = self.timestamp(remote, &self.integration.updated_at_field);
                match (inserted, updated) {
                    (None, None) => return Classification::Skip(skip::MISSING_TIMESTAMPS),
                    (Some(ins), _) if ins >= since => WriteAction::Create,
                    (_, Some(upd)) if upd >= since => WriteAction::Update,
                    _ => return Classification::Skip(skip::UNCHANGED),
                }
            }
            _ => match existing {
                Some(_) => WriteAction::Update,
                None => WriteAction::Create,
            },
        };

        let pk = match existing.map(|e| e.pk).or_else(|| self.derive_pk(remote, &key)) {
            Some(pk) => pk,
            None => return Classification::Skip(skip::INVALID_PRIMARY_KEY),
        };

        let record = self.to_local(remote, pk, &key, parent_pk);

        match existing {
            Some(e) if e.fingerprint.as_deref() == Some(record.fingerprint.as_str()) => {
                return Classification::Skip(skip::UNCHANGED);
            }
            Some(_) => action = WriteAction::Update,
            None if action == WriteAction::Update => {
                // Updated remotely but never synced here
                action = WriteAction::Create;
            }
            None => {}
        }

        Classification::Write(PendingWrite { action, record })
    }

    pub fn unique_key(&self, remote: &RemoteRecord) -> Option<NormalizedKey> {
        unique_key(self.integration, remote)
    }

    fn timestamp(&self, remote: &RemoteRecord, field: &str) -> Option<DateTime<Utc>> {
        lookup(remote, field)
            .and_then(FieldValue::as_timestamp)
            .map(|ts| Utc.from_utc_datetime(&ts))
    }

    fn derive_pk(&self, remote: &RemoteRecord, key: &NormalizedKey) -> Option<i64> {
        if let Some(pk) = key.as_numeric() {
            return Some(pk);
        }
        match self.integration.primary_key_field.as_deref() {
            Some(field) => lookup(remote, field).and_then(numeric_value),
            None => parse_numeric_id(&key.to_string()),
        }
    }

    fn to_local(
        &self,
        remote: &RemoteRecord,
        pk: i64,
        key: &NormalizedKey,
        parent_pk: Option<i64>,
    ) -> LocalRecord {
        let integration = self.integration;
        let mut fields = Map::new();

        for (remote_field, local_field) in &integration.field_mapping {
            let value = lookup(remote, remote_field)
                .map(FieldValue::to_json)
                .unwrap_or(Value::Null);
            fields.insert(local_field.clone(), value);
        }

        fields.insert(
            integration.unique_local_field.clone(),
            Value::String(key.to_string()),
        );
        if let (Some(pk), Some(field)) = (parent_pk, self.kind().parent_ref_field()) {
            fields.insert(field.to_string(), Value::from(pk));
        }

        LocalRecord::new(self.kind(), pk, key.to_string(), fields)
    }
}

/// Normalized unique key of a remote record
pub fn unique_key(integration: &IntegrationConfig, remote: &RemoteRecord) -> Option<NormalizedKey> {
    lookup(remote, &integration.unique_remote_field)
        .and_then(|value| resolve_key(integration.entity, value))
}

/// Field of a normalized record, matched case-insensitively
fn lookup<'r>(remote: &'r RemoteRecord, field: &str) -> Option<&'r FieldValue> {
    remote.get(field).or_else(|| {
        remote
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field))
            .map(|(_, value)| value)
    })
}

fn numeric_value(value: &FieldValue) -> Option<i64> {
    match value {
        FieldValue::Int(i) => Some(*i),
        FieldValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        FieldValue::Text(s) => parse_numeric_id(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncDirection;
    use crate::domain::ExistingRecord;
    use chrono::{Duration, NaiveDateTime};
    use std::collections::BTreeMap;

    fn customers() -> IntegrationConfig {
        IntegrationConfig {
            id: "customers".parse().unwrap(),
            entity: EntityKind::Customer,
            connection: "main".into(),
            remote_object: "CUSTOMER".into(),
            remote_table: "TRDR".into(),
            fields: vec!["TRDR".into(), "CODE".into(), "NAME".into(), "INSDATE".into(), "UPDDATE".into()],
            field_mapping: BTreeMap::from([
                ("CODE".to_string(), "code".to_string()),
                ("NAME".to_string(), "name".to_string()),
            ]),
            unique_remote_field: "CODE".into(),
            unique_local_field: "code".into(),
            primary_key_field: Some("TRDR".into()),
            inserted_at_field: "INSDATE".into(),
            updated_at_field: "UPDDATE".into(),
            parent_remote_field: None,
            named_query: None,
            direction: SyncDirection::OneWay,
            schedule: None,
            enabled: true,
        }
    }

    fn at(ts: DateTime<Utc>) -> FieldValue {
        FieldValue::Timestamp(ts.naive_utc())
    }

    fn customer(trdr: i64, code: &str, inserted: Option<DateTime<Utc>>, updated: Option<DateTime<Utc>>) -> RemoteRecord {
        let mut r = RemoteRecord::new();
        r.insert("TRDR", FieldValue::Int(trdr));
        r.insert("CODE", FieldValue::Text(code.into()));
        r.insert("NAME", FieldValue::Text(format!("Customer {code}")));
        r.insert("INSDATE", inserted.map_or(FieldValue::Null, at));
        r.insert("UPDDATE", updated.map_or(FieldValue::Null, at));
        r
    }

    fn watermark() -> DateTime<Utc> {
        let naive = NaiveDateTime::parse_from_str("2024-06-01 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Utc.from_utc_datetime(&naive)
    }

    fn existing(pk: i64, unique: &str) -> ExistingRecord {
        ExistingRecord {
            pk,
            unique_value: unique.into(),
            customer_ref: None,
            fingerprint: Some("stale".into()),
            synced_at: Utc::now(),
        }
    }

    #[test]
    fn test_inserted_before_but_updated_after_watermark_is_update() {
        let config = customers();
        let mut index = ResolutionIndex::new();
        index.insert(EntityKind::Customer, existing(7, "C007"));
        let ctx = ClassifyContext {
            integration: &config,
            incremental_since: Some(watermark()),
            index: &index,
            parents: None,
        };

        let record = customer(
            7,
            "C007",
            Some(watermark() - Duration::days(1)),
            Some(watermark() + Duration::hours(1)),
        );

        match ctx.classify(&record) {
            Classification::Write(w) => {
                assert_eq!(w.action, WriteAction::Update);
                assert_eq!(w.record.pk, 7);
            }
            other => panic!("expected write, got {other:?}"),
        }
    }

    #[test]
    fn test_incremental_skips() {
        let config = customers();
        let index = ResolutionIndex::new();
        let ctx = ClassifyContext {
            integration: &config,
            incremental_since: Some(watermark()),
            index: &index,
            parents: None,
        };

        let old = watermark() - Duration::days(3);
        assert_eq!(
            ctx.classify(&customer(1, "C001", Some(old), Some(old))),
            Classification::Skip(skip::UNCHANGED)
        );
        assert_eq!(
            ctx.classify(&customer(2, "C002", None, None)),
            Classification::Skip(skip::MISSING_TIMESTAMPS)
        );
    }

    #[test]
    fn test_new_record_already_indexed_becomes_update() {
        let config = customers();
        let mut index = ResolutionIndex::new();
        index.insert(EntityKind::Customer, existing(3, "C003"));
        let ctx = ClassifyContext {
            integration: &config,
            incremental_since: Some(watermark()),
            index: &index,
            parents: None,
        };

        let fresh = watermark() + Duration::minutes(5);
        match ctx.classify(&customer(3, "C003", Some(fresh), Some(fresh))) {
            Classification::Write(w) => assert_eq!(w.action, WriteAction::Update),
            other => panic!("expected write, got {other:?}"),
        }
    }

    #[test]
    fn test_unchanged_fingerprint_is_skipped_on_full_read() {
        let config = customers();
        let index = ResolutionIndex::new();
        let ctx = ClassifyContext {
            integration: &config,
            incremental_since: None,
            index: &index,
            parents: None,
        };
        let remote = customer(9, "C009", None, None);
        let Classification::Write(first) = ctx.classify(&remote) else {
            panic!("expected write");
        };
        assert_eq!(first.action, WriteAction::Create);

        let mut index = ResolutionIndex::new();
        index.insert(EntityKind::Customer, ExistingRecord::from(&first.record));
        let ctx = ClassifyContext {
            integration: &config,
            incremental_since: None,
            index: &index,
            parents: None,
        };
        assert_eq!(ctx.classify(&remote), Classification::Skip(skip::UNCHANGED));
    }

    #[test]
    fn test_unique_id_and_primary_key_failures() {
        let config = customers();
        let index = ResolutionIndex::new();
        let ctx = ClassifyContext {
            integration: &config,
            incremental_since: None,
            index: &index,
            parents: None,
        };

        let mut no_code = customer(1, "", None, None);
        no_code.insert("CODE", FieldValue::Null);
        assert_eq!(ctx.classify(&no_code), Classification::Skip(skip::MISSING_UNIQUE_ID));

        let mut bad_pk = customer(1, "C001", None, None);
        bad_pk.insert("TRDR", FieldValue::Null);
        assert_eq!(ctx.classify(&bad_pk), Classification::Skip(skip::INVALID_PRIMARY_KEY));
    }

    #[test]
    fn test_mapped_fields_use_local_names() {
        let config = customers();
        let index = ResolutionIndex::new();
        let ctx = ClassifyContext {
            integration: &config,
            incremental_since: None,
            index: &index,
            parents: None,
        };
        let Classification::Write(w) = ctx.classify(&customer(42, " C042 ", None, None)) else {
            panic!("expected write");
        };
        assert_eq!(w.record.pk, 42);
        assert_eq!(w.record.unique_value, "C042");
        assert_eq!(w.record.fields["code"], Value::String("C042".into()));
        assert_eq!(w.record.fields["name"], Value::String("Customer  C042 ".into()));
        assert!(!w.record.fields.contains_key("TRDR"));
    }
}
