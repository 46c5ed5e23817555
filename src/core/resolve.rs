//! Entity resolution index
//!
//! Maps normalized unique keys to the summaries of already-persisted
//! records so each incoming record can be classified without a query of
//! its own.

use crate::adapters::database::traits::{EntityStore, MAX_IN_LIST};
use crate::domain::record::parse_numeric_id;
use crate::domain::{EntityKind, ExistingRecord, FieldValue, NormalizedKey, Result, UniqueIdKind};
use std::collections::{BTreeSet, HashMap};

/// Page size used when the index must cover every local record
pub const EXHAUSTIVE_PAGE_SIZE: usize = 1000;

/// Normalizes a unique identifier value for `kind`
///
/// Numeric-identifier kinds strip leading zeros so `"003018"`, `"3018"` and
/// `3018` share one key. Text-identifier kinds keep the trimmed value as-is.
/// Returns `None` for null or blank values.
pub fn resolve_key(kind: EntityKind, value: &FieldValue) -> Option<NormalizedKey> {
    if value.is_blank() {
        return None;
    }

    match kind.unique_id_kind() {
        UniqueIdKind::Numeric => match value {
            FieldValue::Int(i) => Some(NormalizedKey::Numeric(*i)),
            FieldValue::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                Some(NormalizedKey::Numeric(*f as i64))
            }
            other => {
                let text = other.as_text()?;
                let trimmed = text.trim();
                Some(
                    parse_numeric_id(trimmed)
                        .map(NormalizedKey::Numeric)
                        .unwrap_or_else(|| NormalizedKey::Text(trimmed.to_string())),
                )
            }
        },
        UniqueIdKind::Text => value
            .as_text()
            .map(|s| NormalizedKey::Text(s.trim().to_string())),
    }
}

/// Snapshot of persisted records keyed by normalized unique key
///
/// Built once per run; records written later in the same run are not
/// reflected.
#[derive(Debug, Clone, Default)]
pub struct ResolutionIndex {
    entries: HashMap<NormalizedKey, ExistingRecord>,
}

impl ResolutionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a persisted record; the first record seen for a key wins
    pub fn insert(&mut self, kind: EntityKind, record: ExistingRecord) {
        let key = resolve_key(kind, &FieldValue::Text(record.unique_value.clone()));
        if let Some(key) = key {
            self.entries.entry(key).or_insert(record);
        }
    }

    pub fn get(&self, key: &NormalizedKey) -> Option<&ExistingRecord> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &NormalizedKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the index for `kind`
///
/// Kinds that require an exhaustive index page through every local record;
/// the others look up only `candidates`, chunked to [`MAX_IN_LIST`].
pub async fn build_index(
    store: &dyn EntityStore,
    kind: EntityKind,
    candidates: &[NormalizedKey],
) -> Result<ResolutionIndex> {
    let mut index = ResolutionIndex::new();

    if kind.requires_exhaustive_index() {
        let mut offset = 0;
        loop {
            let page = store.page_all(kind, offset, EXHAUSTIVE_PAGE_SIZE).await?;
            let fetched = page.len();
            for record in page {
                index.insert(kind, record);
            }
            if fetched < EXHAUSTIVE_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }
    } else {
        let values: Vec<String> = candidates
            .iter()
            .map(ToString::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        for chunk in values.chunks(MAX_IN_LIST) {
            for record in store.find_by_unique_values(kind, chunk).await? {
                index.insert(kind, record);
            }
        }
    }

    tracing::debug!(
        entity = %kind,
        exhaustive = kind.requires_exhaustive_index(),
        indexed = index.len(),
        "Resolution index built"
    );

    Ok(index)
}
