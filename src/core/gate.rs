//! Foreign-key gate for records that need an existing parent
//!
//! A contract line may only be persisted when its parent contract is already
//! stored locally and that contract references a customer.

use crate::core::resolve::{resolve_key, ResolutionIndex};
use crate::core::sync::summary::skip;
use crate::domain::{EntityKind, FieldValue};

/// Verdict for one candidate record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Parent is valid; carries the parent's primary key
    Accept(i64),
    /// Skip the record with a labeled reason
    Reject(&'static str),
}

/// Checks a candidate child's parent reference
///
/// `parent_value` is the candidate's raw parent identifier; `parents` is
/// the resolution index of the parent kind.
pub fn validate_parent(
    parent_kind: EntityKind,
    parent_value: Option<&FieldValue>,
    parents: &ResolutionIndex,
) -> GateDecision {
    let Some(key) = parent_value.and_then(|v| resolve_key(parent_kind, v)) else {
        return GateDecision::Reject(skip::PARENT_ID_MISSING);
    };

    match parents.get(&key) {
        None => GateDecision::Reject(skip::PARENT_NOT_FOUND),
        Some(parent) if !parent.has_customer() => {
            GateDecision::Reject(skip::PARENT_MISSING_CUSTOMER)
        }
        Some(parent) => GateDecision::Accept(parent.pk),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExistingRecord;
    use chrono::Utc;

    fn contract(pk: i64, customer: Option<&str>) -> ExistingRecord {
        ExistingRecord {
            pk,
            unique_value: pk.to_string(),
            customer_ref: customer.map(String::from),
            fingerprint: None,
            synced_at: Utc::now(),
        }
    }

    fn parents() -> ResolutionIndex {
        let mut index = ResolutionIndex::new();
        index.insert(EntityKind::Contract, contract(10, Some("C001")));
        index.insert(EntityKind::Contract, contract(11, Some("   ")));
        index.insert(EntityKind::Contract, contract(12, None));
        index
    }

    #[test]
    fn test_accepts_parent_with_customer() {
        let decision = validate_parent(
            EntityKind::Contract,
            Some(&FieldValue::Text("0010".into())),
            &parents(),
        );
        assert_eq!(decision, GateDecision::Accept(10));
    }

    #[test]
    fn test_rejection_reasons_are_distinct() {
        let index = parents();

        assert_eq!(
            validate_parent(EntityKind::Contract, None, &index),
            GateDecision::Reject(skip::PARENT_ID_MISSING)
        );
        assert_eq!(
            validate_parent(EntityKind::Contract, Some(&FieldValue::Text("".into())), &index),
            GateDecision::Reject(skip::PARENT_ID_MISSING)
        );
        assert_eq!(
            validate_parent(EntityKind::Contract, Some(&FieldValue::Int(99)), &index),
            GateDecision::Reject(skip::PARENT_NOT_FOUND)
        );
        assert_eq!(
            validate_parent(EntityKind::Contract, Some(&FieldValue::Int(11)), &index),
            GateDecision::Reject(skip::PARENT_MISSING_CUSTOMER)
        );
        assert_eq!(
            validate_parent(EntityKind::Contract, Some(&FieldValue::Int(12)), &index),
            GateDecision::Reject(skip::PARENT_MISSING_CUSTOMER)
        );
    }
}
