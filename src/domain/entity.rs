//! Entity variants synchronized from the ERP
//!
//! Each [`EntityKind`] carries the fixed behaviour the sync pipeline needs:
//! how its unique identifier is normalized, whether it has a parent gate,
//! whether its remote timestamps can be trusted, how it is written, and how
//! large its batches are. The orchestrator dispatches on the variant instead
//! of comparing entity names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity types the engine knows how to reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Customer (ERP trader)
    Customer,
    /// Parking contract, optionally linked to a customer
    Contract,
    /// Contract line item (vehicle/plate entry), requires a parent contract
    ContractLine,
    /// Inventory item
    Item,
    /// Customer payment
    Payment,
}

/// How a unique identifier is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueIdKind {
    /// Leading zeros stripped, compared as an integer
    Numeric,
    /// Compared verbatim
    Text,
}

/// How a record is written to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Insert-or-update keyed by the primary key
    NativeUpsert,
    /// Find by unique field, update by primary key, else create
    FindThenWrite,
}

/// The parent gate a kind must pass before it is queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentGate {
    /// No parent requirement
    None,
    /// Parent contract must exist and reference a customer
    ContractWithCustomer,
}

impl EntityKind {
    /// All variants, in the order parents come before children
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Customer,
        EntityKind::Contract,
        EntityKind::ContractLine,
        EntityKind::Item,
        EntityKind::Payment,
    ];

    /// Stable snake_case name used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Contract => "contract",
            EntityKind::ContractLine => "contract_line",
            EntityKind::Item => "item",
            EntityKind::Payment => "payment",
        }
    }

    pub fn unique_id_kind(&self) -> UniqueIdKind {
        match self {
            EntityKind::Customer | EntityKind::Item => UniqueIdKind::Text,
            EntityKind::Contract | EntityKind::ContractLine | EntityKind::Payment => {
                UniqueIdKind::Numeric
            }
        }
    }

    /// Whether INSDATE/UPDDATE can drive incremental classification
    ///
    /// Contract lines have no timestamps of their own; they inherit the
    /// timeline of their parent contract.
    pub fn has_reliable_timestamps(&self) -> bool {
        !matches!(self, EntityKind::ContractLine)
    }

    /// Whether the resolution index must cover every local record
    pub fn requires_exhaustive_index(&self) -> bool {
        matches!(self, EntityKind::Contract | EntityKind::ContractLine)
    }

    /// Whether the ERP offers a named query for this kind
    pub fn supports_named_query(&self) -> bool {
        matches!(
            self,
            EntityKind::Customer | EntityKind::Contract | EntityKind::Item
        )
    }

    /// Whether a full dataset may span several invocations
    pub fn is_resumable(&self) -> bool {
        matches!(self, EntityKind::ContractLine | EntityKind::Item)
    }

    pub fn write_strategy(&self) -> WriteStrategy {
        match self {
            EntityKind::Customer => WriteStrategy::FindThenWrite,
            _ => WriteStrategy::NativeUpsert,
        }
    }

    pub fn parent_gate(&self) -> ParentGate {
        match self {
            EntityKind::ContractLine => ParentGate::ContractWithCustomer,
            _ => ParentGate::None,
        }
    }

    /// Records per persistence batch
    pub fn batch_size(&self) -> usize {
        match self {
            EntityKind::ContractLine => 50,
            _ => 200,
        }
    }

    /// Maximum concurrent member writes while retrying a batch
    pub fn write_fan_out(&self) -> usize {
        match self {
            EntityKind::Contract | EntityKind::ContractLine => 10,
            _ => self.batch_size(),
        }
    }

    /// Local field holding the customer reference on this kind's records
    pub fn customer_ref_field(&self) -> Option<&'static str> {
        match self {
            EntityKind::Contract => Some("customer_id"),
            _ => None,
        }
    }

    /// Local field holding the parent reference on this kind's records
    pub fn parent_ref_field(&self) -> Option<&'static str> {
        match self {
            EntityKind::ContractLine => Some("contract_id"),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(EntityKind::Customer),
            "contract" => Ok(EntityKind::Contract),
            "contract_line" => Ok(EntityKind::ContractLine),
            "item" => Ok(EntityKind::Item),
            "payment" => Ok(EntityKind::Payment),
            other => Err(format!(
                "Unknown entity type '{other}'. Must be one of: customer, contract, contract_line, item, payment"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(EntityKind::from_str("INSTLINES").is_err());
    }

    #[test]
    fn test_contract_line_properties() {
        let kind = EntityKind::ContractLine;
        assert!(!kind.has_reliable_timestamps());
        assert!(kind.requires_exhaustive_index());
        assert!(kind.is_resumable());
        assert!(!kind.supports_named_query());
        assert_eq!(kind.parent_gate(), ParentGate::ContractWithCustomer);
        assert!(kind.batch_size() < EntityKind::Customer.batch_size());
        assert_eq!(kind.write_fan_out(), 10);
    }

    #[test]
    fn test_customer_uses_find_then_write() {
        assert_eq!(
            EntityKind::Customer.write_strategy(),
            WriteStrategy::FindThenWrite
        );
        assert_eq!(EntityKind::Customer.unique_id_kind(), UniqueIdKind::Text);
        assert_eq!(
            EntityKind::Payment.write_strategy(),
            WriteStrategy::NativeUpsert
        );
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&EntityKind::ContractLine).unwrap();
        assert_eq!(json, "\"contract_line\"");
    }
}
