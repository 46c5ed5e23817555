//! Record normalization
//!
//! Turns a [`RawPage`] from the ERP into [`RemoteRecord`]s whose field names
//! match the integration's declared remote fields exactly, with values
//! coerced by a fixed field-name type table. Nothing downstream of this
//! module knows whether the ERP answered with positional rows or objects.

use crate::adapters::softone::{RawPage, RawRow};
use crate::domain::record::ERP_DATETIME_FORMAT;
use crate::domain::{FieldValue, RemoteRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;

/// Placeholder field name the ERP uses for "no field selected"
pub const EMPTY_FIELD: &str = "__EMPTY__";

/// The ERP's "no date" value
pub const ZERO_DATE: &str = "1899-12-30 00:00:00";

const INTEGER_FIELDS: &[&str] = &[
    "TRDR", "INST", "INSTLINES", "MTRL", "FINDOC", "COMPANY", "BRANCH", "ISACTIVE", "SODTYPE",
    "LINENUM",
];

const FLOAT_FIELDS: &[&str] = &[
    "PRICE", "QTY", "QTY1", "AMOUNT", "SUMAMNT", "NETAMNT", "DISC1PRC",
];

const TIMESTAMP_FIELDS: &[&str] = &[
    "INSDATE",
    "UPDDATE",
    "FROMDATE",
    "FINALDATE",
    "TRNDATE",
    "WDATEFROM",
    "WDATETO",
    "GDATEFROM",
    "GDATETO",
];

/// Coercion class of a remote field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Timestamp,
    Text,
}

impl FieldType {
    /// Looks the field up in the type table, ignoring case
    pub fn of(field: &str) -> Self {
        let upper = field.to_ascii_uppercase();
        let name = upper.as_str();
        if INTEGER_FIELDS.contains(&name) {
            FieldType::Integer
        } else if FLOAT_FIELDS.contains(&name) {
            FieldType::Float
        } else if TIMESTAMP_FIELDS.contains(&name) {
            FieldType::Timestamp
        } else {
            FieldType::Text
        }
    }
}

/// Normalizes every row of a page
///
/// Positional rows are zipped with the page's keys, or with `declared_fields`
/// when the ERP sent no keys. Keyed rows are re-keyed to the declared names
/// case-insensitively; fields not declared keep the ERP's casing.
pub fn normalize(page: RawPage, declared_fields: &[String]) -> Vec<RemoteRecord> {
    let keys: Vec<String> = if page.keys.is_empty() {
        declared_fields.to_vec()
    } else {
        page.keys
    };

    let declared: HashMap<String, &String> = declared_fields
        .iter()
        .map(|f| (f.to_ascii_lowercase(), f))
        .collect();

    let canonical = |name: &str| -> String {
        declared
            .get(&name.to_ascii_lowercase())
            .map(|f| (*f).clone())
            .unwrap_or_else(|| name.to_string())
    };

    page.rows
        .into_iter()
        .map(|row| {
            let pairs: Vec<(String, Value)> = match row {
                RawRow::Positional(values) => keys.iter().cloned().zip(values).collect(),
                RawRow::Keyed(map) => map.into_iter().collect(),
            };

            pairs
                .into_iter()
                .filter(|(name, _)| !name.eq_ignore_ascii_case(EMPTY_FIELD))
                .map(|(name, value)| {
                    let coerced = coerce(&name, &value);
                    (canonical(&name), coerced)
                })
                .collect()
        })
        .collect()
}

/// Coerces one raw value according to the field's type
///
/// Values that fail to parse become [`FieldValue::Null`].
pub fn coerce(field: &str, value: &Value) -> FieldValue {
    if value.is_null() {
        return FieldValue::Null;
    }

    match FieldType::of(field) {
        FieldType::Integer => parse_integer(value).map_or(FieldValue::Null, FieldValue::Int),
        FieldType::Float => parse_float(value).map_or(FieldValue::Null, FieldValue::Float),
        FieldType::Timestamp => parse_timestamp(value).map_or(FieldValue::Null, FieldValue::Timestamp),
        FieldType::Text => match value {
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        },
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        // Greek locale exports sometimes use a decimal comma
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() || raw == ZERO_DATE {
        return None;
    }

    NaiveDateTime::parse_from_str(raw, ERP_DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
        .filter(|ts| ts.format(ERP_DATETIME_FORMAT).to_string() != ZERO_DATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn declared(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn ts(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, ERP_DATETIME_FORMAT).unwrap()
    }

    #[test]
    fn test_positional_rows_drop_empty_placeholder() {
        let page = RawPage {
            rows: vec![
                RawRow::Positional(vec![json!("1001"), json!(""), json!("ACME")]),
                RawRow::Positional(vec![json!("1002"), json!("x"), json!("Globex")]),
            ],
            keys: declared(&["TRDR", "__EMPTY__", "NAME"]),
        };

        let records = normalize(page, &declared(&["TRDR", "NAME"]));

        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(!record.contains(EMPTY_FIELD));
            assert_eq!(record.len(), 2);
        }
        assert_eq!(records[0].get("TRDR"), Some(&FieldValue::Int(1001)));
        assert_eq!(records[1].get("NAME"), Some(&FieldValue::Text("Globex".into())));
    }

    #[test]
    fn test_positional_rows_fall_back_to_declared_fields() {
        let page = RawPage {
            rows: vec![RawRow::Positional(vec![json!("7"), json!("Main lot")])],
            keys: Vec::new(),
        };

        let records = normalize(page, &declared(&["INST", "NAME"]));

        assert_eq!(records[0].get("INST"), Some(&FieldValue::Int(7)));
        assert_eq!(records[0].get("NAME"), Some(&FieldValue::Text("Main lot".into())));
    }

    #[test]
    fn test_keyed_rows_are_rekeyed_case_insensitively() {
        let mut row = serde_json::Map::new();
        row.insert("trdr".into(), json!(15));
        row.insert("Name".into(), json!("Initech"));
        row.insert("EXTRA".into(), json!("kept"));
        let page = RawPage {
            rows: vec![RawRow::Keyed(row)],
            keys: Vec::new(),
        };

        let records = normalize(page, &declared(&["TRDR", "NAME"]));

        assert_eq!(records[0].get("TRDR"), Some(&FieldValue::Int(15)));
        assert_eq!(records[0].get("NAME"), Some(&FieldValue::Text("Initech".into())));
        assert_eq!(records[0].get("EXTRA"), Some(&FieldValue::Text("kept".into())));
        assert!(records[0].get("trdr").is_none());
    }

    #[test_case("TRDR", json!("0042"), FieldValue::Int(42) ; "integer from padded string")]
    #[test_case("trdr", json!(42), FieldValue::Int(42) ; "integer field name is case insensitive")]
    #[test_case("INST", json!("12.0"), FieldValue::Int(12) ; "integer from whole float string")]
    #[test_case("INST", json!("abc"), FieldValue::Null ; "integer parse failure is null")]
    #[test_case("PRICE", json!("12,50"), FieldValue::Float(12.5) ; "float with decimal comma")]
    #[test_case("QTY", json!(3), FieldValue::Float(3.0) ; "float from integer")]
    #[test_case("AMOUNT", json!("n/a"), FieldValue::Null ; "float parse failure is null")]
    #[test_case("INSDATE", json!("1899-12-30 00:00:00"), FieldValue::Null ; "zero date is null")]
    #[test_case("INSDATE", json!(""), FieldValue::Null ; "empty date is null")]
    #[test_case("NAME", json!(17), FieldValue::Text("17".into()) ; "unknown field becomes text")]
    #[test_case("NAME", Value::Null, FieldValue::Null ; "null stays null")]
    fn test_coerce(field: &str, raw: Value, expected: FieldValue) {
        assert_eq!(coerce(field, &raw), expected);
    }

    #[test_case("2024-03-01 10:15:00", "2024-03-01 10:15:00" ; "native format")]
    #[test_case("2024-03-01", "2024-03-01 00:00:00" ; "date only")]
    #[test_case("2024-03-01T10:15:00Z", "2024-03-01 10:15:00" ; "rfc3339")]
    fn test_coerce_timestamp(raw: &str, expected: &str) {
        assert_eq!(
            coerce("UPDDATE", &json!(raw)),
            FieldValue::Timestamp(ts(expected))
        );
    }
}
