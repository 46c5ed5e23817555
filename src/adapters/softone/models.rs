//! SoftOne web services wire models
//!
//! Every call is a JSON POST carrying a `service` discriminator. Responses
//! share one envelope: a `success` flag plus either `{data, keys}` (rows as
//! positional arrays) or `{rows}` (rows as objects).

use crate::domain::errors::RemoteError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `login` request
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub service: &'static str,
    pub username: &'a str,
    pub password: &'a str,
    #[serde(rename = "appId")]
    pub app_id: &'a str,
}

/// `authenticate` request, selecting company/branch/module for the session
#[derive(Debug, Serialize)]
pub struct AuthenticateRequest<'a> {
    pub service: &'static str,
    #[serde(rename = "clientID")]
    pub client_id: &'a str,
    #[serde(rename = "COMPANY")]
    pub company: &'a str,
    #[serde(rename = "BRANCH")]
    pub branch: &'a str,
    #[serde(rename = "MODULE")]
    pub module: &'a str,
    #[serde(rename = "REFID")]
    pub refid: &'a str,
}

/// Generic table read
#[derive(Debug, Serialize)]
pub struct GetTableRequest<'a> {
    pub service: &'static str,
    #[serde(rename = "clientID")]
    pub client_id: &'a str,
    #[serde(rename = "appId")]
    pub app_id: &'a str,
    #[serde(rename = "tableName")]
    pub table_name: &'a str,
    /// Comma-separated field list
    pub fields: String,
    pub filter: &'a str,
    pub version: &'static str,
}

/// Named query (SQL script) read
#[derive(Debug, Serialize)]
pub struct SqlDataRequest<'a> {
    pub service: &'static str,
    #[serde(rename = "clientID")]
    pub client_id: &'a str,
    #[serde(rename = "appId")]
    pub app_id: &'a str,
    #[serde(rename = "sqlName")]
    pub sql_name: &'a str,
    /// Changed-since timestamp, `YYYY-MM-DD HH:MM:SS`
    pub param1: &'a str,
}

/// Response envelope shared by all services
#[derive(Debug, Default, Deserialize)]
pub struct ServiceResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(rename = "clientID", default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub data: Option<Vec<Value>>,

    /// Field names, either plain strings or `{ "name": ... }` objects
    #[serde(default)]
    pub keys: Option<Vec<Value>>,

    #[serde(default)]
    pub rows: Option<Vec<Value>>,

    #[serde(rename = "totalcount", default)]
    pub total_count: Option<u64>,
}

impl ServiceResponse {
    /// Error text for a `success: false` response
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "service returned success=false".to_string())
    }

    /// Converts a data response into a raw page
    pub fn into_page(self) -> Result<RawPage, RemoteError> {
        let keys = self
            .keys
            .unwrap_or_default()
            .into_iter()
            .filter_map(|key| match key {
                Value::String(name) => Some(name),
                Value::Object(obj) => obj
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect();

        let raw_rows = self.data.or(self.rows).unwrap_or_default();
        let mut rows = Vec::with_capacity(raw_rows.len());
        for (index, row) in raw_rows.into_iter().enumerate() {
            match row {
                Value::Array(values) => rows.push(RawRow::Positional(values)),
                Value::Object(fields) => rows.push(RawRow::Keyed(fields)),
                other => {
                    return Err(RemoteError::InvalidResponse(format!(
                        "row {index} is neither an array nor an object: {other}"
                    )))
                }
            }
        }

        Ok(RawPage { rows, keys })
    }
}

/// One row as the ERP returned it
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    /// Values to be zipped with the page's key list
    Positional(Vec<Value>),
    /// Ready-made field map
    Keyed(Map<String, Value>),
}

/// A page of rows before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub rows: Vec<RawRow>,
    pub keys: Vec<String>,
}

impl RawPage {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends another page, keeping the first non-empty key list
    pub fn extend(&mut self, other: RawPage) {
        if self.keys.is_empty() {
            self.keys = other.keys;
        }
        self.rows.extend(other.rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_page_with_data_and_keys() {
        let response: ServiceResponse = serde_json::from_value(json!({
            "success": true,
            "keys": ["INST", {"name": "NAME"}],
            "data": [["3018", "Monthly"], ["3019", "Annual"]],
            "totalcount": 2
        }))
        .unwrap();

        let page = response.into_page().unwrap();
        assert_eq!(page.keys, vec!["INST", "NAME"]);
        assert_eq!(page.len(), 2);
        assert!(matches!(page.rows[0], RawRow::Positional(_)));
    }

    #[test]
    fn test_into_page_with_rows() {
        let response: ServiceResponse = serde_json::from_value(json!({
            "success": true,
            "rows": [{"code": "C001"}]
        }))
        .unwrap();

        let page = response.into_page().unwrap();
        assert!(page.keys.is_empty());
        assert!(matches!(page.rows[0], RawRow::Keyed(_)));
    }

    #[test]
    fn test_into_page_rejects_scalar_rows() {
        let response: ServiceResponse = serde_json::from_value(json!({
            "success": true,
            "rows": [42]
        }))
        .unwrap();

        assert!(response.into_page().is_err());
    }

    #[test]
    fn test_get_table_request_shape() {
        let request = GetTableRequest {
            service: "getTable",
            client_id: "abc",
            app_id: "1001",
            table_name: "INSTLINES",
            fields: "INSTLINES,INST".to_string(),
            filter: "INST=3018",
            version: "1",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["service"], "getTable");
        assert_eq!(value["tableName"], "INSTLINES");
        assert_eq!(value["clientID"], "abc");
    }
}
