use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record as returned by Airtable list/lookup calls.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Returns the named field as a string slice, if present and textual.
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Returns the named field as a float, if present and numeric.
    #[must_use]
    pub fn field_f64(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }
}

/// Response envelope for record listing; `offset` is the continuation token
/// for the next page, absent on the last page.
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    pub records: Vec<Record>,
    pub offset: Option<String>,
}

/// One entry in a bulk PATCH payload: destination record id plus the field
/// values to write.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRecord {
    pub id: String,
    pub fields: Map<String, Value>,
}
