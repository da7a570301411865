//! Downloaded entity record

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One server row as delivered by a download endpoint.
///
/// Business columns are kept verbatim; only the fields the mirror tables index
/// are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(Error::InvalidRecord(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// Server-assigned entity id (`id` field, number or numeric string).
    pub fn server_id(&self) -> Result<i64> {
        self.0
            .get("id")
            .and_then(value_as_i64)
            .ok_or_else(|| Error::InvalidRecord("record has no numeric 'id' field".to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field rendered as text; numbers are stringified, null and absent are `None`.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    /// Soft-delete flag. Rows without any recognised flag are active.
    ///
    /// `status` is never consulted: on orders it carries the approval stage.
    pub fn is_active(&self) -> bool {
        ["is_active", "active"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(value_as_flag))
            .unwrap_or(true)
    }

    /// Server-side modification stamp, if the row carries one.
    pub fn updated_at(&self) -> Option<String> {
        self.text("updated_at").or_else(|| self.text("updated_date"))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn value_as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "active" => Some(true),
            "0" | "false" | "no" | "inactive" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
