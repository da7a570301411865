//! Inbound push payload

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::record::{value_as_flag, value_as_i64};
use crate::error::{Error, Result};

/// A push notification asking the client to refresh specific rows.
///
/// Push gateways are loose about types: ids arrive as numbers or numeric
/// strings, flags as `"0"`/`"1"`, and `data` is sometimes a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub ids: Vec<NotificationTarget>,
    #[serde(default)]
    pub data_message: String,
    #[serde(default, deserialize_with = "data_object")]
    pub data: NotificationData,
}

/// A user addressed by the push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTarget {
    #[serde(deserialize_with = "lenient_i64")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub silent_push: bool,
}

/// Refresh targets of a push.
///
/// Each `data_ids` entry decodes on its own: entries that are not a
/// `{table, id}` pair of integers land in `malformed` instead of failing the
/// whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawNotificationData")]
pub struct NotificationData {
    pub data_ids: Vec<DataRef>,
    pub show_notification: bool,
    pub message: String,
    /// Undecodable `data_ids` entries, as compact JSON
    #[serde(skip_serializing)]
    pub malformed: Vec<String>,
}

#[derive(Deserialize)]
struct RawNotificationData {
    #[serde(default)]
    data_ids: Vec<Value>,
    #[serde(default = "default_true", deserialize_with = "lenient_flag")]
    show_notification: bool,
    #[serde(default)]
    message: String,
}

impl From<RawNotificationData> for NotificationData {
    fn from(raw: RawNotificationData) -> Self {
        let mut data_ids = Vec::with_capacity(raw.data_ids.len());
        let mut malformed = Vec::new();
        for entry in raw.data_ids {
            match serde_json::from_value::<DataRef>(entry.clone()) {
                Ok(data_ref) => data_ids.push(data_ref),
                Err(_) => malformed.push(entry.to_string()),
            }
        }
        Self {
            data_ids,
            show_notification: raw.show_notification,
            message: raw.message,
            malformed,
        }
    }
}

/// Reference to one row that changed on the server.
///
/// `table` stays a raw wire value so a payload naming a table this client does
/// not know about is skipped rather than rejected wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRef {
    #[serde(deserialize_with = "lenient_i64")]
    pub table: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
}

impl Default for NotificationData {
    fn default() -> Self {
        Self {
            data_ids: Vec::new(),
            show_notification: true,
            message: String::new(),
            malformed: Vec::new(),
        }
    }
}

impl NotificationPayload {
    /// Decode a raw payload.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|error| Error::InvalidPayload(error.to_string()))
    }

    /// Whether the push should stay invisible for `user_id`.
    ///
    /// A payload with `show_notification = 0` is silent for everyone; otherwise
    /// the per-user `silent_push` flag decides.
    pub fn is_silent_for(&self, user_id: i64) -> bool {
        if !self.data.show_notification {
            return true;
        }
        self.ids
            .iter()
            .any(|target| target.user_id == user_id && target.silent_push)
    }
}

const fn default_true() -> bool {
    true
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_as_i64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected an integer, got {value}")))
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_as_flag(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected a 0/1 flag, got {value}")))
}

fn data_object<'de, D>(deserializer: D) -> std::result::Result<NotificationData, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(NotificationData::default()),
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}
