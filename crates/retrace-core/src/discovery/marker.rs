//! `entries.json` metadata marker

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Marker co-located with history snapshots.
///
/// Only `resource` is used for discovery and must be a string. Every other
/// field is informational: a value of an unexpected type reads as absent
/// instead of failing the whole marker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryMarker {
    #[serde(deserialize_with = "lenient")]
    pub version: Option<u32>,
    pub resource: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub entries: Vec<HistoryEntry>,
}

/// One snapshot listed in a marker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub source: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<i64>,
}

/// `None` instead of an error when the value has the wrong shape
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Keeps the well-formed elements of an array; anything else is an empty list
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

impl HistoryMarker {
    /// The `resource` field when present and non-blank
    pub fn resource(&self) -> Option<&str> {
        self.resource
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_marker() {
        let marker: HistoryMarker = serde_json::from_str(
            r#"{"version":1,"resource":"file:///ws/a.txt","entries":[{"id":"Ab12.txt","source":"undoRedo.source","timestamp":1700000000000}]}"#,
        )
        .unwrap();
        assert_eq!(marker.resource(), Some("file:///ws/a.txt"));
        assert_eq!(marker.entries.len(), 1);
        assert_eq!(marker.entries[0].id.as_deref(), Some("Ab12.txt"));
        assert_eq!(marker.entries[0].timestamp, Some(1700000000000));
    }

    #[test]
    fn test_unexpected_field_shapes_do_not_hide_resource() {
        let null_entries: HistoryMarker =
            serde_json::from_str(r#"{"resource":"file:///ws/a.txt","entries":null}"#).unwrap();
        assert_eq!(null_entries.resource(), Some("file:///ws/a.txt"));
        assert!(null_entries.entries.is_empty());

        let string_version: HistoryMarker =
            serde_json::from_str(r#"{"resource":"file:///ws/a.txt","version":"2"}"#).unwrap();
        assert_eq!(string_version.resource(), Some("file:///ws/a.txt"));
        assert_eq!(string_version.version, None);

        let float_timestamp: HistoryMarker = serde_json::from_str(
            r#"{"resource":"file:///ws/a.txt","entries":[{"id":"x","timestamp":1.7e12},42]}"#,
        )
        .unwrap();
        assert_eq!(float_timestamp.entries.len(), 1);
        assert_eq!(float_timestamp.entries[0].id.as_deref(), Some("x"));
        assert_eq!(float_timestamp.entries[0].timestamp, None);
    }

    #[test]
    fn test_non_string_resource_is_rejected() {
        assert!(serde_json::from_str::<HistoryMarker>(r#"{"resource":7}"#).is_err());
    }

    #[test]
    fn test_missing_resource() {
        let marker: HistoryMarker = serde_json::from_str(r#"{"version":1}"#).unwrap();
        assert_eq!(marker.resource(), None);

        let blank: HistoryMarker = serde_json::from_str(r#"{"resource":"  "}"#).unwrap();
        assert_eq!(blank.resource(), None);
    }
}
