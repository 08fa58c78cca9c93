//! Board data structures: status styling, health snapshots and item updates

use crate::errors::{DashboardError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Status name used whenever an item reports nothing or an unconfigured status
pub const UNKNOWN_STATUS: &str = "unknown";

/// Longest category or item name the board accepts
pub const MAX_NAME_LEN: usize = 50;

/// Visual style of one status
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusStyle {
    pub color: String,
    #[serde(default)]
    pub pulse: bool,
}

/// Status name → style, as served by `/api/status-config`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct StatusConfig {
    styles: HashMap<String, StatusStyle>,
}

impl StatusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, status: &str, color: &str, pulse: bool) -> Self {
        self.styles.insert(
            status.to_lowercase(),
            StatusStyle {
                color: color.to_string(),
                pulse,
            },
        );
        self
    }

    /// Style for a reported status, falling back to the `unknown` entry.
    pub fn lookup(&self, status: Option<&str>) -> Option<&StatusStyle> {
        let key = status
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string());

        self.styles
            .get(&key)
            .or_else(|| self.styles.get(UNKNOWN_STATUS))
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }
}

/// One monitored item
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl HealthItem {
    /// Reported status, empty strings count as missing
    pub fn status(&self) -> Option<&str> {
        non_empty(&self.status)
    }

    pub fn message(&self) -> Option<&str> {
        non_empty(&self.message)
    }

    pub fn url(&self) -> Option<&str> {
        non_empty(&self.url)
    }

    /// Status text with the first character upper-cased, `Unknown` when absent
    pub fn display_status(&self) -> String {
        match self.status() {
            Some(status) => capitalize(status),
            None => "Unknown".to_string(),
        }
    }

    /// Parsed `last_updated`.
    ///
    /// `None` when the field is absent, `Some(Err(raw))` when it cannot be
    /// read as a timestamp. Values without an offset are taken as UTC.
    pub fn last_updated_at(&self) -> Option<std::result::Result<DateTime<Utc>, &str>> {
        let raw = non_empty(&self.last_updated)?;
        Some(parse_timestamp(raw).ok_or(raw))
    }
}

/// A named item inside a category
#[derive(Clone, Debug, PartialEq)]
pub struct HealthEntry {
    pub name: String,
    pub item: HealthItem,
}

/// A category and its items in board order
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub name: String,
    pub items: Vec<HealthEntry>,
}

/// Snapshot of `/api/health`, preserving the order the board sent
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HealthData {
    pub categories: Vec<Category>,
}

impl HealthData {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total item count over all categories
    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }
}

impl<'de> Deserialize<'de> for HealthData {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut categories = Vec::with_capacity(raw.len());

        for (name, items) in raw {
            let items = match items {
                Value::Object(items) => items,
                Value::Null => Map::new(),
                other => {
                    return Err(<D::Error as de::Error>::custom(format!(
                        "category '{}' must be an object, got {}",
                        name, other
                    )));
                }
            };

            let mut entries = Vec::with_capacity(items.len());
            for (item_name, value) in items {
                let item: HealthItem = serde_json::from_value(value).map_err(|e| {
                    <D::Error as de::Error>::custom(format!("item '{}' in '{}': {}", item_name, name, e))
                })?;
                entries.push(HealthEntry {
                    name: item_name,
                    item,
                });
            }

            categories.push(Category {
                name,
                items: entries,
            });
        }

        Ok(HealthData { categories })
    }
}

struct EntriesRef<'a>(&'a [HealthEntry]);

impl Serialize for EntriesRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(&entry.name, &entry.item)?;
        }
        map.end()
    }
}

impl Serialize for HealthData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for category in &self.categories {
            map.serialize_entry(&category.name, &EntriesRef(&category.items))?;
        }
        map.end()
    }
}

/// Fields to change on an item; absent fields are left alone by the board
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.message.is_none() && self.url.is_none()
    }

    /// Check the update and lower-case its status
    pub fn normalized(mut self) -> Result<Self> {
        if let Some(status) = self.status.as_mut() {
            if status.trim().is_empty() {
                return Err(DashboardError::Validation("status cannot be empty".to_string()));
            }
            *status = status.to_lowercase();
        }

        if let Some(url) = &self.url {
            validate_url(url)?;
        }

        Ok(self)
    }
}

/// Check a category or item name against the board's naming rules
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(DashboardError::Validation(format!(
            "Invalid {}: must be 1-{} characters",
            kind, MAX_NAME_LEN
        )));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.');
    if let Some(bad) = name.chars().find(|c| !allowed(*c)) {
        return Err(DashboardError::Validation(format!(
            "Invalid {}: character '{}' is not allowed",
            kind, bad
        )));
    }

    Ok(())
}

/// Empty clears the link; anything else must be http or https
pub fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Ok(());
    }

    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("http://")
        .or_else(|| lower.strip_prefix("https://"));

    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(DashboardError::Validation(format!(
            "Invalid url '{}': only http and https links are allowed",
            url
        ))),
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_health_data_preserves_order() {
        let data: HealthData = serde_json::from_str(
            r#"{
                "Zeta": {"b": {"status": "passing"}, "a": {}},
                "Alpha": {},
                "Mid": {"only": {"message": "hi"}}
            }"#,
        )
        .unwrap();

        let names: Vec<&str> = data.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);

        let zeta: Vec<&str> = data.categories[0].items.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(zeta, vec!["b", "a"]);
        assert_eq!(data.item_count(), 3);
    }

    #[test]
    fn test_health_data_null_fields_are_absent() {
        let data: HealthData = serde_json::from_str(
            r#"{"Builds": {"Main": {"status": "unknown", "last_updated": null, "message": "", "url": ""}}}"#,
        )
        .unwrap();

        let item = &data.category("Builds").unwrap().items[0].item;
        assert_eq!(item.status(), Some("unknown"));
        assert!(item.last_updated_at().is_none());
        assert!(item.message().is_none());
        assert!(item.url().is_none());
    }

    #[test]
    fn test_health_data_rejects_non_object_category() {
        let result: std::result::Result<HealthData, _> = serde_json::from_str(r#"{"Builds": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_health_data_serializes_in_order() {
        let data: HealthData =
            serde_json::from_str(r#"{"B": {"y": {"status": "down"}}, "A": {}}"#).unwrap();
        let text = serde_json::to_string(&data).unwrap();
        assert_eq!(text, r#"{"B":{"y":{"status":"down"}},"A":{}}"#);
    }

    #[test]
    fn test_status_lookup_falls_back_to_unknown() {
        let config = StatusConfig::new()
            .with_style("passing", "green", false)
            .with_style("unknown", "grey", false);

        assert_eq!(config.lookup(Some("PASSING")).unwrap().color, "green");
        assert_eq!(config.lookup(Some("exploded")).unwrap().color, "grey");
        assert_eq!(config.lookup(None).unwrap().color, "grey");
        assert_eq!(config.lookup(Some("")).unwrap().color, "grey");

        assert!(StatusConfig::new().lookup(Some("passing")).is_none());
    }

    #[test]
    fn test_status_config_from_json() {
        let config: StatusConfig = serde_json::from_str(
            r#"{"down": {"color": "red", "pulse": true}, "unknown": {"color": "grey"}}"#,
        )
        .unwrap();
        assert_eq!(config.len(), 2);
        assert!(config.lookup(Some("down")).unwrap().pulse);
        assert!(!config.lookup(None).unwrap().pulse);
    }

    #[test]
    fn test_display_status() {
        let item = HealthItem {
            status: Some("passing".to_string()),
            ..Default::default()
        };
        assert_eq!(item.display_status(), "Passing");
        assert_eq!(HealthItem::default().display_status(), "Unknown");
    }

    #[test]
    fn test_last_updated_parsing() {
        let item = HealthItem {
            last_updated: Some("2023-01-01T12:00:00Z".to_string()),
            ..Default::default()
        };
        let expected = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(item.last_updated_at(), Some(Ok(expected)));

        let naive = HealthItem {
            last_updated: Some("2023-01-01T12:00:00.250000".to_string()),
            ..Default::default()
        };
        assert!(matches!(naive.last_updated_at(), Some(Ok(_))));

        let garbage = HealthItem {
            last_updated: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert_eq!(garbage.last_updated_at(), Some(Err("yesterday")));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("category_name", "Valid_Name-123").is_ok());
        assert!(validate_name("item_name", "Valid Item.Name").is_ok());
        assert!(validate_name("category_name", &"A".repeat(51)).is_err());
        assert!(validate_name("category_name", "").is_err());

        for bad in ["<script>", "name/with/slashes", "name with @", "name!", "item$"] {
            assert!(validate_name("item_name", bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com/path?query=1").is_ok());
        assert!(validate_url("").is_ok());

        for bad in [
            "javascript:alert(1)",
            "ftp://example.com",
            "data:text/plain;base64,SGVsbG8sIFdvcmxkIQ==",
            "www.google.com",
            "http://",
        ] {
            assert!(validate_url(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_item_update_normalized() {
        let update = ItemUpdate {
            status: Some("PASSING".to_string()),
            ..Default::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(update.status.as_deref(), Some("passing"));

        let bad = ItemUpdate {
            url: Some("javascript:bad()".to_string()),
            message: Some("Updated Message".to_string()),
            ..Default::default()
        };
        assert!(bad.normalized().is_err());

        assert!(ItemUpdate::default().is_empty());
        let json = serde_json::to_value(ItemUpdate {
            message: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"message": ""}));
    }
}
