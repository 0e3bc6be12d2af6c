//! Event data model for shipment and package histories.
//!
//! An [`Event`] is the validated, normalized form of one entry of a backend
//! history list. Only `code`, `kind` and `timestamp` drive the timeline;
//! `description` and `detail` are carried for display.
//!
//! Raw backend entries enter through [`normalize::normalize`], which rejects
//! entries missing the required fields and reports how many were dropped.

pub mod normalize;
pub mod types;

pub use normalize::{
    NormalizeReport, RawEvent, RejectReason, Rejected, normalize, parse_timestamp, parse_timestamp_str,
};
pub use types::{EventKind, UnknownEventKind};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single normalized event.
///
/// Identity is not unique: the same `code` and `timestamp` may appear twice
/// (a corrected duplicate status, for instance) and both copies are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Status or event-type identifier, e.g. `"2100"`.
    pub code: String,

    /// Human-readable label from the backend. Display only.
    #[serde(default)]
    pub description: String,

    /// Event family used for partitioning.
    pub kind: EventKind,

    /// Original kind string when it was not a recognised spelling and the
    /// event was classified as a package event by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_kind: Option<String>,

    /// Event instant.
    pub timestamp: DateTime<Utc>,

    /// Kind-dependent attributes (courier, signee, case fields, GPS, ...).
    /// Never consulted for grouping.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub detail: Map<String, Value>,
}

impl Event {
    /// Create an event with an empty description and detail bag.
    #[must_use]
    pub fn new(code: impl Into<String>, kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            description: String::new(),
            kind,
            raw_kind: None,
            timestamp,
            detail: Map::new(),
        }
    }

    /// Set the display description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add one detail attribute.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }

    /// Returns `true` for lifecycle status events.
    #[must_use]
    pub fn is_status(&self) -> bool {
        self.kind == EventKind::Status
    }

    /// Returns `true` when the backend kind was not recognised.
    #[must_use]
    pub const fn has_unrecognized_kind(&self) -> bool {
        self.raw_kind.is_some()
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.timestamp.to_rfc3339(),
            self.kind,
            self.code,
            self.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    #[test]
    fn builder_sets_fields() {
        let event = Event::new("2100", EventKind::Status, ts(100))
            .with_description("En reparto")
            .with_detail("courier", "C-17");
        assert_eq!(event.code, "2100");
        assert_eq!(event.description, "En reparto");
        assert!(event.is_status());
        assert_eq!(event.detail.get("courier"), Some(&Value::from("C-17")));
        assert!(!event.has_unrecognized_kind());
    }

    #[test]
    fn serde_omits_empty_detail_and_raw_kind() {
        let event = Event::new("0410", EventKind::PackageEvent, ts(0));
        let json = serde_json::to_value(&event).expect("serialize");
        assert!(json.get("detail").is_none());
        assert!(json.get("raw_kind").is_none());
        assert_eq!(json["kind"], "EVENT");
    }

    #[test]
    fn display_is_tab_separated() {
        let event = Event::new("2500", EventKind::Status, ts(0)).with_description("Entregado");
        let line = event.to_string();
        assert_eq!(line.split('\t').count(), 4);
        assert!(line.ends_with("Entregado"));
    }
}
