//! Item status payload returned by the per-item status fetch.

use crate::event::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Reverse;

/// Current status and history of one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    #[serde(default)]
    pub status_tracking_history: Vec<Value>,
    #[serde(default)]
    pub transition_errors: Vec<TransitionError>,
    #[serde(default)]
    pub audit: Vec<AuditEntry>,
}

/// A status transition the backend refused.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(flatten)]
    pub detail: Map<String, Value>,
}

/// One audit trail entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(flatten)]
    pub detail: Map<String, Value>,
}

fn instant(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value.and_then(|v| parse_timestamp(v).ok())
}

impl TransitionError {
    /// Parsed instant, if present and well-formed.
    #[must_use]
    pub fn at(&self) -> Option<DateTime<Utc>> {
        instant(self.timestamp.as_ref())
    }
}

impl AuditEntry {
    /// Parsed instant, if present and well-formed.
    #[must_use]
    pub fn at(&self) -> Option<DateTime<Utc>> {
        instant(self.timestamp.as_ref())
    }
}

impl ItemStatus {
    /// Audit entries most recent first; entries without a usable timestamp
    /// go last in input order.
    #[must_use]
    pub fn audit_newest_first(&self) -> Vec<&AuditEntry> {
        let mut entries: Vec<&AuditEntry> = self.audit.iter().collect();
        entries.sort_by_key(|e| Reverse(e.at()));
        entries
    }
}
