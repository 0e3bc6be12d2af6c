//! Normalization of raw backend history entries into [`Event`]s.
//!
//! The backend returns loosely-typed JSON objects. An entry becomes an event
//! only if it carries a non-empty `code`, a non-empty kind (`type` or `kind`)
//! and a timestamp (`timestamp` or `date`) that parses. Everything else on
//! the entry lands in [`Event::detail`] untouched.
//!
//! Rejected entries never abort the batch: they are counted in a
//! [`NormalizeReport`] so the caller can surface the discrepancy. This holds
//! for entries that are not objects at all, or that repeat a field under both
//! of its names (`date` and `timestamp`, `type` and `kind`).
//!
//! Accepted timestamp forms:
//!
//! - RFC 3339 (`2024-03-01T10:15:00+01:00`, `2024-03-01T09:15:00Z`)
//! - naive ISO (`2024-03-01T09:15:00`, `2024-03-01T09:15:00.250`), read as UTC
//! - naive SQL-style (`2024-03-01 09:15:00`), read as UTC
//! - integer epoch milliseconds, as a JSON number or a digit-only string

use super::{Event, EventKind};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// One backend history entry as deserialized, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,

    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,

    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,

    /// Every other field of the entry.
    #[serde(flatten)]
    pub detail: Map<String, Value>,
}

impl RawEvent {
    /// Read one history entry from arbitrary JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RejectReason::NotAnObject`] for anything but a JSON object and
    /// [`RejectReason::Malformed`] when the object does not fit the entry shape,
    /// such as a field given under both of its names.
    pub fn from_value(value: Value) -> Result<Self, RejectReason> {
        let found = match value {
            Value::Object(map) => {
                return serde_json::from_value(Value::Object(map)).map_err(|e| RejectReason::Malformed {
                    message: e.to_string(),
                });
            }
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
        };
        Err(RejectReason::NotAnObject {
            found: found.to_string(),
        })
    }
}

/// Why a raw entry was excluded from the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("entry is {found}, not an object")]
    NotAnObject { found: String },
    #[error("malformed entry: {message}")]
    Malformed { message: String },
    #[error("missing code")]
    MissingCode,
    #[error("code is neither a string nor a number")]
    InvalidCode,
    #[error("missing kind")]
    MissingKind,
    #[error("kind is not a string")]
    InvalidKind,
    #[error("missing timestamp")]
    MissingTimestamp,
    #[error("unparseable timestamp '{raw}'")]
    UnparseableTimestamp { raw: String },
}

/// A rejected entry and its position in the input list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejected {
    /// Zero-based index in the raw input.
    pub index: usize,
    #[serde(flatten)]
    pub reason: RejectReason,
}

/// Outcome counts of one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Entries that became events.
    pub accepted: usize,
    /// Entries excluded from grouping.
    pub rejected: Vec<Rejected>,
}

impl NormalizeReport {
    /// Total entries processed (accepted + rejected).
    #[must_use]
    pub fn total(&self) -> usize {
        self.accepted + self.rejected.len()
    }

    /// Returns `true` if nothing was rejected.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Fold another report into this one.
    ///
    /// Indices of the absorbed report keep referring to its own input list.
    pub fn absorb(&mut self, other: &Self) {
        self.accepted += other.accepted;
        self.rejected.extend(other.rejected.iter().cloned());
    }
}

impl Event {
    /// Validate a raw entry.
    ///
    /// # Errors
    ///
    /// Returns the first [`RejectReason`] found, checking code, kind and
    /// timestamp in that order.
    pub fn try_from_raw(raw: RawEvent) -> Result<Self, RejectReason> {
        let code = match raw.code {
            None | Some(Value::Null) => return Err(RejectReason::MissingCode),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(RejectReason::InvalidCode),
        };
        if code.is_empty() {
            return Err(RejectReason::MissingCode);
        }

        let raw_kind = match raw.kind {
            None | Some(Value::Null) => return Err(RejectReason::MissingKind),
            Some(Value::String(s)) => s,
            Some(_) => return Err(RejectReason::InvalidKind),
        };
        if raw_kind.trim().is_empty() {
            return Err(RejectReason::MissingKind);
        }
        let (kind, recognised) = EventKind::classify(&raw_kind);

        let timestamp = match raw.timestamp {
            None => return Err(RejectReason::MissingTimestamp),
            Some(ref value) => parse_timestamp(value)?,
        };

        let description = match raw.description {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Ok(Self {
            code,
            description,
            kind,
            raw_kind: (!recognised).then_some(raw_kind),
            timestamp,
            detail: raw.detail,
        })
    }
}

/// Parse a backend timestamp value.
///
/// # Errors
///
/// Returns [`RejectReason::MissingTimestamp`] for `null` or blank strings and
/// [`RejectReason::UnparseableTimestamp`] for anything else that does not match
/// a supported form.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, RejectReason> {
    match value {
        Value::Null => Err(RejectReason::MissingTimestamp),
        Value::String(s) if s.trim().is_empty() => Err(RejectReason::MissingTimestamp),
        Value::String(s) => {
            parse_timestamp_str(s).ok_or_else(|| RejectReason::UnparseableTimestamp { raw: s.clone() })
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| RejectReason::UnparseableTimestamp { raw: n.to_string() }),
        other => Err(RejectReason::UnparseableTimestamp {
            raw: other.to_string(),
        }),
    }
}

/// Parse a timestamp string in any of the supported forms.
#[must_use]
pub fn parse_timestamp_str(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);
    }

    None
}

/// Normalize a raw history list, preserving input order of accepted events.
pub fn normalize(raw: impl IntoIterator<Item = Value>) -> (Vec<Event>, NormalizeReport) {
    let mut events = Vec::new();
    let mut report = NormalizeReport::default();

    for (index, entry) in raw.into_iter().enumerate() {
        match RawEvent::from_value(entry).and_then(Event::try_from_raw) {
            Ok(event) => {
                if let Some(ref raw_kind) = event.raw_kind {
                    warn!(index, raw_kind = %raw_kind, "unrecognised kind treated as package event");
                }
                events.push(event);
                report.accepted += 1;
            }
            Err(reason) => {
                warn!(index, %reason, "event excluded from timeline");
                report.rejected.push(Rejected { index, reason });
            }
        }
    }

    (events, report)
}
