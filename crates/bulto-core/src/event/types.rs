//! Event kind enum covering the event families the tracking backend emits.
//!
//! The backend labels every event with a `type` string. Two historical
//! spellings (`EVENT` and `SHIPPING_ITEM_EVENT_V1`) denote the same package
//! scan family and collapse onto [`EventKind::PackageEvent`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four event families the timeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Lifecycle status transition ("In transit", "Delivered", ...).
    Status,
    /// Case/incident handling action recorded against the shipment.
    Management,
    /// Package scan or handling event.
    PackageEvent,
    /// Customer notification sent for the shipment.
    Notification,
}

/// Error returned when parsing an unknown event kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown event kind '{}': expected one of STATUS, MANAGEMENT, EVENT, \
             SHIPPING_ITEM_EVENT_V1, NOTIFICATION",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventKind {}

impl EventKind {
    /// All kinds in partition order.
    pub const ALL: [Self; 4] = [
        Self::Status,
        Self::Management,
        Self::PackageEvent,
        Self::Notification,
    ];

    /// Canonical backend spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "STATUS",
            Self::Management => "MANAGEMENT",
            Self::PackageEvent => "EVENT",
            Self::Notification => "NOTIFICATION",
        }
    }

    /// Classify a backend kind string, falling back to [`EventKind::PackageEvent`]
    /// for anything unrecognised.
    ///
    /// Returns the kind and whether the input was a recognised spelling.
    #[must_use]
    pub fn classify(raw: &str) -> (Self, bool) {
        raw.parse::<Self>()
            .map_or((Self::PackageEvent, false), |kind| (kind, true))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STATUS" => Ok(Self::Status),
            "MANAGEMENT" => Ok(Self::Management),
            "EVENT" | "SHIPPING_ITEM_EVENT_V1" => Ok(Self::PackageEvent),
            "NOTIFICATION" => Ok(Self::Notification),
            _ => Err(UnknownEventKind { raw: s.to_string() }),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
