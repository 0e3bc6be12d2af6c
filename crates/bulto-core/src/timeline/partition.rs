//! Event classifier and partitioner.
//!
//! Every input event lands in exactly one bucket. Status and package events
//! are sorted ascending by timestamp, notifications descending; management
//! events keep input order (the group builder sorts them). All sorts are
//! stable, so ties keep input order.

use crate::event::{Event, EventKind};
use serde::Serialize;
use tracing::debug;

/// Events of one scope split by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partition {
    /// Status events, ascending by timestamp.
    pub status: Vec<Event>,
    /// Management events, input order.
    pub management: Vec<Event>,
    /// Package events (including unrecognised kinds), ascending by timestamp.
    pub package: Vec<Event>,
    /// Notifications, descending by timestamp.
    pub notifications: Vec<Event>,
    /// How many package events came from an unrecognised kind string.
    pub unrecognized_kinds: usize,
}

impl Partition {
    /// Total number of events across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.status.len() + self.management.len() + self.package.len() + self.notifications.len()
    }

    /// Returns `true` if no bucket holds an event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split events by kind.
pub fn partition(events: impl IntoIterator<Item = Event>) -> Partition {
    let mut out = Partition::default();

    for event in events {
        match event.kind {
            EventKind::Status => out.status.push(event),
            EventKind::Management => out.management.push(event),
            EventKind::PackageEvent => {
                if event.has_unrecognized_kind() {
                    out.unrecognized_kinds += 1;
                }
                out.package.push(event);
            }
            EventKind::Notification => out.notifications.push(event),
        }
    }

    out.status.sort_by_key(|e| e.timestamp);
    out.package.sort_by_key(|e| e.timestamp);
    out.notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    debug!(
        status = out.status.len(),
        management = out.management.len(),
        package = out.package.len(),
        notifications = out.notifications.len(),
        unrecognized = out.unrecognized_kinds,
        "partitioned events"
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn ev(code: &str, kind: EventKind, secs: i64) -> Event {
        Event::new(code, kind, ts(secs))
    }

    fn codes(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.code.as_str()).collect()
    }

    #[test]
    fn buckets_are_sorted_per_contract() {
        let p = partition(vec![
            ev("s2", EventKind::Status, 20),
            ev("n1", EventKind::Notification, 5),
            ev("m2", EventKind::Management, 40),
            ev("p2", EventKind::PackageEvent, 25),
            ev("s1", EventKind::Status, 10),
            ev("n2", EventKind::Notification, 50),
            ev("m1", EventKind::Management, 15),
            ev("p1", EventKind::PackageEvent, 12),
        ]);
        assert_eq!(codes(&p.status), ["s1", "s2"]);
        assert_eq!(codes(&p.package), ["p1", "p2"]);
        assert_eq!(codes(&p.notifications), ["n2", "n1"]);
        assert_eq!(codes(&p.management), ["m2", "m1"]);
        assert_eq!(p.len(), 8);
    }

    #[test]
    fn ties_keep_input_order() {
        let p = partition(vec![
            ev("a", EventKind::Status, 10),
            ev("b", EventKind::Status, 10),
            ev("x", EventKind::Notification, 7),
            ev("y", EventKind::Notification, 7),
        ]);
        assert_eq!(codes(&p.status), ["a", "b"]);
        assert_eq!(codes(&p.notifications), ["x", "y"]);
    }

    #[test]
    fn unrecognised_kinds_are_counted_as_package_events() {
        let mut odd = ev("gps", EventKind::PackageEvent, 3);
        odd.raw_kind = Some("GPS_PING".into());
        let p = partition(vec![odd, ev("scan", EventKind::PackageEvent, 1)]);
        assert_eq!(p.package.len(), 2);
        assert_eq!(p.unrecognized_kinds, 1);
    }

    #[test]
    fn duplicates_are_kept() {
        let p = partition(vec![
            ev("2100", EventKind::Status, 10),
            ev("2100", EventKind::Status, 10),
        ]);
        assert_eq!(p.status.len(), 2);
    }

    #[test]
    fn empty_input_gives_empty_partition() {
        let p = partition(Vec::new());
        assert!(p.is_empty());
    }
}
