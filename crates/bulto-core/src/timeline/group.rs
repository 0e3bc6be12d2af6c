//! Timeline group builder.
//!
//! A [`Group`] is one row of the timeline: either a status with the package
//! events assigned to it, or a management event on its own. Groups are
//! ordered most recent first. Exactly one group, the chronologically latest
//! status, carries `is_latest`; management groups never do.

use super::assign::{Assignment, assign};
use super::partition::{Partition, partition};
use crate::event::Event;
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;
use std::cmp::Reverse;

/// One timeline row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// The status or management event heading the row.
    pub anchor: Event,
    /// Package events assigned to a status anchor, most recent first.
    /// Always empty for management anchors.
    pub events: Vec<Event>,
    /// Calendar date of the anchor in the display zone. Shading only.
    pub day_key: NaiveDate,
    /// Set on the group of the latest status event.
    pub is_latest: bool,
}

impl Group {
    /// Returns `true` when the anchor is a status event.
    #[must_use]
    pub fn is_status(&self) -> bool {
        self.anchor.is_status()
    }
}

/// Reconstructed timeline of one scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    /// Groups, most recent anchor first.
    pub groups: Vec<Group>,
    /// Notifications, most recent first.
    pub notifications: Vec<Event>,
    /// Package events older than every status, ascending. Not part of any group.
    pub unassigned: Vec<Event>,
    /// Package events whose backend kind was unrecognised.
    pub unrecognized_kinds: usize,
}

impl Timeline {
    /// The group flagged as latest status, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&Group> {
        self.groups.iter().find(|g| g.is_latest)
    }

    /// Returns `true` when there is nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.notifications.is_empty() && self.unassigned.is_empty()
    }

    /// Number of events represented anywhere in the timeline.
    #[must_use]
    pub fn event_count(&self) -> usize {
        let grouped: usize = self.groups.iter().map(|g| 1 + g.events.len()).sum();
        grouped + self.notifications.len() + self.unassigned.len()
    }
}

fn day_key<Tz: TimeZone>(event: &Event, tz: &Tz) -> NaiveDate {
    event.timestamp.with_timezone(tz).date_naive()
}

fn assemble<Tz: TimeZone>(partition: &Partition, assignment: &Assignment, tz: &Tz) -> Vec<Group> {
    let latest_idx = partition.status.len().checked_sub(1);
    let mut groups = Vec::with_capacity(partition.status.len() + partition.management.len());

    // Pushed newest first so the stable sort keeps the latest of tied statuses on top.
    for (idx, status) in partition.status.iter().enumerate().rev() {
        groups.push(Group {
            anchor: status.clone(),
            events: assignment
                .bucket_events(idx, &partition.package)
                .into_iter()
                .cloned()
                .collect(),
            day_key: day_key(status, tz),
            is_latest: Some(idx) == latest_idx,
        });
    }

    for event in &partition.management {
        groups.push(Group {
            anchor: event.clone(),
            events: Vec::new(),
            day_key: day_key(event, tz),
            is_latest: false,
        });
    }

    // Stable: equal timestamps keep statuses ahead of management events.
    groups.sort_by_key(|g| Reverse(g.anchor.timestamp));
    groups
}

/// Build the group list of an already partitioned scope.
#[must_use]
pub fn build_groups<Tz: TimeZone>(partition: &Partition, tz: &Tz) -> Vec<Group> {
    let assignment = assign(&partition.status, &partition.package);
    assemble(partition, &assignment, tz)
}

/// Partition, assign and group the events of one scope.
pub fn build_timeline<Tz: TimeZone>(events: impl IntoIterator<Item = Event>, tz: &Tz) -> Timeline {
    let partition = partition(events);
    let assignment = assign(&partition.status, &partition.package);
    let groups = assemble(&partition, &assignment, tz);
    let unassigned = assignment
        .unassigned()
        .iter()
        .filter_map(|&i| partition.package.get(i))
        .cloned()
        .collect();

    Timeline {
        groups,
        notifications: partition.notifications,
        unassigned,
        unrecognized_kinds: partition.unrecognized_kinds,
    }
}

/// Alternating shading bands: flips each time the day changes between
/// consecutive groups. The first group is `false`.
#[must_use]
pub fn day_bands(groups: &[Group]) -> Vec<bool> {
    let mut bands = Vec::with_capacity(groups.len());
    let mut band = false;
    let mut previous: Option<NaiveDate> = None;
    for group in groups {
        if previous.is_some_and(|day| day != group.day_key) {
            band = !band;
        }
        bands.push(band);
        previous = Some(group.day_key);
    }
    bands
}
