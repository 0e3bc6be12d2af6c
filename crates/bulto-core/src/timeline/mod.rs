//! Timeline reconstruction.
//!
//! The pipeline for one scope (a shipment, or one package of it):
//!
//! 1. [`partition`] splits normalized events by kind and sorts each bucket.
//! 2. [`assign`] attaches every package event to the latest status at or
//!    before it, in a single merge scan.
//! 3. [`group`] merges statuses (with their events) and management events
//!    into one descending list and flags the latest status.
//!
//! [`build_timeline`] runs all three.

pub mod assign;
pub mod expand;
pub mod group;
pub mod partition;

pub use assign::{Assignment, assign};
pub use expand::ExpandState;
pub use group::{Group, Timeline, build_groups, build_timeline, day_bands};
pub use partition::{Partition, partition};

use crate::event::Event;

/// The most recent status event of a scope.
///
/// Picks the maximum timestamp among status events; on an exact tie the
/// event appearing last in `events` wins, matching the assignment rule.
#[must_use]
pub fn latest_status(events: &[Event]) -> Option<&Event> {
    events
        .iter()
        .filter(|e| e.is_status())
        .fold(None, |best: Option<&Event>, e| match best {
            Some(b) if b.timestamp > e.timestamp => Some(b),
            _ => Some(e),
        })
}
