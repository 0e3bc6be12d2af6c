//! Event-to-status assignment engine.
//!
//! Each package event belongs to the latest status whose timestamp is at or
//! before its own. Both inputs are sorted ascending, so a single forward scan
//! with one status cursor visits every element once: O(S + E).
//!
//! On exact status ties the cursor advances past every tied status, so the
//! last of them in sorted order receives the event. Events strictly before
//! the first status stay unassigned.
//!
//! Buckets are keyed by status position rather than by timestamp so that
//! tied or duplicated statuses keep distinct buckets.

use crate::event::Event;
use std::cmp::Reverse;
use tracing::trace;

/// Result of assigning package events to statuses.
///
/// Holds indices into the two input slices; use [`Assignment::bucket_events`]
/// to materialize a bucket for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    buckets: Vec<Vec<usize>>,
    unassigned: Vec<usize>,
}

impl Assignment {
    /// Indices of package events assigned to status `status_idx`, in
    /// ascending timestamp order.
    #[must_use]
    pub fn bucket(&self, status_idx: usize) -> &[usize] {
        self.buckets.get(status_idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indices of package events that precede every status.
    #[must_use]
    pub fn unassigned(&self) -> &[usize] {
        &self.unassigned
    }

    /// Number of status buckets (equals the status count).
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of package events placed in some bucket.
    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// The bucket of `status_idx` resolved against `events` and ordered for
    /// display: most recent first, ties in input order.
    #[must_use]
    pub fn bucket_events<'a>(&self, status_idx: usize, events: &'a [Event]) -> Vec<&'a Event> {
        let mut out: Vec<&Event> = self
            .bucket(status_idx)
            .iter()
            .filter_map(|&i| events.get(i))
            .collect();
        out.sort_by_key(|e| Reverse(e.timestamp));
        out
    }
}

/// Assign ascending `events` to ascending `statuses`.
#[must_use]
pub fn assign(statuses: &[Event], events: &[Event]) -> Assignment {
    debug_assert!(statuses.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    debug_assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let mut buckets = vec![Vec::new(); statuses.len()];
    let mut unassigned = Vec::new();

    // Number of statuses at or before the current event.
    let mut reached = 0;
    for (idx, event) in events.iter().enumerate() {
        while reached < statuses.len() && statuses[reached].timestamp <= event.timestamp {
            reached += 1;
        }
        match reached.checked_sub(1) {
            Some(status_idx) => {
                trace!(event = idx, status = status_idx, "assigned");
                buckets[status_idx].push(idx);
            }
            None => unassigned.push(idx),
        }
    }

    Assignment {
        buckets,
        unassigned,
    }
}
