//! Bulk shipment search.
//!
//! Identifiers are fetched on a bounded worker pool and delivered slot by
//! slot. Each run holds a [`SearchTicket`]; starting another search issues a
//! new ticket and every result tied to the old one is discarded.

use crate::model::ShipmentSnapshot;
use crate::source::{FetchError, ShipmentSource};
use crate::timing;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use tracing::{debug, info};

/// Upper bound on identifiers accepted by one bulk search.
pub const MAX_BULK_IDS: usize = 1000;

/// Default number of concurrent fetches.
pub const DEFAULT_WORKERS: usize = 8;

/// Parsed bulk-search input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingInput {
    /// Unique identifiers in first-seen order.
    pub ids: Vec<String>,
    /// Distinct identifiers dropped by the cap.
    pub truncated: usize,
}

/// Split free text into tracking identifiers.
///
/// Separators are whitespace, `,` and `;`. Duplicates keep their first
/// position. At most `cap` identifiers are kept.
#[must_use]
pub fn parse_tracking_input(text: &str, cap: usize) -> TrackingInput {
    let mut seen = HashSet::new();
    let mut out = TrackingInput::default();
    for id in text
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        if !seen.insert(id) {
            continue;
        }
        if out.ids.len() < cap {
            out.ids.push(id.to_string());
        } else {
            out.truncated += 1;
        }
    }
    if out.truncated > 0 {
        info!(kept = out.ids.len(), dropped = out.truncated, "tracking input truncated");
    }
    out
}

/// Monotonic search counter.
#[derive(Debug, Default)]
pub struct SearchGeneration {
    current: AtomicU64,
}

/// Handle of one search run.
#[derive(Debug, Clone, Copy)]
pub struct SearchTicket<'g> {
    generation: &'g SearchGeneration,
    id: u64,
}

impl SearchGeneration {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// Start a new search, superseding any earlier ticket.
    pub fn begin(&self) -> SearchTicket<'_> {
        let id = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        SearchTicket {
            generation: self,
            id,
        }
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_current(&self, ticket: &SearchTicket<'_>) -> bool {
        std::ptr::eq(self, ticket.generation) && self.current() == ticket.id
    }
}

impl SearchTicket<'_> {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn is_current(&self) -> bool {
        self.generation.is_current(self)
    }
}

/// Result of fetching one identifier.
pub type SlotResult = Result<ShipmentSnapshot, FetchError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// One result per identifier, in input order.
    Complete(Vec<SlotResult>),
    /// A newer search started; `filled` slots had been delivered.
    Superseded { filled: usize },
}

/// Bounded-concurrency bulk fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkSearch {
    workers: usize,
}

impl Default for BulkSearch {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl BulkSearch {
    /// Pool of `workers` fetchers, at least one.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Fetch every identifier, calling `on_slot(index, &result)` as each
    /// completes for as long as `ticket` stays current.
    pub fn run<S, F>(
        &self,
        source: &S,
        ids: &[String],
        ticket: &SearchTicket<'_>,
        mut on_slot: F,
    ) -> SearchOutcome
    where
        S: ShipmentSource + Sync + ?Sized,
        F: FnMut(usize, &SlotResult),
    {
        let total = ids.len();
        let workers = self.workers.min(total);
        debug!(ticket = ticket.id(), total, workers, "bulk search started");

        let next = AtomicUsize::new(0);
        let mut slots: Vec<Option<SlotResult>> = (0..total).map(|_| None).collect();
        let mut filled = 0;

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, SlotResult)>();
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || {
                    while ticket.is_current() {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(id) = ids.get(idx) else { break };
                        let result = timing::timed("search.fetch", || source.fetch_shipment(id));
                        if tx.send((idx, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for (idx, result) in &rx {
                if !ticket.is_current() {
                    break;
                }
                on_slot(idx, &result);
                slots[idx] = Some(result);
                filled += 1;
            }
            drop(rx);
        });

        if filled < total {
            info!(ticket = ticket.id(), filled, total, "bulk search superseded");
            return SearchOutcome::Superseded { filled };
        }
        SearchOutcome::Complete(slots.into_iter().flatten().collect())
    }
}
