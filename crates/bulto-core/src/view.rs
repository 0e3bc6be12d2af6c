//! Shipment, package and item views.
//!
//! A view is the whole reconstruction of one fetched snapshot: normalized,
//! grouped timelines plus resolved eligibility. Views are rebuilt from
//! scratch on every fetch and never patched in place.

use crate::config::DisplayZone;
use crate::eligibility::{Eligibility, resolve_opt};
use crate::event::{Event, NormalizeReport, normalize};
use crate::model::{AuditEntry, ItemStatus, ShipmentSnapshot, TransitionError, project};
use crate::policy::{StatusDisplay, StatusPolicy};
use crate::timeline::{Timeline, build_timeline, latest_status};
use crate::timing;
use chrono::{FixedOffset, Local, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// Reconstructed view of one shipment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentView {
    pub shipment_code: String,
    /// Server-supplied status code.
    pub status_code: Option<String>,
    pub status: Option<StatusDisplay>,
    /// Resolved from `status_code`, not from the event stream.
    pub eligibility: Eligibility,
    pub timeline: Timeline,
    pub packages: Vec<PackageView>,
    /// Normalization counts of the shipment stream and every package stream.
    pub report: NormalizeReport,
}

/// Reconstructed view of one package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageView {
    pub item_code: String,
    pub package_number: usize,
    pub latest_status: Option<Event>,
    pub status: Option<StatusDisplay>,
    /// Resolved from the latest status event of this package.
    pub eligibility: Eligibility,
    pub timeline: Timeline,
    pub report: NormalizeReport,
}

/// Reconstructed view of an item status record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemStatusView {
    pub item_code: Option<String>,
    pub current_status: Option<String>,
    pub status: Option<StatusDisplay>,
    pub eligibility: Eligibility,
    pub timeline: Timeline,
    pub transition_errors: Vec<TransitionError>,
    pub audit: Vec<AuditEntry>,
    pub report: NormalizeReport,
}

fn display_for(policy: &StatusPolicy, code: Option<&str>, fallback: &str) -> Option<StatusDisplay> {
    code.map(|c| policy.describe(c, fallback))
}

impl ShipmentView {
    /// Build the view with day keys computed in `tz`.
    pub fn build<Tz: TimeZone>(snapshot: &ShipmentSnapshot, policy: &StatusPolicy, tz: &Tz) -> Self {
        timing::timed("view.shipment", || Self::build_inner(snapshot, policy, tz))
    }

    /// Build the view in a configured display zone.
    #[must_use]
    pub fn build_in(snapshot: &ShipmentSnapshot, policy: &StatusPolicy, zone: DisplayZone) -> Self {
        match zone {
            DisplayZone::Utc => Self::build(snapshot, policy, &Utc),
            DisplayZone::Local => Self::build(snapshot, policy, &Local),
            DisplayZone::Fixed(offset) => Self::build(snapshot, policy, &offset),
        }
    }

    fn build_inner<Tz: TimeZone>(snapshot: &ShipmentSnapshot, policy: &StatusPolicy, tz: &Tz) -> Self {
        let (events, mut report) = normalize(snapshot.shipment_events.iter().cloned());
        let timeline = build_timeline(events, tz);

        let packages: Vec<PackageView> = project(&snapshot.packages)
            .into_iter()
            .map(|package| {
                let (events, package_report) = normalize(package.events);
                let latest = latest_status(&events).cloned();
                let eligibility = resolve_opt(policy, latest.as_ref().map(|e| e.code.as_str()));
                let status = latest
                    .as_ref()
                    .map(|e| policy.describe(&e.code, &e.description));
                report.absorb(&package_report);
                PackageView {
                    item_code: package.item_code,
                    package_number: package.package_number,
                    latest_status: latest,
                    status,
                    eligibility,
                    timeline: build_timeline(events, tz),
                    report: package_report,
                }
            })
            .collect();

        let status_code = snapshot
            .status_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        let fallback = timeline
            .latest()
            .map_or("", |g| g.anchor.description.as_str());

        if !report.is_clean() {
            warn!(
                shipment = %snapshot.shipment_code,
                rejected = report.rejected.len(),
                "events excluded from shipment view"
            );
        }
        debug!(
            shipment = %snapshot.shipment_code,
            groups = timeline.groups.len(),
            packages = packages.len(),
            "built shipment view"
        );

        Self {
            shipment_code: snapshot.shipment_code.clone(),
            status: display_for(policy, status_code.as_deref(), fallback),
            eligibility: resolve_opt(policy, status_code.as_deref()),
            status_code,
            timeline,
            packages,
            report,
        }
    }

    /// Look up a package by item code.
    #[must_use]
    pub fn package(&self, item_code: &str) -> Option<&PackageView> {
        self.packages.iter().find(|p| p.item_code == item_code)
    }
}

impl ItemStatusView {
    /// Build the view with day keys computed in `tz`.
    pub fn build<Tz: TimeZone>(status: &ItemStatus, policy: &StatusPolicy, tz: &Tz) -> Self {
        timing::timed("view.item", || {
            let (events, report) = normalize(status.status_tracking_history.iter().cloned());
            let fallback = latest_status(&events).map_or_else(String::new, |e| e.description.clone());
            let current = status.current_status.as_deref();
            Self {
                item_code: status.item_code.clone(),
                current_status: status.current_status.clone(),
                status: display_for(policy, current, &fallback),
                eligibility: resolve_opt(policy, current),
                timeline: build_timeline(events, tz),
                transition_errors: status.transition_errors.clone(),
                audit: status.audit_newest_first().into_iter().cloned().collect(),
                report,
            }
        })
    }

    /// Build the view in a configured display zone.
    #[must_use]
    pub fn build_in(status: &ItemStatus, policy: &StatusPolicy, zone: DisplayZone) -> Self {
        match zone {
            DisplayZone::Utc => Self::build(status, policy, &Utc),
            DisplayZone::Local => Self::build(status, policy, &Local),
            DisplayZone::Fixed(offset) => Self::build::<FixedOffset>(status, policy, &offset),
        }
    }
}
