//! `bulto timeline`: grouped event timeline of a shipment and its packages.

use super::{Ctx, fmt_time, flags, read_json};
use crate::output::{pretty_kv, pretty_section, render_mode};
use anyhow::Result;
use bulto_core::config::DisplayZone;
use bulto_core::error::CoreError;
use bulto_core::event::{Event, NormalizeReport};
use bulto_core::model::ShipmentSnapshot;
use bulto_core::timeline::{ExpandState, Timeline, day_bands};
use bulto_core::view::ShipmentView;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Shipment snapshot JSON (`-` for stdin).
    pub snapshot: PathBuf,

    /// Only show the package with this item code.
    #[arg(long, value_name = "ITEM_CODE")]
    pub package: Option<String>,

    /// Expand the group at this position (0 = most recent). Repeatable.
    #[arg(long, value_name = "INDEX")]
    pub expand: Vec<usize>,

    /// Expand every group.
    #[arg(long, conflicts_with = "expand")]
    pub expand_all: bool,
}

/// One rendered scope: the shipment or a single package.
#[derive(Debug, Serialize)]
struct ScopeOutput<'a> {
    scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    eligibility: bulto_core::eligibility::Eligibility,
    timeline: &'a Timeline,
    #[serde(skip)]
    expand: ExpandState,
}

#[derive(Debug, Serialize)]
struct TimelineOutput<'a> {
    shipment_code: &'a str,
    scopes: Vec<ScopeOutput<'a>>,
    report: &'a NormalizeReport,
    #[serde(skip)]
    zone: DisplayZone,
}

fn expand_state(args: &TimelineArgs, groups: usize) -> ExpandState {
    let mut state = ExpandState::new(groups);
    if args.expand_all {
        state.expand_all();
    } else {
        for &idx in &args.expand {
            let _ = state.toggle(idx);
        }
    }
    state
}

/// Execute `bulto timeline <snapshot>`.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be read, the requested package is
/// absent, or output rendering fails.
pub fn run_timeline(args: &TimelineArgs, ctx: &Ctx) -> Result<()> {
    let snapshot: ShipmentSnapshot = read_json(&args.snapshot)?;
    let view = ShipmentView::build_in(&snapshot, &ctx.policy, ctx.zone);

    let mut scopes = Vec::new();
    match args.package.as_deref() {
        Some(item_code) => {
            let package = view.package(item_code).ok_or_else(|| CoreError::ItemNotFound {
                shipment_code: view.shipment_code.clone(),
                item_code: item_code.to_string(),
            })?;
            scopes.push(ScopeOutput {
                scope: format!("Package {} · {}", package.package_number, package.item_code),
                status: package.latest_status.as_ref().map(|e| e.code.clone()),
                eligibility: package.eligibility,
                timeline: &package.timeline,
                expand: expand_state(args, package.timeline.groups.len()),
            });
        }
        None => {
            scopes.push(ScopeOutput {
                scope: format!("Shipment {}", view.shipment_code),
                status: view.status_code.clone(),
                eligibility: view.eligibility,
                timeline: &view.timeline,
                expand: expand_state(args, view.timeline.groups.len()),
            });
            for package in &view.packages {
                scopes.push(ScopeOutput {
                    scope: format!("Package {} · {}", package.package_number, package.item_code),
                    status: package.latest_status.as_ref().map(|e| e.code.clone()),
                    eligibility: package.eligibility,
                    timeline: &package.timeline,
                    expand: expand_state(args, package.timeline.groups.len()),
                });
            }
        }
    }

    let out = TimelineOutput {
        shipment_code: &view.shipment_code,
        scopes,
        report: &view.report,
        zone: ctx.zone,
    };

    render_mode(ctx.output, &out, render_text, render_human)
}

fn describe(event: &Event) -> &str {
    if event.description.is_empty() {
        "-"
    } else {
        &event.description
    }
}

fn render_human(out: &TimelineOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    for (i, scope) in out.scopes.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        pretty_section(w, &scope.scope)?;
        pretty_kv(w, "status", scope.status.as_deref().unwrap_or("-"))?;
        pretty_kv(w, "actions", flags(scope.eligibility))?;
        write_timeline_human(w, scope.timeline, &scope.expand, out.zone)?;
    }
    if !out.report.is_clean() {
        writeln!(w)?;
        writeln!(
            w,
            "⚠ {} of {} events could not be read and are not shown",
            out.report.rejected.len(),
            out.report.total()
        )?;
    }
    Ok(())
}

/// Grouped timeline in pretty form, shared with `bulto item`.
pub fn write_timeline_human(
    w: &mut dyn Write,
    timeline: &Timeline,
    expand: &ExpandState,
    zone: DisplayZone,
) -> io::Result<()> {
    if timeline.is_empty() {
        writeln!(w, "  (no events)")?;
        return Ok(());
    }
    let bands = day_bands(&timeline.groups);
    for (idx, group) in timeline.groups.iter().enumerate() {
        let band = if bands[idx] { '░' } else { ' ' };
        let marker = if group.is_latest { "  ← latest" } else { "" };
        let kind = if group.is_status() { "" } else { " [mgmt]" };
        writeln!(
            w,
            "{band} {idx:>3}  {}  {:<6} {}{kind}{marker}",
            fmt_time(group.anchor.timestamp, zone),
            group.anchor.code,
            describe(&group.anchor),
        )?;
        if expand.is_expanded(idx) {
            for event in &group.events {
                writeln!(
                    w,
                    "{band}         {}  {:<6} {}",
                    fmt_time(event.timestamp, zone),
                    event.code,
                    describe(event)
                )?;
            }
        } else if !group.events.is_empty() {
            writeln!(w, "{band}        (+{} events)", group.events.len())?;
        }
    }
    if !timeline.unassigned.is_empty() {
        writeln!(w, "  before first status:")?;
        for event in &timeline.unassigned {
            writeln!(w, "         {}  {:<6} {}", fmt_time(event.timestamp, zone), event.code, describe(event))?;
        }
    }
    if !timeline.notifications.is_empty() {
        writeln!(w, "  notifications:")?;
        for event in &timeline.notifications {
            writeln!(w, "         {}  {:<6} {}", fmt_time(event.timestamp, zone), event.code, describe(event))?;
        }
    }
    Ok(())
}

fn render_text(out: &TimelineOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "scope\trole\tindex\ttimestamp\tcode\tdescription\tlatest")?;
    for scope in &out.scopes {
        write_timeline_text(w, &scope.scope, scope.timeline)?;
    }
    Ok(())
}

/// Tab-separated rows: one per group, assigned event, unassigned event and
/// notification.
pub fn write_timeline_text(w: &mut dyn Write, scope: &str, timeline: &Timeline) -> io::Result<()> {
    for (idx, group) in timeline.groups.iter().enumerate() {
        let role = if group.is_status() { "status" } else { "management" };
        writeln!(
            w,
            "{scope}\t{role}\t{idx}\t{}\t{}\t{}\t{}",
            group.anchor.timestamp.to_rfc3339(),
            group.anchor.code,
            group.anchor.description,
            group.is_latest
        )?;
        for event in &group.events {
            writeln!(
                w,
                "{scope}\tevent\t{idx}\t{}\t{}\t{}\tfalse",
                event.timestamp.to_rfc3339(),
                event.code,
                event.description
            )?;
        }
    }
    for (role, events) in [
        ("unassigned", &timeline.unassigned),
        ("notification", &timeline.notifications),
    ] {
        for event in events {
            writeln!(
                w,
                "{scope}\t{role}\t-\t{}\t{}\t{}\tfalse",
                event.timestamp.to_rfc3339(),
                event.code,
                event.description
            )?;
        }
    }
    Ok(())
}
