//! `bulto packages`: numbered packages of a shipment.

use super::{Ctx, fmt_time, flags, read_json};
use crate::output::{Renderable, render_list};
use anyhow::Result;
use bulto_core::config::DisplayZone;
use bulto_core::eligibility::Eligibility;
use bulto_core::model::ShipmentSnapshot;
use bulto_core::view::{PackageView, ShipmentView};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PackagesArgs {
    /// Shipment snapshot JSON (`-` for stdin).
    pub snapshot: PathBuf,
}

/// One package as listed by `bulto packages`.
#[derive(Debug, Serialize)]
pub struct PackageRow {
    pub package_number: usize,
    pub item_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_at: Option<DateTime<Utc>>,
    pub eligibility: Eligibility,
    pub groups: usize,
    pub events: usize,
    #[serde(skip)]
    zone: DisplayZone,
}

impl PackageRow {
    fn from_view(p: &PackageView, zone: DisplayZone) -> Self {
        Self {
            package_number: p.package_number,
            item_code: p.item_code.clone(),
            status_code: p.latest_status.as_ref().map(|e| e.code.clone()),
            status: p.status.as_ref().map(|s| s.description.clone()),
            status_at: p.latest_status.as_ref().map(|e| e.timestamp),
            eligibility: p.eligibility,
            groups: p.timeline.groups.len(),
            events: p.timeline.event_count(),
            zone,
        }
    }
}

impl Renderable for PackageRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let when = self
            .status_at
            .map_or_else(|| "-".to_string(), |ts| fmt_time(ts, self.zone));
        writeln!(
            w,
            "#{:<3} {:<20} {:<6} {:<28} {}  [{}]",
            self.package_number,
            self.item_code,
            self.status_code.as_deref().unwrap_or("-"),
            self.status.as_deref().unwrap_or("-"),
            when,
            flags(self.eligibility)
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self).map_err(io::Error::other)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.package_number,
            self.item_code,
            self.status_code.as_deref().unwrap_or("-"),
            self.status_at.map_or_else(|| "-".to_string(), |ts| ts.to_rfc3339()),
            flags(self.eligibility),
            self.groups,
            self.events
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["NUMBER", "ITEM", "STATUS", "AT", "ACTIONS", "GROUPS", "EVENTS"]
    }
}

/// Execute `bulto packages <snapshot>`.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be read or output fails.
pub fn run_packages(args: &PackagesArgs, ctx: &Ctx) -> Result<()> {
    let snapshot: ShipmentSnapshot = read_json(&args.snapshot)?;
    let view = ShipmentView::build_in(&snapshot, &ctx.policy, ctx.zone);
    let rows: Vec<PackageRow> = view
        .packages
        .iter()
        .map(|p| PackageRow::from_view(p, ctx.zone))
        .collect();
    if rows.is_empty() && ctx.output.is_pretty() {
        println!("Shipment {} has no packages with an item code", view.shipment_code);
        return Ok(());
    }
    render_list(&rows, ctx.output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputMode, write_list};
    use bulto_core::policy::StatusPolicy;
    use chrono::Utc;

    fn rows() -> Vec<PackageRow> {
        let snapshot: ShipmentSnapshot = serde_json::from_value(serde_json::json!({
            "shipmentCode": "SH-1",
            "packages": [
                {"itemCode": "", "events": []},
                {"itemCode": "IT-9", "events": [
                    {"code": "2300", "type": "STATUS", "date": "2024-03-02T10:00:00Z"},
                    {"code": "S1", "type": "EVENT", "date": "2024-03-02T10:05:00Z"}
                ]}
            ]
        }))
        .expect("snapshot");
        let view = ShipmentView::build(&snapshot, &StatusPolicy::builtin(), &Utc);
        view.packages
            .iter()
            .map(|p| PackageRow::from_view(p, DisplayZone::Utc))
            .collect()
    }

    #[test]
    fn text_rows() {
        let mut buf = Vec::new();
        write_list(&mut buf, &rows(), OutputMode::Text).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "NUMBER\tITEM\tSTATUS\tAT\tACTIONS\tGROUPS\tEVENTS");
        assert_eq!(lines[1], "1\tIT-9\t2300\t2024-03-02T10:00:00+00:00\tCDA\t1\t2");
    }

    #[test]
    fn json_rows_skip_display_zone() {
        let mut buf = Vec::new();
        write_list(&mut buf, &rows(), OutputMode::Json).expect("render");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value[0]["item_code"], "IT-9");
        assert_eq!(value[0]["eligibility"]["cancellable"], true);
        assert!(value[0].get("zone").is_none());
    }
}
