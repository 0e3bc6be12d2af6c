//! `bulto search`: bulk lookup of tracking identifiers.

use super::{Ctx, flags};
use crate::output::{Renderable, render_list};
use crate::source::FileSource;
use anyhow::{Context, Result};
use bulto_core::error::CoreError;
use bulto_core::search::{BulkSearch, SearchGeneration, SearchOutcome, SlotResult, parse_tracking_input};
use bulto_core::view::ShipmentView;
use clap::Args;
use serde::Serialize;
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use tracing::warn;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Directory holding `<id>.json` shipment snapshots.
    #[arg(long, value_name = "DIR")]
    pub source: PathBuf,

    /// Tracking identifiers (read from stdin when omitted).
    pub ids: Vec<String>,
}

/// One result row, in input order.
#[derive(Debug, Serialize)]
pub struct SearchRow {
    pub index: usize,
    pub id: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<String>,
    pub groups: usize,
    pub packages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchRow {
    fn from_slot(index: usize, id: &str, slot: &SlotResult, ctx: &Ctx) -> Self {
        match slot {
            Ok(snapshot) => {
                let view = ShipmentView::build_in(snapshot, &ctx.policy, ctx.zone);
                Self {
                    index,
                    id: id.to_string(),
                    found: true,
                    shipment_code: Some(view.shipment_code),
                    status_code: view.status_code,
                    actions: Some(flags(view.eligibility)),
                    groups: view.timeline.groups.len(),
                    packages: view.packages.len(),
                    error_code: None,
                    error: None,
                }
            }
            Err(err) => Self {
                index,
                id: id.to_string(),
                found: false,
                shipment_code: None,
                status_code: None,
                actions: None,
                groups: 0,
                packages: 0,
                error_code: Some(err.code().code()),
                error: Some(err.to_string()),
            },
        }
    }
}

impl SearchRow {
    fn cells(&self) -> [String; 7] {
        let dash = || "-".to_string();
        [
            (self.index + 1).to_string(),
            self.id.clone(),
            self.shipment_code.clone().unwrap_or_else(dash),
            self.status_code.clone().unwrap_or_else(dash),
            self.actions.clone().unwrap_or_else(dash),
            self.groups.to_string(),
            self.error_code.map_or_else(|| "ok".to_string(), str::to_string),
        ]
    }
}

impl Renderable for SearchRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        match &self.error {
            None => writeln!(
                w,
                "{:>4}  {:<20} {:<16} {:<6} [{}]  {} groups, {} packages",
                self.index + 1,
                self.id,
                self.shipment_code.as_deref().unwrap_or("-"),
                self.status_code.as_deref().unwrap_or("-"),
                self.actions.as_deref().unwrap_or("---"),
                self.groups,
                self.packages
            ),
            Some(err) => writeln!(
                w,
                "{:>4}  {:<20} ✗ {}",
                self.index + 1,
                self.id,
                err
            ),
        }
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self).map_err(io::Error::other)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}", self.cells().join("\t"))
    }

    fn table_headers() -> &'static [&'static str] {
        &["#", "ID", "SHIPMENT", "STATUS", "ACTIONS", "GROUPS", "RESULT"]
    }
}

fn read_ids(args: &SearchArgs) -> Result<String> {
    if !args.ids.is_empty() {
        return Ok(args.ids.join(" "));
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read identifiers from stdin")?;
    Ok(buf)
}

/// Execute `bulto search`.
///
/// # Errors
///
/// Returns an error if input cannot be read, the search is superseded, or
/// output fails. Identifiers that fail to resolve are reported per row.
pub fn run_search(args: &SearchArgs, ctx: &Ctx) -> Result<()> {
    let input = parse_tracking_input(&read_ids(args)?, ctx.search.max_ids);
    if input.truncated > 0 {
        warn!(
            kept = input.ids.len(),
            dropped = input.truncated,
            "too many identifiers; extra ones ignored"
        );
    }
    if input.ids.is_empty() {
        anyhow::bail!("No tracking identifiers given");
    }

    let source = FileSource::new(&args.source);
    let generation = SearchGeneration::new();
    let ticket = generation.begin();
    let total = input.ids.len();
    let progress = ctx.output.is_pretty() && io::stderr().is_terminal();
    let mut done = 0usize;

    let outcome = BulkSearch::new(ctx.search.workers).run(&source, &input.ids, &ticket, |_, _| {
        done += 1;
        if progress {
            eprint!("\rsearching {done}/{total}");
            let _ = io::stderr().flush();
        }
    });
    if progress {
        eprintln!();
    }

    let slots = match outcome {
        SearchOutcome::Complete(slots) => slots,
        SearchOutcome::Superseded { filled } => {
            return Err(CoreError::Superseded { filled, total }.into());
        }
    };
    let rows: Vec<SearchRow> = input
        .ids
        .iter()
        .zip(&slots)
        .enumerate()
        .map(|(i, (id, slot))| SearchRow::from_slot(i, id, slot, ctx))
        .collect();
    render_list(&rows, ctx.output)?;
    Ok(())
}
