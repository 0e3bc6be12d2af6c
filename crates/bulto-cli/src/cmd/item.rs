//! `bulto item`: status record of one item.

use super::timeline::{write_timeline_human, write_timeline_text};
use super::{Ctx, fmt_time, flags, read_json};
use crate::output::{pretty_kv, pretty_section, render_mode};
use crate::source::FileSource;
use anyhow::Result;
use bulto_core::config::DisplayZone;
use bulto_core::model::ItemStatus;
use bulto_core::source::ItemStatusSource;
use bulto_core::timeline::ExpandState;
use bulto_core::view::ItemStatusView;
use clap::Args;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ItemArgs {
    /// Item status JSON (`-` for stdin), or an item code with `--source`.
    pub target: String,

    /// Directory holding `items/<item_code>.json` records.
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Expand every timeline group.
    #[arg(long)]
    pub expand_all: bool,
}

fn load(args: &ItemArgs) -> Result<ItemStatus> {
    match &args.source {
        Some(dir) => Ok(FileSource::new(dir).fetch_item_status(&args.target)?),
        None => read_json(Path::new(&args.target)),
    }
}

/// Execute `bulto item <target>`.
///
/// # Errors
///
/// Returns an error if the record cannot be read or output fails.
pub fn run_item(args: &ItemArgs, ctx: &Ctx) -> Result<()> {
    let status = load(args)?;
    let view = ItemStatusView::build_in(&status, &ctx.policy, ctx.zone);
    let mut expand = ExpandState::new(view.timeline.groups.len());
    if args.expand_all {
        expand.expand_all();
    }
    let zone = ctx.zone;
    render_mode(
        ctx.output,
        &view,
        render_text,
        |v, w| render_human(v, &expand, zone, w),
    )
}

fn render_human(
    view: &ItemStatusView,
    expand: &ExpandState,
    zone: DisplayZone,
    w: &mut dyn Write,
) -> io::Result<()> {
    pretty_section(w, &format!("Item {}", view.item_code.as_deref().unwrap_or("?")))?;
    let status = match (&view.current_status, &view.status) {
        (Some(code), Some(display)) => format!("{code} {}", display.description),
        (Some(code), None) => code.clone(),
        _ => "-".to_string(),
    };
    pretty_kv(w, "status", status)?;
    pretty_kv(w, "actions", flags(view.eligibility))?;
    writeln!(w)?;
    pretty_section(w, "History")?;
    write_timeline_human(w, &view.timeline, expand, zone)?;

    if !view.transition_errors.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Transition errors ({})", view.transition_errors.len()))?;
        for err in &view.transition_errors {
            let when = err.at().map_or_else(|| "-".to_string(), |ts| fmt_time(ts, zone));
            writeln!(
                w,
                "{when}  {} → {}  {}",
                err.from.as_deref().unwrap_or("?"),
                err.to.as_deref().unwrap_or("?"),
                err.message.as_deref().unwrap_or("")
            )?;
        }
    }

    if !view.audit.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Audit ({})", view.audit.len()))?;
        for entry in &view.audit {
            let when = entry.at().map_or_else(|| "-".to_string(), |ts| fmt_time(ts, zone));
            writeln!(
                w,
                "{when}  {:<12} {}",
                entry.user.as_deref().unwrap_or("-"),
                entry.action.as_deref().unwrap_or("-")
            )?;
        }
    }
    if !view.report.is_clean() {
        writeln!(w)?;
        writeln!(w, "⚠ {} history entries could not be read", view.report.rejected.len())?;
    }
    Ok(())
}

fn render_text(view: &ItemStatusView, w: &mut dyn Write) -> io::Result<()> {
    let scope = view.item_code.as_deref().unwrap_or("-");
    writeln!(
        w,
        "item\t{scope}\t{}\t{}",
        view.current_status.as_deref().unwrap_or("-"),
        flags(view.eligibility)
    )?;
    write_timeline_text(w, scope, &view.timeline)?;
    for err in &view.transition_errors {
        writeln!(
            w,
            "{scope}\ttransition_error\t{}\t{}\t{}",
            err.from.as_deref().unwrap_or("-"),
            err.to.as_deref().unwrap_or("-"),
            err.message.as_deref().unwrap_or("")
        )?;
    }
    for entry in &view.audit {
        writeln!(
            w,
            "{scope}\taudit\t{}\t{}\t{}",
            entry.at().map_or_else(|| "-".to_string(), |ts| ts.to_rfc3339()),
            entry.user.as_deref().unwrap_or("-"),
            entry.action.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}
