//! `bulto policy`: effective status policy, and `policy check` for files.

use super::{Ctx, yes_no};
use crate::output::{OutputMode, pretty_section, render_mode};
use anyhow::{Context, Result};
use bulto_core::policy::{PolicySet, StatusPolicy};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: Option<PolicyCommand>,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Validate a policy file without using it.
    Check {
        /// Policy TOML to validate.
        file: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct CheckSummary {
    file: String,
    valid: bool,
    cancellable: usize,
    deliverable: usize,
    assignable: usize,
    statuses: usize,
}

/// Execute `bulto policy`.
///
/// # Errors
///
/// Returns an error if output rendering fails.
pub fn run_show(ctx: &Ctx) -> Result<()> {
    render_mode(ctx.output, &ctx.policy, render_text, render_human)
}

/// Execute `bulto policy check <file>`.
///
/// # Errors
///
/// Returns the validation error of the file, or an output error.
pub fn run_check(file: &std::path::Path, output: OutputMode) -> Result<()> {
    let policy = StatusPolicy::load(file).context("Policy check failed")?;
    let summary = CheckSummary {
        file: file.display().to_string(),
        valid: true,
        cancellable: policy.codes(PolicySet::Cancellable).len(),
        deliverable: policy.codes(PolicySet::Deliverable).len(),
        assignable: policy.codes(PolicySet::Assignable).len(),
        statuses: policy.statuses().len(),
    };
    render_mode(
        output,
        &summary,
        |s, w| {
            writeln!(
                w,
                "ok\t{}\t{}\t{}\t{}\t{}",
                s.file, s.cancellable, s.deliverable, s.assignable, s.statuses
            )
        },
        |s, w| {
            writeln!(w, "✓ {} is valid", s.file)?;
            writeln!(
                w,
                "  {} cancellable, {} deliverable, {} assignable, {} described statuses",
                s.cancellable, s.deliverable, s.assignable, s.statuses
            )
        },
    )
}

fn codes_line(policy: &StatusPolicy, set: PolicySet) -> String {
    policy
        .codes(set)
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_human(policy: &StatusPolicy, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Action sets")?;
    for set in PolicySet::ALL {
        writeln!(w, "{:<12} {}", format!("{set}:"), codes_line(policy, set))?;
    }
    writeln!(w)?;
    pretty_section(w, "Statuses")?;
    for (code, display) in policy.statuses() {
        writeln!(
            w,
            "{code:<6} {:<28} {:<10} {}  cancel: {:<3} deliver: {:<3} assign: {}",
            display.description,
            display.icon,
            display.color,
            yes_no(policy.contains(PolicySet::Cancellable, code)),
            yes_no(policy.contains(PolicySet::Deliverable, code)),
            yes_no(policy.contains(PolicySet::Assignable, code)),
        )?;
    }
    Ok(())
}

fn render_text(policy: &StatusPolicy, w: &mut dyn Write) -> io::Result<()> {
    for set in PolicySet::ALL {
        for code in policy.codes(set) {
            writeln!(w, "set\t{set}\t{code}")?;
        }
    }
    for (code, display) in policy.statuses() {
        writeln!(
            w,
            "status\t{code}\t{}\t{}\t{}",
            display.description, display.icon, display.color
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_lists_every_set_member() {
        let policy = StatusPolicy::builtin();
        let mut buf = Vec::new();
        render_text(&policy, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("set\tcancellable\t3000\n"));
        assert!(text.contains("set\tdeliverable\t2700\n"));
        assert!(text.contains("status\t2500\tEntregado\t"));
    }

    #[test]
    fn human_shows_flags_per_status() {
        let policy = StatusPolicy::builtin();
        let mut buf = Vec::new();
        render_human(&policy, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        let delivered = text
            .lines()
            .find(|l| l.starts_with("2500"))
            .expect("2500 row");
        assert!(delivered.contains("cancel: no "));
    }
}
