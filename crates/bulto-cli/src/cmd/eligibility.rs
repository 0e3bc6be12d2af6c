//! `bulto eligibility`: which actions a status code allows.

use super::{Ctx, yes_no};
use crate::output::{Renderable, render_list};
use anyhow::Result;
use bulto_core::eligibility::{Eligibility, resolve};
use bulto_core::policy::StatusPolicy;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct EligibilityArgs {
    /// Status codes to resolve.
    #[arg(required = true, value_name = "CODE")]
    pub codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EligibilityRow {
    pub code: String,
    pub description: String,
    #[serde(flatten)]
    pub eligibility: Eligibility,
}

impl EligibilityRow {
    fn resolve(policy: &StatusPolicy, code: &str) -> Self {
        Self {
            code: code.to_string(),
            description: policy.describe(code, "").description,
            eligibility: resolve(policy, code),
        }
    }
}

impl Renderable for EligibilityRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{:<6} {:<28} cancel: {:<3}  deliver: {:<3}  assign: {}",
            self.code,
            self.description,
            yes_no(self.eligibility.cancellable),
            yes_no(self.eligibility.deliverable),
            yes_no(self.eligibility.assignable)
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self).map_err(io::Error::other)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            self.code, self.eligibility.cancellable, self.eligibility.deliverable, self.eligibility.assignable
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["CODE", "CANCELLABLE", "DELIVERABLE", "ASSIGNABLE"]
    }
}

/// Execute `bulto eligibility <code>...`.
///
/// # Errors
///
/// Returns an error if writing output fails.
pub fn run_eligibility(args: &EligibilityArgs, ctx: &Ctx) -> Result<()> {
    let rows: Vec<EligibilityRow> = args
        .codes
        .iter()
        .map(|code| EligibilityRow::resolve(&ctx.policy, code.trim()))
        .collect();
    render_list(&rows, ctx.output)?;
    Ok(())
}
