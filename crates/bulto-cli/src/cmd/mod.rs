pub mod action;
pub mod completions;
pub mod eligibility;
pub mod item;
pub mod packages;
pub mod policy;
pub mod search;
pub mod timeline;

use crate::output::OutputMode;
use anyhow::{Context, Result};
use bulto_core::config::{DisplayZone, SearchConfig};
use bulto_core::eligibility::Eligibility;
use bulto_core::policy::StatusPolicy;
use chrono::{DateTime, Local, Utc};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

/// Settings resolved once in `main` and shared by every command.
pub struct Ctx {
    pub output: OutputMode,
    pub zone: DisplayZone,
    pub policy: StatusPolicy,
    pub search: SearchConfig,
}

/// Read a JSON document from `path`, or from stdin when `path` is `-`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// `YYYY-MM-DD HH:MM` in the display zone.
pub fn fmt_time(ts: DateTime<Utc>, zone: DisplayZone) -> String {
    const FMT: &str = "%Y-%m-%d %H:%M";
    match zone {
        DisplayZone::Utc => ts.format(FMT).to_string(),
        DisplayZone::Local => ts.with_timezone(&Local).format(FMT).to_string(),
        DisplayZone::Fixed(offset) => ts.with_timezone(&offset).format(FMT).to_string(),
    }
}

/// Compact flag string: `C` cancellable, `D` deliverable, `A` assignable.
pub fn flags(e: Eligibility) -> String {
    [
        (e.cancellable, 'C'),
        (e.deliverable, 'D'),
        (e.assignable, 'A'),
    ]
    .iter()
    .map(|&(on, c)| if on { c } else { '-' })
    .collect()
}

pub const fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}
