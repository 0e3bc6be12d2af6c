//! Shared output layer for pretty/text/JSON parity across all commands.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / hidden `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. `output` in the user config file
//! 4. [`OutputMode::Pretty`] if stdout is a TTY, [`OutputMode::Text`] if piped.

use bulto_core::action::ActionError;
use bulto_core::error::{CoreError, ErrorCode};
use bulto_core::policy::PolicyError;
use bulto_core::source::FetchError;
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, markers, local times).
    Pretty,
    /// Tab-separated rows for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Map a resolved mode name (`pretty`, `text`, `json`).
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Pretty,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    pub const fn is_pretty(self) -> bool {
        matches!(self, Self::Pretty)
    }
}

/// A result type that can be rendered in every output mode.
pub trait Renderable {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()>;

    /// One self-contained JSON object.
    fn render_json(&self, w: &mut dyn Write) -> io::Result<()>;

    /// One text row, columns in [`Renderable::table_headers`] order.
    fn render_table(&self, w: &mut dyn Write) -> io::Result<()>;

    fn table_headers() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }
}

/// Render a list of [`Renderable`] items to `out`.
///
/// JSON mode wraps items in an array; text mode prints a header row first.
pub fn write_list<R: Renderable>(out: &mut dyn Write, items: &[R], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Pretty => {
            for item in items {
                item.render_human(out)?;
            }
        }
        OutputMode::Text => {
            if !items.is_empty() {
                let headers = R::table_headers();
                if !headers.is_empty() {
                    writeln!(out, "{}", headers.join("\t"))?;
                }
            }
            for item in items {
                item.render_table(out)?;
            }
        }
        OutputMode::Json => {
            write!(out, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(out, ",")?;
                }
                writeln!(out)?;
                let mut buf = Vec::new();
                item.render_json(&mut buf)?;
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                out.write_all(&buf)?;
            }
            writeln!(out, "\n]")?;
        }
    }
    Ok(())
}

/// Render a list of [`Renderable`] items to stdout.
pub fn render_list<R: Renderable>(items: &[R], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_list(&mut out, items, mode)
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Stable `E####` code when the failure maps to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

/// First typed library error found in the context chain.
fn error_code_of(err: &anyhow::Error) -> Option<ErrorCode> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<CoreError>()
            .map(CoreError::code)
            .or_else(|| cause.downcast_ref::<PolicyError>().map(PolicyError::code))
            .or_else(|| cause.downcast_ref::<ActionError>().map(ActionError::code))
            .or_else(|| cause.downcast_ref::<FetchError>().map(FetchError::code))
    })
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        match error_code_of(err) {
            Some(code) => Self::with_code(message, code),
            None => Self::new(message),
        }
    }
}

/// Write an error in the requested format.
pub fn write_error(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    struct Row {
        code: &'static str,
        count: u32,
    }

    impl Renderable for Row {
        fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
            writeln!(w, "{}: {}", self.code, self.count)
        }

        fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
            writeln!(w, "{}", serde_json::json!({"code": self.code, "count": self.count}))
        }

        fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
            writeln!(w, "{}\t{}", self.code, self.count)
        }

        fn table_headers() -> &'static [&'static str] {
            &["CODE", "COUNT"]
        }
    }

    fn rows() -> Vec<Row> {
        vec![Row { code: "2100", count: 3 }, Row { code: "2300", count: 0 }]
    }

    fn list(mode: OutputMode, items: &[Row]) -> String {
        let mut buf = Vec::new();
        write_list(&mut buf, items, mode).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    // ── OutputMode ──────────────────────────────────────────────────────────

    #[test]
    fn mode_names_round_trip() {
        for mode in [OutputMode::Pretty, OutputMode::Text, OutputMode::Json] {
            assert_eq!(OutputMode::from_name(mode.as_str()), mode);
        }
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Text.is_pretty());
    }

    // ── write_list ──────────────────────────────────────────────────────────

    #[test]
    fn text_list_has_header_row() {
        assert_eq!(list(OutputMode::Text, &rows()), "CODE\tCOUNT\n2100\t3\n2300\t0\n");
    }

    #[test]
    fn empty_text_list_has_no_header() {
        assert_eq!(list(OutputMode::Text, &[]), "");
    }

    #[test]
    fn json_list_is_valid_array() {
        let value: serde_json::Value = serde_json::from_str(&list(OutputMode::Json, &rows())).expect("json");
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[1]["code"], "2300");

        let empty: serde_json::Value = serde_json::from_str(&list(OutputMode::Json, &[])).expect("json");
        assert_eq!(empty, serde_json::json!([]));
    }

    // ── CliError ────────────────────────────────────────────────────────────

    #[test]
    fn typed_errors_keep_their_code_through_context() {
        let err = Err::<(), _>(FetchError::NotFound { id: "T1".into() })
            .context("search failed")
            .expect_err("error");
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2001"));
        assert!(cli.message.contains("search failed"));
        assert!(cli.message.contains("'T1' not found"));
        assert!(cli.suggestion.is_some());
    }

    #[test]
    fn untyped_errors_have_no_code() {
        let cli = CliError::from(&anyhow::anyhow!("boom"));
        assert_eq!(cli.message, "boom");
        assert!(cli.error_code.is_none());
    }

    #[test]
    fn error_rendering() {
        let err = CliError::with_code("cancel not allowed", ErrorCode::PolicyDenied);
        let mut text = Vec::new();
        write_error(&mut text, OutputMode::Text, &err).expect("text");
        let text = String::from_utf8(text).expect("utf8");
        assert!(text.starts_with("error[E3001]: cancel not allowed\n"));
        assert!(text.contains("suggestion: "));

        let mut json = Vec::new();
        write_error(&mut json, OutputMode::Json, &err).expect("json");
        let value: serde_json::Value = serde_json::from_slice(&json).expect("parse");
        assert_eq!(value["error"]["error_code"], "E3001");
    }
}
