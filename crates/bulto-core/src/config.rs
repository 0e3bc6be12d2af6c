use crate::policy::{PolicyError, StatusPolicy};
use anyhow::{Context, Result, bail};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Project directory holding `config.toml`.
pub const PROJECT_DIR: &str = ".bulto";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy TOML, relative paths resolved against the project root.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// `local`, `utc`, or a fixed offset such as `+02:00`.
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_ids")]
    pub max_ids: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_ids: default_max_ids(),
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Timezone used to compute timeline day keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayZone {
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl FromStr for DisplayZone {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Self::Utc);
        }
        parse_offset(s)
            .map(Self::Fixed)
            .with_context(|| format!("invalid timezone '{s}' (expected local, utc or ±HH:MM)"))
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Utc => f.write_str("utc"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

fn parse_offset(s: &str) -> Result<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => bail!("missing sign"),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().context("hours")?;
    let minutes: i32 = minutes.parse().context("minutes")?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        bail!("offset out of range");
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).context("offset out of range")
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("bulto/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Policy precedence: explicit path, then the project config file, then
/// the built-in tables.
///
/// # Errors
///
/// Propagates read, parse and validation failures of the chosen file.
pub fn resolve_policy(
    project_root: &Path,
    project: &ProjectConfig,
    cli_path: Option<&Path>,
) -> Result<StatusPolicy, PolicyError> {
    let path = cli_path
        .map(Path::to_path_buf)
        .or_else(|| project.policy.file.as_ref().map(|p| project_root.join(p)));
    match path {
        Some(path) => StatusPolicy::load(&path),
        None => Ok(StatusPolicy::builtin()),
    }
}

/// Display zone precedence: CLI flag, then project config, then local time.
pub fn resolve_zone(project: &ProjectConfig, cli_zone: Option<&str>) -> Result<DisplayZone> {
    cli_zone
        .or(project.display.timezone.as_deref())
        .map_or(Ok(DisplayZone::Local), str::parse)
}

/// Output mode precedence: explicit flag, `FORMAT`, user config, TTY.
pub fn resolve_output(cli_format: Option<&str>, user: &UserConfig) -> String {
    let env_format = env::var("FORMAT").ok();
    resolve_output_from(
        cli_format,
        env_format.as_deref(),
        user.output.as_deref(),
        std::io::stdout().is_terminal(),
    )
}

fn resolve_output_from(
    cli_format: Option<&str>,
    env_format: Option<&str>,
    user_output: Option<&str>,
    is_tty: bool,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    [cli_format, env_format, user_output]
        .into_iter()
        .flatten()
        .find_map(normalize_output_mode)
        .unwrap_or(if is_tty { "pretty" } else { "text" })
        .to_string()
}

const fn default_max_ids() -> usize {
    crate::search::MAX_BULK_IDS
}

const fn default_workers() -> usize {
    crate::search::DEFAULT_WORKERS
}
