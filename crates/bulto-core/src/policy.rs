//! Status policy tables.
//!
//! A [`StatusPolicy`] holds the three independent eligibility sets
//! (cancellable, deliverable, assignable) and the code → description, icon
//! and color table used for display. It is configuration, injected into the
//! resolver; [`StatusPolicy::builtin`] ships the defaults and a TOML file
//! replaces them wholesale:
//!
//! ```toml
//! cancellable = ["1500", "1600", "2100", "2300", "3000"]
//! deliverable = ["2100", "2300", "2700"]
//! assignable = ["1000", "1500", "1600", "2300"]
//!
//! [statuses."2100"]
//! description = "En reparto"
//! icon = "route"
//! color = "#ffa726"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;

const NEUTRAL_ICON: &str = "circle";
const NEUTRAL_COLOR: &str = "#9e9e9e";

const BUILTIN_CANCELLABLE: [&str; 5] = ["2100", "2300", "1500", "1600", "3000"];
const BUILTIN_DELIVERABLE: [&str; 3] = ["2100", "2300", "2700"];
const BUILTIN_ASSIGNABLE: [&str; 4] = ["1000", "1500", "1600", "2300"];

const BUILTIN_STATUSES: [(&str, &str, &str, &str); 10] = [
    ("0100", "Datos recibidos", "file-text", "#90a4ae"),
    ("1000", "Admitido", "inbox", "#42a5f5"),
    ("1500", "En almacén de origen", "warehouse", "#5c6bc0"),
    ("1600", "En tránsito", "truck", "#7e57c2"),
    ("2100", "En reparto", "route", "#ffa726"),
    ("2300", "Ausente", "user-x", "#ef5350"),
    ("2500", "Entregado", "check-circle", "#66bb6a"),
    ("2700", "Disponible en punto PUDO", "store", "#26a69a"),
    ("3000", "Anulado", "x-circle", "#757575"),
    ("4000", "Devuelto a origen", "rotate-ccw", "#8d6e63"),
];

/// The three eligibility sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicySet {
    Cancellable,
    Deliverable,
    Assignable,
}

impl PolicySet {
    pub const ALL: [Self; 3] = [Self::Cancellable, Self::Deliverable, Self::Assignable];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancellable => "cancellable",
            Self::Deliverable => "deliverable",
            Self::Assignable => "assignable",
        }
    }
}

impl fmt::Display for PolicySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display attributes of one status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDisplay {
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
}

impl StatusDisplay {
    /// Neutral attributes for a code missing from the table.
    #[must_use]
    pub fn neutral(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            icon: default_icon(),
            color: default_color(),
        }
    }
}

fn default_icon() -> String {
    NEUTRAL_ICON.to_string()
}

fn default_color() -> String {
    NEUTRAL_COLOR.to_string()
}

/// Errors raised while loading or validating a policy file.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse policy {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("empty status code in the {set} set")]
    EmptyCode { set: PolicySet },
    #[error("status code '{code}' listed twice in the {set} set")]
    DuplicateCode { set: PolicySet, code: String },
    #[error("status '{code}' has an empty description")]
    EmptyDescription { code: String },
}

impl PolicyError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } | Self::Parse { .. } => ErrorCode::ConfigParseError,
            _ => ErrorCode::PolicyInvalid,
        }
    }
}

/// On-disk shape; lists rather than sets so duplicates can be reported.
#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    cancellable: Vec<String>,
    #[serde(default)]
    deliverable: Vec<String>,
    #[serde(default)]
    assignable: Vec<String>,
    #[serde(default)]
    statuses: BTreeMap<String, StatusDisplay>,
}

/// Status-code policy consumed by the eligibility resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPolicy {
    cancellable: BTreeSet<String>,
    deliverable: BTreeSet<String>,
    assignable: BTreeSet<String>,
    statuses: BTreeMap<String, StatusDisplay>,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StatusPolicy {
    /// The policy shipped with bulto.
    #[must_use]
    pub fn builtin() -> Self {
        let set = |codes: &[&str]| -> BTreeSet<String> {
            codes.iter().map(|c| (*c).to_string()).collect()
        };
        Self {
            cancellable: set(&BUILTIN_CANCELLABLE[..]),
            deliverable: set(&BUILTIN_DELIVERABLE[..]),
            assignable: set(&BUILTIN_ASSIGNABLE[..]),
            statuses: BUILTIN_STATUSES
                .iter()
                .map(|(code, description, icon, color)| {
                    (
                        (*code).to_string(),
                        StatusDisplay {
                            description: (*description).to_string(),
                            icon: (*icon).to_string(),
                            color: (*color).to_string(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Build a policy from explicit code lists with an empty display table.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::EmptyCode`] or [`PolicyError::DuplicateCode`]
    /// when a list is malformed.
    pub fn from_sets(
        cancellable: &[&str],
        deliverable: &[&str],
        assignable: &[&str],
    ) -> Result<Self, PolicyError> {
        let owned = |codes: &[&str]| codes.iter().map(|c| (*c).to_string()).collect::<Vec<_>>();
        Self::from_file(PolicyFile {
            cancellable: owned(cancellable),
            deliverable: owned(deliverable),
            assignable: owned(assignable),
            statuses: BTreeMap::new(),
        })
    }

    /// Parse a policy document. `origin` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Parse`] for invalid TOML and a validation
    /// error for empty or duplicated codes and empty descriptions.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, PolicyError> {
        let file: PolicyFile = toml::from_str(content).map_err(|source| PolicyError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        Self::from_file(file)
    }

    /// Load and validate a policy file.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Io`] if the file cannot be read, otherwise as
    /// [`StatusPolicy::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    fn from_file(file: PolicyFile) -> Result<Self, PolicyError> {
        for (code, display) in &file.statuses {
            if display.description.trim().is_empty() {
                return Err(PolicyError::EmptyDescription { code: code.clone() });
            }
        }

        Ok(Self {
            cancellable: validated_set(PolicySet::Cancellable, file.cancellable)?,
            deliverable: validated_set(PolicySet::Deliverable, file.deliverable)?,
            assignable: validated_set(PolicySet::Assignable, file.assignable)?,
            statuses: file.statuses,
        })
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, set: PolicySet, code: &str) -> bool {
        self.codes(set).contains(code)
    }

    /// Codes of one set, sorted.
    #[must_use]
    pub const fn codes(&self, set: PolicySet) -> &BTreeSet<String> {
        match set {
            PolicySet::Cancellable => &self.cancellable,
            PolicySet::Deliverable => &self.deliverable,
            PolicySet::Assignable => &self.assignable,
        }
    }

    /// The display table.
    #[must_use]
    pub const fn statuses(&self) -> &BTreeMap<String, StatusDisplay> {
        &self.statuses
    }

    /// Display attributes of `code`, if configured.
    #[must_use]
    pub fn display(&self, code: &str) -> Option<&StatusDisplay> {
        self.statuses.get(code)
    }

    /// Display attributes of `code`, falling back to `fallback` as the
    /// description with a neutral icon and color.
    #[must_use]
    pub fn describe(&self, code: &str, fallback: &str) -> StatusDisplay {
        self.display(code).cloned().unwrap_or_else(|| {
            let description = if fallback.trim().is_empty() {
                code
            } else {
                fallback
            };
            StatusDisplay::neutral(description)
        })
    }
}

fn validated_set(set: PolicySet, codes: Vec<String>) -> Result<BTreeSet<String>, PolicyError> {
    let mut out = BTreeSet::new();
    for code in codes {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(PolicyError::EmptyCode { set });
        }
        if out.contains(&code) {
            return Err(PolicyError::DuplicateCode { set, code });
        }
        out.insert(code);
    }
    Ok(out)
}
