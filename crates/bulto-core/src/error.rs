use std::fmt;

/// Machine-readable error codes for operator tooling and scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    PolicyInvalid,
    ShipmentNotFound,
    ItemNotFound,
    InvalidEvent,
    PolicyDenied,
    NotLatestStatus,
    InvalidActionRequest,
    ActionRejected,
    AuthFailed,
    BackendFailure,
    SearchSuperseded,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::PolicyInvalid => "E1002",
            Self::ShipmentNotFound => "E2001",
            Self::ItemNotFound => "E2002",
            Self::InvalidEvent => "E2003",
            Self::PolicyDenied => "E3001",
            Self::NotLatestStatus => "E3002",
            Self::InvalidActionRequest => "E3003",
            Self::ActionRejected => "E3004",
            Self::AuthFailed => "E4001",
            Self::BackendFailure => "E4002",
            Self::SearchSuperseded => "E4003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::PolicyInvalid => "Status policy is invalid",
            Self::ShipmentNotFound => "Shipment not found",
            Self::ItemNotFound => "Item not found",
            Self::InvalidEvent => "Event is missing required fields",
            Self::PolicyDenied => "Action not allowed for the current status",
            Self::NotLatestStatus => "Targeted status is not the latest status",
            Self::InvalidActionRequest => "Action request is incomplete",
            Self::ActionRejected => "Backend rejected the action",
            Self::AuthFailed => "Authentication failed",
            Self::BackendFailure => "Backend failure",
            Self::SearchSuperseded => "Search superseded by a newer one",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .bulto/config.toml and retry."),
            Self::PolicyInvalid => {
                Some("Check the policy file for empty or duplicated status codes.")
            }
            Self::ShipmentNotFound => Some("Verify the tracking number and retry."),
            Self::ItemNotFound => Some("Verify the item code against the shipment's packages."),
            Self::InvalidEvent => None,
            Self::PolicyDenied => {
                Some("Check `bulto eligibility <code>` for the actions this status allows.")
            }
            Self::NotLatestStatus => Some("Only the most recent status of a package can be cancelled."),
            Self::InvalidActionRequest => Some("Provide every required field for the action."),
            Self::ActionRejected => Some("Re-fetch the shipment; its status may have changed."),
            Self::AuthFailed => Some("Refresh the session token and retry."),
            Self::BackendFailure => Some("Retry once. If persistent, check backend health."),
            Self::SearchSuperseded => None,
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Umbrella over the typed errors of the library.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Policy(#[from] crate::policy::PolicyError),
    #[error(transparent)]
    Fetch(#[from] crate::source::FetchError),
    #[error(transparent)]
    Action(#[from] crate::action::ActionError),
    #[error("item '{item_code}' not found in shipment {shipment_code}")]
    ItemNotFound {
        shipment_code: String,
        item_code: String,
    },
    #[error("search superseded after {filled} of {total} slots")]
    Superseded { filled: usize, total: usize },
}

impl CoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Policy(e) => e.code(),
            Self::Fetch(e) => e.code(),
            Self::Action(e) => e.code(),
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            Self::Superseded { .. } => ErrorCode::SearchSuperseded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreError, ErrorCode};
    use std::collections::HashSet;

    const ALL: [ErrorCode; 13] = [
        ErrorCode::ConfigParseError,
        ErrorCode::PolicyInvalid,
        ErrorCode::ShipmentNotFound,
        ErrorCode::ItemNotFound,
        ErrorCode::InvalidEvent,
        ErrorCode::PolicyDenied,
        ErrorCode::NotLatestStatus,
        ErrorCode::InvalidActionRequest,
        ErrorCode::ActionRejected,
        ErrorCode::AuthFailed,
        ErrorCode::BackendFailure,
        ErrorCode::SearchSuperseded,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let s = code.code();
            assert_eq!(s.len(), 5);
            assert!(s.starts_with('E'));
            assert!(s.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn core_error_delegates_code() {
        let err = CoreError::from(crate::source::FetchError::Auth("expired".into()));
        assert_eq!(err.code(), ErrorCode::AuthFailed);
        assert_eq!(err.to_string(), "authentication failed: expired");
        let err = CoreError::Superseded { filled: 2, total: 5 };
        assert_eq!(err.code(), ErrorCode::SearchSuperseded);
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(ErrorCode::PolicyDenied.to_string(), "E3001");
    }
}
