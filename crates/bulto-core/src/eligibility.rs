//! Action eligibility resolver.
//!
//! Pure lookup of a status code against the three policy sets. Unknown codes
//! resolve to all-false: a code missing from every set never enables an
//! action.
//!
//! The resolver does not look at events. Callers pick the status to resolve
//! (the server-supplied shipment status, or [`crate::timeline::latest_status`]
//! for a package) and pass its code.

use crate::event::Event;
use crate::policy::{PolicySet, StatusPolicy};
use crate::timeline::latest_status;
use serde::Serialize;
use tracing::trace;

/// Which mutating actions a status allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Eligibility {
    pub cancellable: bool,
    pub deliverable: bool,
    pub assignable: bool,
}

impl Eligibility {
    /// Nothing allowed.
    pub const NONE: Self = Self {
        cancellable: false,
        deliverable: false,
        assignable: false,
    };

    /// Returns `true` if at least one action is allowed.
    #[must_use]
    pub const fn any(self) -> bool {
        self.cancellable || self.deliverable || self.assignable
    }

    /// Flag for one policy set.
    #[must_use]
    pub const fn allows(self, set: PolicySet) -> bool {
        match set {
            PolicySet::Cancellable => self.cancellable,
            PolicySet::Deliverable => self.deliverable,
            PolicySet::Assignable => self.assignable,
        }
    }
}

/// Resolve the flags of `code`.
#[must_use]
pub fn resolve(policy: &StatusPolicy, code: &str) -> Eligibility {
    let flags = Eligibility {
        cancellable: policy.contains(PolicySet::Cancellable, code),
        deliverable: policy.contains(PolicySet::Deliverable, code),
        assignable: policy.contains(PolicySet::Assignable, code),
    };
    if !flags.any() {
        trace!(code, "status code in no eligibility set");
    }
    flags
}

/// Resolve an optional code; `None` is fail-closed.
#[must_use]
pub fn resolve_opt(policy: &StatusPolicy, code: Option<&str>) -> Eligibility {
    code.map_or(Eligibility::NONE, |c| resolve(policy, c))
}

/// Resolve the latest status among `events`, or [`Eligibility::NONE`] when
/// there is no status event.
#[must_use]
pub fn resolve_latest(policy: &StatusPolicy, events: &[Event]) -> Eligibility {
    resolve_opt(policy, latest_status(events).map(|e| e.code.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use chrono::{DateTime, Utc};

    #[test]
    fn unknown_code_is_fail_closed() {
        let policy = StatusPolicy::builtin();
        assert_eq!(resolve(&policy, "9999"), Eligibility::NONE);
        assert_eq!(resolve_opt(&policy, None), Eligibility::NONE);
    }

    #[test]
    fn sets_are_independent() {
        let policy = StatusPolicy::from_sets(&["A", "B"], &["B"], &["C"]).expect("policy");
        assert_eq!(
            resolve(&policy, "B"),
            Eligibility {
                cancellable: true,
                deliverable: true,
                assignable: false,
            }
        );
        assert!(resolve(&policy, "C").allows(PolicySet::Assignable));
        assert!(!resolve(&policy, "C").allows(PolicySet::Cancellable));
    }

    #[test]
    fn resolve_is_idempotent() {
        let policy = StatusPolicy::builtin();
        assert_eq!(resolve(&policy, "2300"), resolve(&policy, "2300"));
    }

    #[test]
    fn resolve_latest_uses_max_timestamp_status() {
        let policy = StatusPolicy::builtin();
        let at = |secs: i64| DateTime::<Utc>::from_timestamp(secs, 0).expect("valid");
        let events = vec![
            Event::new("2100", EventKind::Status, at(30)),
            Event::new("2500", EventKind::Status, at(10)),
            Event::new("SCAN", EventKind::PackageEvent, at(40)),
        ];
        assert!(resolve_latest(&policy, &events).deliverable);
        assert_eq!(resolve_latest(&policy, &[]), Eligibility::NONE);
    }
}
