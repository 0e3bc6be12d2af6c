//! Gated mutating actions.
//!
//! [`ActionGate`] checks a request against the current view and the status
//! policy before handing it to an [`ActionSink`]. A successful dispatch never
//! patches the view: the receipt tells the caller to re-fetch.

use crate::eligibility::resolve_opt;
use crate::error::ErrorCode;
use crate::policy::{PolicySet, StatusPolicy};
use crate::source::FetchError;
use crate::view::{PackageView, ShipmentView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CancelStatus,
    ForceStatus,
    AssignRoute,
    Deliver,
    ManualEvent,
    PrintLabel,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CancelStatus => "cancel_status",
            Self::ForceStatus => "force_status",
            Self::AssignRoute => "assign_route",
            Self::Deliver => "deliver",
            Self::ManualEvent => "manual_event",
            Self::PrintLabel => "print_label",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelStatusRequest {
    pub item_code: String,
    /// Timestamp of the status event being cancelled.
    pub status_timestamp: DateTime<Utc>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceStatusRequest {
    pub item_code: String,
    pub target_code: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRouteRequest {
    pub shipment_code: String,
    pub route_code: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverRequest {
    pub shipment_code: String,
    pub is_pudo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signee: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_code: Option<String>,
}

/// Free-form event payload, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualEventRequest {
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Backend answer to a mutating call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Transport for mutating calls.
pub trait ActionSink {
    fn cancel_status(&mut self, req: &CancelStatusRequest) -> ActionOutcome;
    fn force_status(&mut self, req: &ForceStatusRequest) -> ActionOutcome;
    fn assign_to_route(&mut self, req: &AssignRouteRequest) -> ActionOutcome;
    fn deliver(&mut self, req: &DeliverRequest) -> ActionOutcome;
    fn create_manual_event(&mut self, req: &ManualEventRequest) -> ActionOutcome;

    /// Rendered label document.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`] from the label service.
    fn print_label(&mut self, shipment_code: &str) -> Result<Vec<u8>, FetchError>;
}

impl<T: ActionSink + ?Sized> ActionSink for &mut T {
    fn cancel_status(&mut self, req: &CancelStatusRequest) -> ActionOutcome {
        (**self).cancel_status(req)
    }
    fn force_status(&mut self, req: &ForceStatusRequest) -> ActionOutcome {
        (**self).force_status(req)
    }
    fn assign_to_route(&mut self, req: &AssignRouteRequest) -> ActionOutcome {
        (**self).assign_to_route(req)
    }
    fn deliver(&mut self, req: &DeliverRequest) -> ActionOutcome {
        (**self).deliver(req)
    }
    fn create_manual_event(&mut self, req: &ManualEventRequest) -> ActionOutcome {
        (**self).create_manual_event(req)
    }
    fn print_label(&mut self, shipment_code: &str) -> Result<Vec<u8>, FetchError> {
        (**self).print_label(shipment_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("{action} not allowed for status {code}")]
    PolicyDenied { action: Action, code: String },
    #[error("{action} not allowed: no current status")]
    NoStatus { action: Action },
    #[error("status at {requested} of item {item_code} is not its latest status")]
    NotLatestStatus {
        item_code: String,
        requested: DateTime<Utc>,
    },
    #[error("{action} requires a non-empty {field}")]
    MissingField { action: Action, field: &'static str },
    #[error("{action} rejected: {message}")]
    Rejected { action: Action, message: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ActionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::PolicyDenied { .. } | Self::NoStatus { .. } => ErrorCode::PolicyDenied,
            Self::NotLatestStatus { .. } => ErrorCode::NotLatestStatus,
            Self::MissingField { .. } => ErrorCode::InvalidActionRequest,
            Self::Rejected { .. } => ErrorCode::ActionRejected,
            Self::Fetch(e) => e.code(),
        }
    }
}

/// Result of an accepted dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionReceipt {
    pub action: Action,
    /// Always set: the displayed view is stale until re-fetched.
    pub requires_refetch: bool,
}

/// "Just cancelled" markers shown until the next fetch lands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimisticFlags {
    cancelled: HashSet<(String, DateTime<Utc>)>,
}

impl OptimisticFlags {
    pub fn mark_cancelled(&mut self, item_code: &str, status_timestamp: DateTime<Utc>) {
        self.cancelled
            .insert((item_code.to_string(), status_timestamp));
    }

    #[must_use]
    pub fn is_cancelled(&self, item_code: &str, status_timestamp: DateTime<Utc>) -> bool {
        self.cancelled
            .contains(&(item_code.to_string(), status_timestamp))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cancelled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty()
    }

    /// Forget every marker.
    pub fn clear(&mut self) {
        self.cancelled.clear();
    }
}

/// Policy checks in front of an [`ActionSink`].
pub struct ActionGate<'p, S> {
    policy: &'p StatusPolicy,
    sink: S,
    flags: OptimisticFlags,
}

fn require(action: Action, field: &'static str, value: &str) -> Result<(), ActionError> {
    if value.trim().is_empty() {
        return Err(ActionError::MissingField { action, field });
    }
    Ok(())
}

impl<'p, S: ActionSink> ActionGate<'p, S> {
    pub fn new(policy: &'p StatusPolicy, sink: S) -> Self {
        Self {
            policy,
            sink,
            flags: OptimisticFlags::default(),
        }
    }

    #[must_use]
    pub const fn flags(&self) -> &OptimisticFlags {
        &self.flags
    }

    /// Drop optimistic markers once a fresh view has been fetched.
    pub fn reload(&mut self) {
        self.flags.clear();
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Cancel the latest status of a package.
    ///
    /// # Errors
    ///
    /// [`ActionError::MissingField`] without a reason,
    /// [`ActionError::NotLatestStatus`] when the request targets an older
    /// status, [`ActionError::PolicyDenied`] when the latest status is not
    /// cancellable, [`ActionError::Rejected`] when the backend refuses.
    pub fn cancel_status(
        &mut self,
        package: &PackageView,
        req: &CancelStatusRequest,
    ) -> Result<ActionReceipt, ActionError> {
        let action = Action::CancelStatus;
        require(action, "item_code", &req.item_code)?;
        require(action, "reason", &req.reason)?;
        let latest = package
            .latest_status
            .as_ref()
            .ok_or(ActionError::NoStatus { action })?;
        if latest.timestamp != req.status_timestamp || package.item_code != req.item_code {
            return Err(ActionError::NotLatestStatus {
                item_code: req.item_code.clone(),
                requested: req.status_timestamp,
            });
        }
        self.check(action, PolicySet::Cancellable, Some(&latest.code))?;
        let outcome = self.sink.cancel_status(req);
        let receipt = Self::settle(action, outcome)?;
        self.flags
            .mark_cancelled(&req.item_code, req.status_timestamp);
        Ok(receipt)
    }

    /// Mark a shipment delivered.
    ///
    /// # Errors
    ///
    /// [`ActionError::PolicyDenied`] or [`ActionError::NoStatus`] when the
    /// shipment status is not deliverable, [`ActionError::MissingField`]
    /// without a signee on a non-PUDO delivery.
    pub fn deliver(
        &mut self,
        shipment: &ShipmentView,
        req: &DeliverRequest,
    ) -> Result<ActionReceipt, ActionError> {
        let action = Action::Deliver;
        require(action, "shipment_code", &req.shipment_code)?;
        self.check(action, PolicySet::Deliverable, shipment.status_code.as_deref())?;
        if !req.is_pudo {
            require(action, "signee", req.signee.as_deref().unwrap_or_default())?;
        }
        let outcome = self.sink.deliver(req);
        Self::settle(action, outcome)
    }

    /// Assign a shipment to a delivery route.
    ///
    /// # Errors
    ///
    /// [`ActionError::PolicyDenied`] or [`ActionError::NoStatus`] when the
    /// shipment status is not assignable, [`ActionError::MissingField`]
    /// without a route code.
    pub fn assign_to_route(
        &mut self,
        shipment: &ShipmentView,
        req: &AssignRouteRequest,
    ) -> Result<ActionReceipt, ActionError> {
        let action = Action::AssignRoute;
        require(action, "shipment_code", &req.shipment_code)?;
        require(action, "route_code", &req.route_code)?;
        self.check(action, PolicySet::Assignable, shipment.status_code.as_deref())?;
        let outcome = self.sink.assign_to_route(req);
        Self::settle(action, outcome)
    }

    /// Force an item into a status.
    ///
    /// # Errors
    ///
    /// [`ActionError::MissingField`] on empty identifiers,
    /// [`ActionError::Rejected`] when the backend refuses.
    pub fn force_status(&mut self, req: &ForceStatusRequest) -> Result<ActionReceipt, ActionError> {
        let action = Action::ForceStatus;
        require(action, "item_code", &req.item_code)?;
        require(action, "target_code", &req.target_code)?;
        let outcome = self.sink.force_status(req);
        Self::settle(action, outcome)
    }

    /// # Errors
    ///
    /// [`ActionError::MissingField`] on an empty payload,
    /// [`ActionError::Rejected`] when the backend refuses.
    pub fn create_manual_event(
        &mut self,
        req: &ManualEventRequest,
    ) -> Result<ActionReceipt, ActionError> {
        let action = Action::ManualEvent;
        if req.payload.is_empty() {
            return Err(ActionError::MissingField {
                action,
                field: "payload",
            });
        }
        let outcome = self.sink.create_manual_event(req);
        Self::settle(action, outcome)
    }

    /// # Errors
    ///
    /// [`ActionError::MissingField`] on an empty shipment code,
    /// [`ActionError::Fetch`] from the label service.
    pub fn print_label(&mut self, shipment_code: &str) -> Result<Vec<u8>, ActionError> {
        require(Action::PrintLabel, "shipment_code", shipment_code)?;
        Ok(self.sink.print_label(shipment_code)?)
    }

    fn check(&self, action: Action, set: PolicySet, code: Option<&str>) -> Result<(), ActionError> {
        let code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(ActionError::NoStatus { action })?;
        if resolve_opt(self.policy, Some(code)).allows(set) {
            return Ok(());
        }
        warn!(%action, code, "action denied by status policy");
        Err(ActionError::PolicyDenied {
            action,
            code: code.to_string(),
        })
    }

    fn settle(action: Action, outcome: ActionOutcome) -> Result<ActionReceipt, ActionError> {
        if outcome.success {
            info!(%action, "action accepted");
            return Ok(ActionReceipt {
                action,
                requires_refetch: true,
            });
        }
        let message = outcome
            .error
            .unwrap_or_else(|| "no reason given".to_string());
        warn!(%action, %message, "action rejected by backend");
        Err(ActionError::Rejected { action, message })
    }
}
