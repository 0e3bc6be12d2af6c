//! `bulto action`: validate a mutating action against a snapshot.
//!
//! Nothing is sent anywhere: the request passes the same policy gate a live
//! client uses and is printed as it would go over the wire.

use super::{Ctx, read_json};
use crate::output::{pretty_kv, pretty_section, render_mode};
use anyhow::{Context, Result, anyhow};
use bulto_core::action::{
    Action, ActionGate, ActionOutcome, ActionReceipt, ActionSink, AssignRouteRequest,
    CancelStatusRequest, DeliverRequest, ForceStatusRequest, ManualEventRequest,
};
use bulto_core::error::CoreError;
use bulto_core::event::parse_timestamp_str;
use bulto_core::model::ShipmentSnapshot;
use bulto_core::source::FetchError;
use bulto_core::view::ShipmentView;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ActionArgs {
    #[command(subcommand)]
    pub command: ActionCommand,
}

#[derive(Subcommand, Debug)]
pub enum ActionCommand {
    /// Cancel the latest status of a package.
    Cancel {
        /// Shipment snapshot JSON (`-` for stdin).
        #[arg(long)]
        snapshot: PathBuf,
        /// Item code of the package.
        #[arg(long)]
        item: String,
        /// Why the status is cancelled.
        #[arg(long)]
        reason: String,
        /// Timestamp of the status to cancel (defaults to the latest one).
        #[arg(long)]
        at: Option<String>,
        /// Label recorded with the cancellation.
        #[arg(long)]
        label: Option<String>,
    },

    /// Mark the shipment delivered.
    Deliver {
        #[arg(long)]
        snapshot: PathBuf,
        /// Delivered to a pick-up point; no signee needed.
        #[arg(long)]
        pudo: bool,
        #[arg(long)]
        signee: Option<String>,
        #[arg(long)]
        route: Option<String>,
        /// Delivery time (defaults to now).
        #[arg(long)]
        at: Option<String>,
    },

    /// Assign the shipment to a delivery route.
    Assign {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        route: String,
        #[arg(long)]
        at: Option<String>,
    },

    /// Force an item into a status.
    Force {
        #[arg(long)]
        item: String,
        /// Target status code.
        #[arg(long)]
        to: String,
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        at: Option<String>,
    },

    /// Create a manual event from a JSON object.
    Event {
        /// Event payload JSON (`-` for stdin).
        payload: PathBuf,
    },
}

/// A request captured instead of being sent.
#[derive(Debug, Clone, Serialize)]
pub struct Captured {
    pub action: Action,
    pub request: Value,
}

/// Sink that records every request and accepts it.
#[derive(Debug, Default)]
pub struct DryRunSink {
    captured: Vec<Captured>,
}

impl DryRunSink {
    fn capture<T: Serialize>(&mut self, action: Action, req: &T) -> ActionOutcome {
        match serde_json::to_value(req) {
            Ok(request) => {
                self.captured.push(Captured { action, request });
                ActionOutcome::ok()
            }
            Err(e) => ActionOutcome::failed(e.to_string()),
        }
    }

    pub fn captured(&self) -> &[Captured] {
        &self.captured
    }
}

impl ActionSink for DryRunSink {
    fn cancel_status(&mut self, req: &CancelStatusRequest) -> ActionOutcome {
        self.capture(Action::CancelStatus, req)
    }

    fn force_status(&mut self, req: &ForceStatusRequest) -> ActionOutcome {
        self.capture(Action::ForceStatus, req)
    }

    fn assign_to_route(&mut self, req: &AssignRouteRequest) -> ActionOutcome {
        self.capture(Action::AssignRoute, req)
    }

    fn deliver(&mut self, req: &DeliverRequest) -> ActionOutcome {
        self.capture(Action::Deliver, req)
    }

    fn create_manual_event(&mut self, req: &ManualEventRequest) -> ActionOutcome {
        self.capture(Action::ManualEvent, &req.payload)
    }

    fn print_label(&mut self, shipment_code: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Server(format!(
            "no label service for '{shipment_code}' in dry run"
        )))
    }
}

#[derive(Debug, Serialize)]
struct DryRunReport {
    dry_run: bool,
    receipt: ActionReceipt,
    request: Value,
}

fn parse_at(at: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    at.map(|s| parse_timestamp_str(s).ok_or_else(|| anyhow!("Invalid timestamp '{s}'")))
        .transpose()
}

fn load_view(path: &Path, ctx: &Ctx) -> Result<ShipmentView> {
    let snapshot: ShipmentSnapshot = read_json(path)?;
    Ok(ShipmentView::build_in(&snapshot, &ctx.policy, ctx.zone))
}

/// Run one action through the gate and return what the sink captured.
fn dispatch(command: &ActionCommand, ctx: &Ctx) -> Result<DryRunReport> {
    let mut sink = DryRunSink::default();
    let mut gate = ActionGate::new(&ctx.policy, &mut sink);
    let receipt = match command {
        ActionCommand::Cancel {
            snapshot,
            item,
            reason,
            at,
            label,
        } => {
            let view = load_view(snapshot, ctx)?;
            let package = view.package(item).ok_or_else(|| CoreError::ItemNotFound {
                shipment_code: view.shipment_code.clone(),
                item_code: item.clone(),
            })?;
            let status_timestamp = parse_at(at.as_deref())?
                .or_else(|| package.latest_status.as_ref().map(|e| e.timestamp))
                .unwrap_or_else(Utc::now);
            let req = CancelStatusRequest {
                item_code: item.clone(),
                status_timestamp,
                reason: reason.clone(),
                status_label: label.clone(),
            };
            gate.cancel_status(package, &req)?
        }
        ActionCommand::Deliver {
            snapshot,
            pudo,
            signee,
            route,
            at,
        } => {
            let view = load_view(snapshot, ctx)?;
            let req = DeliverRequest {
                shipment_code: view.shipment_code.clone(),
                is_pudo: *pudo,
                signee: signee.clone(),
                timestamp: parse_at(at.as_deref())?.unwrap_or_else(Utc::now),
                route_code: route.clone(),
            };
            gate.deliver(&view, &req)?
        }
        ActionCommand::Assign { snapshot, route, at } => {
            let view = load_view(snapshot, ctx)?;
            let req = AssignRouteRequest {
                shipment_code: view.shipment_code.clone(),
                route_code: route.clone(),
                timestamp: parse_at(at.as_deref())?.unwrap_or_else(Utc::now),
            };
            gate.assign_to_route(&view, &req)?
        }
        ActionCommand::Force {
            item,
            to,
            context,
            at,
        } => {
            let req = ForceStatusRequest {
                item_code: item.clone(),
                target_code: to.clone(),
                timestamp: parse_at(at.as_deref())?.unwrap_or_else(Utc::now),
                context: context.clone(),
            };
            gate.force_status(&req)?
        }
        ActionCommand::Event { payload } => {
            let value: Value = read_json(payload)?;
            let Value::Object(payload) = value else {
                anyhow::bail!("Event payload must be a JSON object");
            };
            gate.create_manual_event(&ManualEventRequest { payload })?
        }
    };
    drop(gate);
    let request = sink
        .captured()
        .last()
        .map(|c| c.request.clone())
        .context("Accepted action left no request")?;
    Ok(DryRunReport {
        dry_run: true,
        receipt,
        request,
    })
}

/// Execute `bulto action <subcommand>`.
///
/// # Errors
///
/// Returns an error if inputs cannot be read or the action is refused.
pub fn run_action(args: &ActionArgs, ctx: &Ctx) -> Result<()> {
    let report = dispatch(&args.command, ctx)?;
    render_mode(ctx.output, &report, render_text, render_human)
}

fn request_json(report: &DryRunReport) -> io::Result<String> {
    serde_json::to_string_pretty(&report.request).map_err(io::Error::other)
}

fn render_human(report: &DryRunReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("✓ {} accepted (dry run)", report.receipt.action))?;
    pretty_kv(w, "refetch", "required before showing the result")?;
    writeln!(w)?;
    writeln!(w, "{}", request_json(report)?)
}

fn render_text(report: &DryRunReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}\tok\tdry_run", report.receipt.action)?;
    let line = serde_json::to_string(&report.request).map_err(io::Error::other)?;
    writeln!(w, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputMode;
    use bulto_core::action::ActionError;
    use bulto_core::config::{DisplayZone, SearchConfig};
    use bulto_core::policy::StatusPolicy;
    use tempfile::TempDir;

    fn ctx() -> Ctx {
        Ctx {
            output: OutputMode::Json,
            zone: DisplayZone::Utc,
            policy: StatusPolicy::builtin(),
            search: SearchConfig::default(),
        }
    }

    fn snapshot(dir: &TempDir, status: &str) -> PathBuf {
        let path = dir.path().join("snap.json");
        let body = serde_json::json!({
            "shipmentCode": "SH-1",
            "statusCode": status,
            "shipmentEvents": [],
            "packages": [{"itemCode": "IT-1", "events": [
                {"code": "1500", "type": "STATUS", "date": "2024-03-01T08:00:00Z"},
                {"code": status, "type": "STATUS", "date": "2024-03-01T10:00:00Z"}
            ]}]
        });
        std::fs::write(&path, body.to_string()).expect("write snapshot");
        path
    }

    fn action_error(err: &anyhow::Error) -> &ActionError {
        err.downcast_ref::<ActionError>().expect("action error")
    }

    #[test]
    fn cancel_defaults_to_latest_status() {
        let dir = TempDir::new().expect("tempdir");
        let report = dispatch(
            &ActionCommand::Cancel {
                snapshot: snapshot(&dir, "2100"),
                item: "IT-1".into(),
                reason: "wrong scan".into(),
                at: None,
                label: None,
            },
            &ctx(),
        )
        .expect("accepted");
        assert!(report.receipt.requires_refetch);
        assert_eq!(report.request["itemCode"], "IT-1");
        assert_eq!(report.request["statusTimestamp"], "2024-03-01T10:00:00Z");
    }

    #[test]
    fn cancel_of_older_status_is_refused() {
        let dir = TempDir::new().expect("tempdir");
        let err = dispatch(
            &ActionCommand::Cancel {
                snapshot: snapshot(&dir, "2100"),
                item: "IT-1".into(),
                reason: "wrong scan".into(),
                at: Some("2024-03-01T08:00:00Z".into()),
                label: None,
            },
            &ctx(),
        )
        .expect_err("older status");
        assert!(matches!(action_error(&err), ActionError::NotLatestStatus { .. }));
    }

    #[test]
    fn cancel_unknown_item_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let err = dispatch(
            &ActionCommand::Cancel {
                snapshot: snapshot(&dir, "2100"),
                item: "NOPE".into(),
                reason: "x".into(),
                at: None,
                label: None,
            },
            &ctx(),
        )
        .expect_err("unknown item");
        assert!(err.downcast_ref::<CoreError>().is_some());
    }

    #[test]
    fn deliver_denied_outside_deliverable_set() {
        let dir = TempDir::new().expect("tempdir");
        let err = dispatch(
            &ActionCommand::Deliver {
                snapshot: snapshot(&dir, "1500"),
                pudo: true,
                signee: None,
                route: None,
                at: None,
            },
            &ctx(),
        )
        .expect_err("denied");
        assert!(matches!(action_error(&err), ActionError::PolicyDenied { .. }));
    }

    #[test]
    fn assign_captures_route() {
        let dir = TempDir::new().expect("tempdir");
        let report = dispatch(
            &ActionCommand::Assign {
                snapshot: snapshot(&dir, "2300"),
                route: "R-7".into(),
                at: Some("2024-03-02 09:00:00".into()),
            },
            &ctx(),
        )
        .expect("accepted");
        assert_eq!(report.receipt.action, Action::AssignRoute);
        assert_eq!(report.request["routeCode"], "R-7");
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let err = parse_at(Some("yesterday")).expect_err("invalid");
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn event_payload_must_be_object() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("event.json");
        std::fs::write(&path, "[1, 2]").expect("write");
        let err = dispatch(&ActionCommand::Event { payload: path }, &ctx()).expect_err("array");
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn dry_run_label_is_unavailable() {
        let mut sink = DryRunSink::default();
        assert!(sink.print_label("SH-1").is_err());
    }
}
