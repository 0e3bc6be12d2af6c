//! bulto-core library.
//!
//! Rebuilds the operator view of a parcel shipment from the raw event lists
//! the tracking backend returns: events are normalized, partitioned by kind,
//! attached to the status they happened under, grouped into a timeline, and
//! the latest status is checked against the configured status policy to
//! decide which mutating actions are allowed.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums, each mapped to an [`error::ErrorCode`].
//! - **Logging**: Use `tracing` macros (`debug!`, `warn!`, `trace!`).
//! - **Purity**: everything under [`event`], [`timeline`], [`eligibility`] and
//!   [`model`] is a pure function of its input snapshot.

pub mod action;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod event;
pub mod model;
pub mod policy;
pub mod search;
pub mod source;
pub mod timeline;
pub mod timing;
pub mod view;
