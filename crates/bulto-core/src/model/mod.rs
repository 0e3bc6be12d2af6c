//! Backend data shapes consumed by the core, and the package projection.

pub mod item_status;
pub mod package;
pub mod shipment;

pub use item_status::{AuditEntry, ItemStatus, TransitionError};
pub use package::{Package, project};
pub use shipment::{ItemHistory, ShipmentSnapshot};
