//! Package projection.
//!
//! Turns the shipment's item list into numbered packages. The number is a
//! 1-based position among items that carry an item code, recomputed on every
//! call: it is a display ordinal only and shifts when the backend item list
//! changes. Refer to packages by `item_code`.

use super::shipment::ItemHistory;
use serde::Serialize;
use serde_json::Value;

/// One physical package ("bulto") of a shipment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub item_code: String,
    /// 1-based position after filtering. Not a durable identifier.
    pub package_number: usize,
    pub events: Vec<Value>,
}

/// Number the items that carry a non-blank item code, in input order.
#[must_use]
pub fn project(items: &[ItemHistory]) -> Vec<Package> {
    items
        .iter()
        .filter_map(|item| {
            let code = item.item_code.as_deref()?.trim();
            (!code.is_empty()).then(|| (code.to_string(), item.events.clone()))
        })
        .enumerate()
        .map(|(idx, (item_code, events))| Package {
            item_code,
            package_number: idx + 1,
            events,
        })
        .collect()
}
