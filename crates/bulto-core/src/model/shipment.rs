use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One shipment as returned by the shipment history fetch.
///
/// The shipment-level stream and each item's stream arrive as separate
/// lists; one is never filtered out of the other. History entries stay raw
/// JSON until normalization so one bad entry cannot sink the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentSnapshot {
    pub shipment_code: String,
    /// Server-supplied current status. Drives shipment eligibility even when
    /// it briefly disagrees with the event stream after a mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(default)]
    pub shipment_events: Vec<Value>,
    #[serde(default)]
    pub packages: Vec<ItemHistory>,
}

/// One entry of the shipment's item list. Entries without an item code are
/// not packages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemHistory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    #[serde(default)]
    pub events: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_backend_payload() {
        let snapshot: ShipmentSnapshot = serde_json::from_value(json!({
            "shipmentCode": "SH-1",
            "statusCode": "2100",
            "shipmentEvents": [{"code": "2100", "type": "STATUS", "date": 0}],
            "packages": [{"itemCode": "IT-1", "events": []}, {}]
        }))
        .expect("deserialize");
        assert_eq!(snapshot.shipment_code, "SH-1");
        assert_eq!(snapshot.status_code.as_deref(), Some("2100"));
        assert_eq!(snapshot.shipment_events.len(), 1);
        assert_eq!(snapshot.packages.len(), 2);
        assert!(snapshot.packages[1].item_code.is_none());
    }

    #[test]
    fn optional_lists_default_to_empty() {
        let snapshot: ShipmentSnapshot =
            serde_json::from_value(json!({"shipmentCode": "SH-2"})).expect("deserialize");
        assert!(snapshot.status_code.is_none());
        assert!(snapshot.shipment_events.is_empty());
        assert!(snapshot.packages.is_empty());
    }

    #[test]
    fn odd_history_entries_do_not_fail_the_snapshot() {
        let snapshot: ShipmentSnapshot = serde_json::from_value(json!({
            "shipmentCode": "SH-3",
            "shipmentEvents": [
                null,
                "garbage",
                {"code": "2100", "type": "STATUS", "date": 0, "timestamp": 0}
            ],
            "packages": [{"itemCode": "IT-1", "events": [{"kind": "EVENT", "type": "EVENT"}]}]
        }))
        .expect("deserialize");
        assert_eq!(snapshot.shipment_events.len(), 3);
        assert_eq!(snapshot.packages[0].events.len(), 1);
    }
}
