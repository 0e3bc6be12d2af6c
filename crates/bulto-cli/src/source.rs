//! Snapshot directory used as a stand-in for the tracking backend.
//!
//! Layout: `<dir>/<tracking>.json` holds shipment snapshots and
//! `<dir>/items/<item_code>.json` holds item status records.

use bulto_core::model::{ItemStatus, ShipmentSnapshot};
use bulto_core::source::{FetchError, ItemStatusSource, ShipmentSource};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn load<T: DeserializeOwned>(&self, dir: &Path, id: &str) -> Result<T, FetchError> {
        let id = id.trim();
        let plain = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\']);
        if !plain {
            return Err(FetchError::NotFound { id: id.to_string() });
        }
        let path = dir.join(format!("{id}.json"));
        debug!(path = %path.display(), "reading snapshot");
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound { id: id.to_string() });
            }
            Err(e) => return Err(FetchError::Server(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map_err(|e| FetchError::Server(format!("{}: {e}", path.display())))
    }
}

impl ShipmentSource for FileSource {
    fn fetch_shipment(&self, tracking_id: &str) -> Result<ShipmentSnapshot, FetchError> {
        self.load(&self.root, tracking_id)
    }
}

impl ItemStatusSource for FileSource {
    fn fetch_item_status(&self, item_code: &str) -> Result<ItemStatus, FetchError> {
        self.load(&self.root.join("items"), item_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("TRK1.json"),
            r#"{"shipmentCode": "SH-1", "statusCode": "2100"}"#,
        )
        .expect("write");
        std::fs::write(dir.path().join("BROKEN.json"), "{").expect("write");
        std::fs::create_dir(dir.path().join("items")).expect("mkdir");
        std::fs::write(
            dir.path().join("items/IT-1.json"),
            r#"{"itemCode": "IT-1", "currentStatus": "2300"}"#,
        )
        .expect("write");
        dir
    }

    #[test]
    fn reads_shipments_and_items() {
        let dir = fixture();
        let source = FileSource::new(dir.path());
        let snap = source.fetch_shipment("TRK1").expect("shipment");
        assert_eq!(snap.shipment_code, "SH-1");
        let item = source.fetch_item_status("IT-1").expect("item");
        assert_eq!(item.current_status.as_deref(), Some("2300"));
    }

    #[test]
    fn missing_files_are_not_found() {
        let dir = fixture();
        let source = FileSource::new(dir.path());
        assert_eq!(
            source.fetch_shipment("NOPE"),
            Err(FetchError::NotFound { id: "NOPE".into() })
        );
        assert!(matches!(
            source.fetch_item_status("TRK1"),
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn path_like_ids_are_refused() {
        let dir = fixture();
        let source = FileSource::new(dir.path());
        for id in ["../TRK1", "items/IT-1", ".hidden", ""] {
            assert!(matches!(
                source.fetch_shipment(id),
                Err(FetchError::NotFound { .. })
            ));
        }
    }

    #[test]
    fn malformed_json_is_a_server_error() {
        let dir = fixture();
        let source = FileSource::new(dir.path());
        assert!(matches!(
            source.fetch_shipment("BROKEN"),
            Err(FetchError::Server(_))
        ));
    }
}
