//! Wire documents received from the sync server

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Entity;

/// One document in an import payload
///
/// The entity's own fields sit at the top level next to the server's
/// bookkeeping: `pending` lists the devices that still have to receive
/// this document, `isDeleted` marks a deletion tombstone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDocument {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(default)]
    pub pending: Vec<String>,
    #[serde(default, rename = "isDeleted")]
    pub is_deleted: bool,
}

impl ImportDocument {
    /// Whether the server still expects `device_id` to acknowledge this document
    pub fn is_pending_for(&self, device_id: &str) -> bool {
        self.pending.iter().any(|id| id == device_id)
    }
}

/// Body of `GET /documents/all`
///
/// Documents are kept as raw values so the checksum is computed over
/// exactly what the server sent, and so one malformed document doesn't
/// reject the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPayload {
    pub checksum: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;
    use serde_json::json;

    #[test]
    fn test_document_from_wire() {
        let doc: ImportDocument = serde_json::from_value(json!({
            "type": "Series",
            "id": "2",
            "seriesName": "Series 1",
            "programId": "1",
            "pending": ["dev-1", "dev-2"],
            "isDeleted": false
        }))
        .unwrap();

        assert_eq!(doc.entity.entity_type(), EntityType::Series);
        assert_eq!(doc.entity.id(), "2");
        assert!(doc.is_pending_for("dev-2"));
        assert!(!doc.is_pending_for("dev-3"));
        assert!(!doc.is_deleted);
    }

    #[test]
    fn test_document_defaults() {
        let doc: ImportDocument = serde_json::from_value(json!({
            "type": "Program",
            "id": "1",
            "isDeleted": true
        }))
        .unwrap();
        assert!(doc.pending.is_empty());
        assert!(doc.is_deleted);
        assert_eq!(doc.entity.name(), "");
    }

    #[test]
    fn test_full_payload() {
        let payload: FullPayload = serde_json::from_str(
            r#"{"checksum":"abc","data":[{"type":"Program","id":"1"}]}"#,
        )
        .unwrap();
        assert_eq!(payload.checksum, "abc");
        assert_eq!(payload.data.len(), 1);
    }
}
