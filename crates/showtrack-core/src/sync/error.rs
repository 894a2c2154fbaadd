//! Sync error taxonomy
//!
//! Failures inside an export or import pass are not propagated: each call
//! site turns its failure into a [`SyncError`] and appends it to the pass's
//! [`ErrorLog`]. The pass carries on with the remaining records and the
//! whole list is shown to the user at the end.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::models::EntityType;

/// What kind of step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncErrorKind {
    SendError,
    ReceiveError,
    SaveError,
    DeleteError,
    ChecksumMismatch,
}

impl SyncErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorKind::SendError => "SendError",
            SyncErrorKind::ReceiveError => "ReceiveError",
            SyncErrorKind::SaveError => "SaveError",
            SyncErrorKind::DeleteError => "DeleteError",
            SyncErrorKind::ChecksumMismatch => "ChecksumMismatch",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded failure
///
/// `entity_type` is a label: an entity type name for per-record failures,
/// or `"Sync"` / `"Device"` for failures of the pass or the registration
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncError {
    pub kind: SyncErrorKind,
    pub entity_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SyncError {
    pub fn new(kind: SyncErrorKind, entity_type: impl fmt::Display, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity_type: entity_type.to_string(),
            message: message.into(),
            id: None,
        }
    }

    /// Failure tied to one entity
    pub fn for_entity(
        kind: SyncErrorKind,
        entity_type: EntityType,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(kind, entity_type, message)
        }
    }

    /// One entry of the error panel: `"{kind}<br>Type: {type}[ {id}]<br>{message}"`
    pub fn panel_entry(&self) -> String {
        format!(
            "{}<br>Type: {}{}<br>{}",
            self.kind,
            self.entity_type,
            self.id.as_deref().map(|id| format!(" {}", id)).unwrap_or_default(),
            self.message
        )
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.kind, self.entity_type)?;
        if let Some(ref id) = self.id {
            write!(f, " {}", id)?;
        }
        write!(f, "): {}", self.message)
    }
}

impl std::error::Error for SyncError {}

/// Render the full error panel for a list of failures
pub fn format_error_panel(errors: &[SyncError]) -> String {
    errors
        .iter()
        .map(SyncError::panel_entry)
        .collect::<Vec<_>>()
        .join("<br><br>")
}

/// Errors accumulated during one sync pass
#[derive(Debug, Default)]
pub struct ErrorLog {
    errors: Vec<SyncError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and keep going
    pub fn push(&mut self, error: SyncError) {
        warn!("{}", error);
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn into_vec(self) -> Vec<SyncError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_entry_with_id() {
        let err = SyncError::for_entity(
            SyncErrorKind::SendError,
            EntityType::Program,
            "1",
            "500 (Internal Server Error)",
        );
        assert_eq!(
            err.panel_entry(),
            "SendError<br>Type: Program 1<br>500 (Internal Server Error)"
        );
    }

    #[test]
    fn test_panel_entry_without_id() {
        let err = SyncError::new(SyncErrorKind::ReceiveError, "Sync", "No data found");
        assert_eq!(err.panel_entry(), "ReceiveError<br>Type: Sync<br>No data found");
    }

    #[test]
    fn test_display() {
        let err = SyncError::for_entity(
            SyncErrorKind::DeleteError,
            EntityType::Series,
            "2",
            "404 (Not Found)",
        );
        assert_eq!(err.to_string(), "DeleteError (Series 2): 404 (Not Found)");
    }

    #[test]
    fn test_error_panel_lists_every_failure() {
        let errors = vec![
            SyncError::new(SyncErrorKind::ChecksumMismatch, "Sync", "a"),
            SyncError::new(SyncErrorKind::SaveError, "Device", "b"),
        ];
        let panel = format_error_panel(&errors);
        assert!(panel.contains("ChecksumMismatch<br>Type: Sync<br>a"));
        assert!(panel.contains("SaveError<br>Type: Device<br>b"));
    }

    #[test]
    fn test_error_log() {
        let mut log = ErrorLog::new();
        assert!(log.is_empty());
        log.push(SyncError::new(SyncErrorKind::SendError, "Sync", "x"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.into_vec()[0].message, "x");
    }
}
