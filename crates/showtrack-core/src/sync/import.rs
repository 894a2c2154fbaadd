//! Import engine
//!
//! Pulls documents from the server and applies them to the local store.
//!
//! ## Modes
//!
//! - **Full**: wipes every local entity, then applies the server's whole
//!   collection. On success the device is marked as having completed a
//!   full import and the local ledger is cleared.
//! - **Fast**: applies only the documents still pending for this device.
//!   Only available once a full import has completed.
//!
//! Whichever mode, a document listing this device in its `pending` array is
//! acknowledged with `DELETE /documents/{id}/pending` after it's applied.

use std::fmt;

use chrono::Utc;
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::checksum;
use super::device::Device;
use super::document::{FullPayload, ImportDocument};
use super::error::{ErrorLog, SyncError, SyncErrorKind};
use super::report::{Operation, Outcome, SyncReport};
use super::state::record_sync_time;
use super::transport::{ApiRequest, SyncTransport};
use super::ui::SyncUi;
use crate::models::EntityType;
use crate::store::LocalStore;

/// Which documents an import pulls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    Full,
    Fast,
}

impl ImportMode {
    /// The mode actually used for a request
    ///
    /// Fast import is only offered once the device has completed a full
    /// import; before that, every import is full.
    pub fn resolve(fast_requested: bool, device: &Device) -> Self {
        if fast_requested && device.imported_full_set {
            ImportMode::Fast
        } else {
            ImportMode::Full
        }
    }

    /// The request fetching this mode's documents
    pub fn request(&self, device_id: &str) -> ApiRequest {
        let device_id = device_id.to_string();
        match self {
            ImportMode::Full => ApiRequest::AllDocuments { device_id },
            ImportMode::Fast => ApiRequest::PendingDocuments { device_id },
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Full => f.write_str("full"),
            ImportMode::Fast => f.write_str("fast"),
        }
    }
}

/// Pull server documents and apply them locally
///
/// On a successful full import `device` is marked as fully imported and
/// persisted. Like the export, this never fails as a whole; the returned
/// report carries every error.
pub async fn import_data<S, T, U>(
    store: &mut S,
    transport: &T,
    device: &mut Device,
    mode: ImportMode,
    ui: &U,
) -> SyncReport
where
    S: LocalStore + ?Sized,
    T: SyncTransport + ?Sized,
    U: SyncUi + ?Sized,
{
    let mode = if mode == ImportMode::Fast && !device.imported_full_set {
        warn!("Fast import requested before a full import; importing everything");
        ImportMode::Full
    } else {
        mode
    };

    let mut report = SyncReport::new(Operation::Import(mode), Outcome::Failed);
    if !device.is_registered() {
        report.outcome = Outcome::NotRegistered;
        return report;
    }

    info!("Starting {} import", mode);
    let mut errors = ErrorLog::new();

    if mode == ImportMode::Full {
        // Each type is wiped independently; a failure is recorded and the
        // import carries on.
        for entity_type in EntityType::ALL {
            if let Err(e) = store.remove_all(entity_type) {
                errors.push(SyncError::new(
                    SyncErrorKind::DeleteError,
                    entity_type,
                    format!("Failed to clear local data: {}", e),
                ));
            }
        }
    }

    let documents = match fetch(transport, device, mode).await {
        Ok(documents) => documents,
        Err(error) => {
            errors.push(error);
            return finish(report, errors, &*store);
        }
    };

    report.total = documents.len();
    if documents.is_empty() {
        if mode == ImportMode::Full {
            errors.push(SyncError::new(SyncErrorKind::ReceiveError, "Sync", "No data found"));
            return finish(report, errors, &*store);
        }
        debug!("No pending documents");
    }

    let mut acknowledgements = Vec::new();
    for value in documents {
        let applied = apply(store, value, mode, &mut errors);
        match applied.filter(|doc| doc.is_pending_for(&device.id)) {
            // Counted once the server confirms
            Some(doc) => acknowledgements.push(ApiRequest::ClearPending {
                device_id: device.id.clone(),
                id: doc.entity.id().to_string(),
            }),
            None => {
                report.processed += 1;
                ui.show_progress(report.processed, report.total);
            }
        }
    }

    let mut in_flight: FuturesUnordered<_> = acknowledgements
        .into_iter()
        .map(move |request| async move {
            let result = transport.send(&request).await;
            (request, result)
        })
        .collect();

    while let Some((request, result)) = in_flight.next().await {
        report.processed += 1;
        let failure = match result {
            Ok(response) if response.is_success() => None,
            Ok(response) => Some(response.status_line()),
            Err(e) => Some(e.to_string()),
        };
        if let (Some(message), ApiRequest::ClearPending { id, .. }) = (failure, &request) {
            errors.push(SyncError {
                id: Some(id.clone()),
                ..SyncError::new(
                    SyncErrorKind::DeleteError,
                    "Document",
                    format!("Failed to clear pending flag: {}", message),
                )
            });
        }
        ui.show_progress(report.processed, report.total);
    }

    if errors.is_empty() && mode == ImportMode::Full {
        if !device.imported_full_set {
            device.imported_full_set = true;
            if let Err(e) = device.save(store) {
                device.imported_full_set = false;
                errors.push(SyncError::new(
                    SyncErrorKind::SaveError,
                    "Device",
                    format!("Failed to mark device as imported: {}", e),
                ));
            }
        }
        if errors.is_empty() {
            if let Err(e) = store.clear_all_changes() {
                errors.push(SyncError::new(
                    SyncErrorKind::DeleteError,
                    "Sync",
                    format!("Failed to clear local changes: {}", e),
                ));
            }
        }
    }

    if errors.is_empty() {
        if let Err(e) = record_sync_time(store, Utc::now()) {
            errors.push(SyncError::new(
                SyncErrorKind::SaveError,
                "Sync",
                format!("Failed to record sync time: {}", e),
            ));
        }
    }

    finish(report, errors, &*store)
}

/// Fetch and verify the documents for `mode`
async fn fetch<T: SyncTransport + ?Sized>(
    transport: &T,
    device: &Device,
    mode: ImportMode,
) -> Result<Vec<Value>, SyncError> {
    let receive_error = |message: String| SyncError::new(SyncErrorKind::ReceiveError, "Sync", message);

    let response = transport
        .send(&mode.request(&device.id))
        .await
        .map_err(|e| receive_error(e.to_string()))?;
    if !response.is_success() {
        return Err(receive_error(response.status_line()));
    }

    let (documents, expected) = match mode {
        ImportMode::Full => {
            let payload: FullPayload = serde_json::from_str(&response.body)
                .map_err(|e| receive_error(format!("Invalid response: {}", e)))?;
            (payload.data, Some(payload.checksum))
        }
        ImportMode::Fast => {
            let documents: Vec<Value> = serde_json::from_str(&response.body)
                .map_err(|e| receive_error(format!("Invalid response: {}", e)))?;
            (documents, response.etag.clone())
        }
    };

    let actual = checksum::checksum(&documents).map_err(|e| receive_error(e.to_string()))?;
    match expected {
        Some(expected) if checksum::strip_etag(&expected) == actual => Ok(documents),
        Some(expected) => Err(SyncError::new(
            SyncErrorKind::ChecksumMismatch,
            "Sync",
            format!(
                "Expected checksum {} but received data has checksum {}",
                checksum::strip_etag(&expected),
                actual
            ),
        )),
        None => Err(SyncError::new(
            SyncErrorKind::ChecksumMismatch,
            "Sync",
            "Response carried no checksum",
        )),
    }
}

/// Apply one document to the store
///
/// Returns the parsed document when it was applied, so the caller can
/// acknowledge it.
fn apply<S: LocalStore + ?Sized>(
    store: &mut S,
    value: Value,
    mode: ImportMode,
    errors: &mut ErrorLog,
) -> Option<ImportDocument> {
    let label = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("Document")
        .to_string();
    let raw_id = value.get("id").and_then(Value::as_str).map(str::to_string);

    let doc: ImportDocument = match serde_json::from_value(value) {
        Ok(doc) => doc,
        Err(e) => {
            errors.push(SyncError {
                id: raw_id,
                ..SyncError::new(SyncErrorKind::SaveError, label, format!("Invalid document: {}", e))
            });
            return None;
        }
    };

    let entity_type = doc.entity.entity_type();
    let id = doc.entity.id().to_string();

    let applied = if doc.is_deleted {
        store
            .remove(entity_type, &id)
            .map_err(|e| SyncError::for_entity(SyncErrorKind::DeleteError, entity_type, &id, e.to_string()))
    } else {
        store
            .save(&doc.entity)
            .map_err(|e| SyncError::for_entity(SyncErrorKind::SaveError, entity_type, &id, e.to_string()))
    };
    if let Err(error) = applied {
        errors.push(error);
        return None;
    }

    debug!(
        "Imported {} {}{}",
        entity_type,
        id,
        if doc.is_deleted { " (deleted)" } else { "" }
    );

    // The server's copy now supersedes any local edit of this entity
    if mode == ImportMode::Fast {
        if let Err(e) = store.clear_change(entity_type, &id) {
            errors.push(SyncError::for_entity(
                SyncErrorKind::DeleteError,
                entity_type,
                &id,
                format!("Failed to clear local change: {}", e),
            ));
        }
    }

    Some(doc)
}

fn finish<S: LocalStore + ?Sized>(mut report: SyncReport, errors: ErrorLog, store: &S) -> SyncReport {
    report.outcome = if errors.is_empty() {
        Outcome::Succeeded
    } else {
        Outcome::Failed
    };
    report.errors = errors.into_vec();
    report.pending = store.pending_count().ok();

    info!(
        "{} finished: {}/{} settled, {} error(s)",
        report.operation,
        report.processed,
        report.total,
        report.errors.len()
    );
    report
}
