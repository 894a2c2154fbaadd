//! Export engine
//!
//! Pushes every pending ledger record to the server. Requests for one pass
//! are issued together and drained as they settle; each confirmed record is
//! removed from the ledger, each failure is recorded and its row kept for
//! the next export.

use chrono::Utc;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info};

use super::checksum;
use super::device::Device;
use super::error::{ErrorLog, SyncError, SyncErrorKind};
use super::ledger::{SyncAction, SyncRecord};
use super::report::{Operation, Outcome, SyncReport};
use super::state::record_sync_time;
use super::transport::{ApiRequest, SyncTransport};
use super::ui::SyncUi;
use crate::store::LocalStore;

/// Push the local change ledger to the server
///
/// Never fails as a whole: problems are collected in the returned report.
/// With an empty ledger no request is made and the export succeeds
/// immediately.
pub async fn export_changes<S, T, U>(
    store: &mut S,
    transport: &T,
    device: &Device,
    ui: &U,
) -> SyncReport
where
    S: LocalStore + ?Sized,
    T: SyncTransport + ?Sized,
    U: SyncUi + ?Sized,
{
    let mut report = SyncReport::new(Operation::Export, Outcome::Failed);
    if !device.is_registered() {
        report.outcome = Outcome::NotRegistered;
        return report;
    }

    let mut errors = ErrorLog::new();
    let records = match store.pending_changes() {
        Ok(records) => records,
        Err(e) => {
            errors.push(SyncError::new(
                SyncErrorKind::SendError,
                "Sync",
                format!("Failed to read local changes: {}", e),
            ));
            report.errors = errors.into_vec();
            return report;
        }
    };

    report.total = records.len();
    info!("Exporting {} change(s)", report.total);

    // Build every request up front so the in-flight futures borrow only
    // the transport, leaving the store free for completion handling.
    let mut requests = Vec::with_capacity(records.len());
    for record in records {
        match build_request(&*store, device, &record) {
            Ok(request) => requests.push((record, request)),
            Err(error) => {
                errors.push(error);
                report.processed += 1;
                ui.show_progress(report.processed, report.total);
            }
        }
    }

    let mut in_flight: FuturesUnordered<_> = requests
        .into_iter()
        .map(move |(record, request)| async move {
            let result = transport.send(&request).await;
            (record, request, result)
        })
        .collect();

    while let Some((record, request, result)) = in_flight.next().await {
        report.processed += 1;
        let kind = failure_kind(record.action);

        match result {
            Ok(response) if response.is_success() => {
                if let (ApiRequest::PushDocument { document, .. }, Some(etag)) =
                    (&request, response.etag.as_deref())
                {
                    if !checksum::verify(document, etag) {
                        errors.push(SyncError::for_entity(
                            SyncErrorKind::ChecksumMismatch,
                            record.entity_type,
                            &record.id,
                            format!("Server acknowledged with checksum {}", checksum::strip_etag(etag)),
                        ));
                        ui.show_progress(report.processed, report.total);
                        continue;
                    }
                }

                debug!("Exported {} {} ({})", record.entity_type, record.id, record.action);
                if let Err(e) = store.clear_change(record.entity_type, &record.id) {
                    errors.push(SyncError::for_entity(
                        SyncErrorKind::DeleteError,
                        record.entity_type,
                        &record.id,
                        format!("Failed to clear local change: {}", e),
                    ));
                }
            }
            Ok(response) => errors.push(SyncError::for_entity(
                kind,
                record.entity_type,
                &record.id,
                response.status_line(),
            )),
            Err(e) => errors.push(SyncError::for_entity(
                kind,
                record.entity_type,
                &record.id,
                e.to_string(),
            )),
        }

        ui.show_progress(report.processed, report.total);
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

    report.pending = store.pending_count().ok();
    report.outcome = if errors.is_empty() {
        Outcome::Succeeded
    } else {
        Outcome::Failed
    };
    report.errors = errors.into_vec();

    info!(
        "Export finished: {}/{} settled, {} error(s)",
        report.processed,
        report.total,
        report.errors.len()
    );
    report
}

fn build_request<S: LocalStore + ?Sized>(
    store: &S,
    device: &Device,
    record: &SyncRecord,
) -> Result<ApiRequest, SyncError> {
    let device_id = device.id.clone();
    match record.action {
        SyncAction::Deleted => Ok(ApiRequest::DeleteDocument {
            device_id,
            id: record.id.clone(),
        }),
        SyncAction::Modified => {
            let fail = |message: String| {
                SyncError::for_entity(SyncErrorKind::SendError, record.entity_type, &record.id, message)
            };
            let entity = store
                .find(record.entity_type, &record.id)
                .map_err(|e| fail(e.to_string()))?
                .ok_or_else(|| fail("not found".to_string()))?;
            let document = serde_json::to_value(&entity).map_err(|e| fail(e.to_string()))?;
            Ok(ApiRequest::PushDocument { device_id, document })
        }
    }
}

fn failure_kind(action: SyncAction) -> SyncErrorKind {
    match action {
        SyncAction::Modified => SyncErrorKind::SendError,
        SyncAction::Deleted => SyncErrorKind::DeleteError,
    }
}
