//! End-to-end sync flows against an in-memory store and a scripted server

use serde_json::{json, Value};

use showtrack_core::models::{Entity, EntityType, Program, Series};
use showtrack_core::store::{EntityStore, SettingsStore, Store};
use showtrack_core::sync::{
    checksum, last_sync_time, ApiRequest, ApiResponse, ChangeLedger, Device, ImportMode,
    MockTransport, Operation, Outcome, RecordingUi, SyncController, SyncErrorKind, SyncRecord,
    TransportError,
};

fn registered_store(imported: bool) -> Store {
    let mut store = Store::open_in_memory().unwrap();
    Device {
        id: "dev-1".into(),
        name: "Laptop".into(),
        imported_full_set: imported,
    }
    .save(&mut store)
    .unwrap();
    store
}

fn program(id: &str, name: &str) -> Entity {
    Entity::Program(Program {
        id: id.into(),
        program_name: name.into(),
    })
}

fn fast_response(data: &Value) -> ApiResponse {
    let sum = checksum::checksum(data).unwrap();
    ApiResponse::ok()
        .etag(format!("W/\"{}\"", sum))
        .body(data.to_string())
}

fn full_response(data: &Value) -> ApiResponse {
    let sum = checksum::checksum(data).unwrap();
    ApiResponse::ok().body(json!({ "checksum": sum, "data": data }).to_string())
}

#[tokio::test]
async fn export_with_empty_ledger_makes_no_calls() {
    let controller = SyncController::new(
        registered_store(true),
        MockTransport::ok(),
        RecordingUi::accepting(),
    );

    let report = controller.export().await;

    assert!(report.is_success());
    assert_eq!(controller.transport().request_count(), 0);
    assert!(last_sync_time(&*controller.store().await).unwrap().is_some());
}

#[tokio::test]
async fn export_scenario_clears_ledger() {
    let mut store = registered_store(true);
    store.save(&program("1", "Doctor Who")).unwrap();
    store
        .record_change(&SyncRecord::modified(EntityType::Program, "1"))
        .unwrap();
    store
        .record_change(&SyncRecord::deleted(EntityType::Series, "2"))
        .unwrap();
    let controller = SyncController::new(store, MockTransport::ok(), RecordingUi::accepting());

    let report = controller.export().await;

    assert!(report.is_success());
    assert!(report.errors.is_empty());
    assert_eq!(report.pending, Some(0));
    assert_eq!(
        controller.ui().last_status().as_deref(),
        Some("Database has been successfully exported.")
    );

    let store = controller.into_store();
    assert_eq!(store.pending_count().unwrap(), 0);
    assert!(last_sync_time(&store).unwrap().is_some());
}

#[tokio::test]
async fn export_conserves_failed_records() {
    let mut store = registered_store(true);
    let ids: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    for id in &ids {
        store.save_tracked(&program(id, "P")).unwrap();
    }
    // Ids 0..=3 succeed, the rest fail one way or another
    let transport = MockTransport::new(|request| match request {
        ApiRequest::PushDocument { document, .. } => {
            let id: u32 = document["id"].as_str().unwrap().parse().unwrap();
            match id {
                0..=3 => Ok(ApiResponse::ok()),
                4..=6 => Ok(ApiResponse::with_status(502)),
                _ => Err(TransportError::Request("timed out".into())),
            }
        }
        _ => Ok(ApiResponse::ok()),
    });
    let controller = SyncController::new(store, transport, RecordingUi::accepting());

    let report = controller.export().await;

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.processed, 10);
    assert_eq!(report.errors.len(), 6);
    assert_eq!(report.pending, Some(6));
    assert_eq!(controller.ui().progress().last(), Some(&(10, 10)));
    assert_eq!(controller.ui().notifications().len(), 1);
    assert_eq!(controller.store().await.pending_count().unwrap(), 6);
}

#[tokio::test]
async fn fast_import_of_nothing_succeeds() {
    let data = json!([]);
    let transport = MockTransport::new(move |_| Ok(fast_response(&data)));
    let controller = SyncController::new(registered_store(true), transport, RecordingUi::accepting());

    let report = controller.import(true).await;

    assert_eq!(report.operation, Operation::Import(ImportMode::Fast));
    assert!(report.is_success());
    assert!(report
        .errors
        .iter()
        .all(|e| e.kind != SyncErrorKind::ReceiveError));
    assert!(Device::load(&*controller.store().await).unwrap().imported_full_set);
}

#[tokio::test]
async fn full_import_checksum_mismatch_changes_nothing_else() {
    let mut store = registered_store(false);
    store.save_tracked(&program("1", "Local")).unwrap();
    let transport = MockTransport::new(|_| {
        Ok(ApiResponse::ok().body(r#"{"checksum":"abc","data":[{"type":"Program","id":"9"}]}"#))
    });
    let controller = SyncController::new(store, transport, RecordingUi::accepting());

    let report = controller.import(false).await;

    assert_eq!(report.outcome, Outcome::Failed);
    let mismatches = report
        .errors
        .iter()
        .filter(|e| e.kind == SyncErrorKind::ChecksumMismatch)
        .count();
    assert_eq!(mismatches, 1);
    assert_eq!(report.errors.len(), 1);

    let store = controller.into_store();
    assert!(!Device::load(&store).unwrap().imported_full_set);
    assert_eq!(
        store.pending_changes().unwrap(),
        vec![SyncRecord::modified(EntityType::Program, "1")]
    );
    assert!(last_sync_time(&store).unwrap().is_none());
}

#[tokio::test]
async fn full_then_fast_import() {
    let full = json!([
        { "type": "Program", "id": "1", "programName": "Doctor Who", "pending": ["dev-1"] },
        { "type": "Series", "id": "2", "seriesName": "Series 1", "programId": "1" }
    ]);
    let fast = json!([
        { "type": "Series", "id": "2", "isDeleted": true, "pending": ["dev-1", "dev-2"] },
        { "type": "Series", "id": "3", "seriesName": "Series 2", "programId": "1", "pending": ["dev-1"] }
    ]);
    let transport = MockTransport::new(move |request| match request {
        ApiRequest::AllDocuments { .. } => Ok(full_response(&full)),
        ApiRequest::PendingDocuments { .. } => Ok(fast_response(&fast)),
        _ => Ok(ApiResponse::with_status(204)),
    });
    let controller = SyncController::new(registered_store(false), transport, RecordingUi::accepting());

    // Fast is not available yet
    let first = controller.import(true).await;
    assert_eq!(first.operation, Operation::Import(ImportMode::Full));
    assert!(first.is_success(), "{:?}", first.errors);

    let second = controller.import(true).await;
    assert_eq!(second.operation, Operation::Import(ImportMode::Fast));
    assert!(second.is_success(), "{:?}", second.errors);

    let store = controller.store().await;
    assert!(store.find(EntityType::Program, "1").unwrap().is_some());
    assert!(store.find(EntityType::Series, "2").unwrap().is_none());
    let series: Vec<Series> = store.series_for_program("1").unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].series_name, "Series 2");
    drop(store);

    let acknowledged: Vec<String> = controller
        .transport()
        .requests()
        .into_iter()
        .filter_map(|r| match r {
            ApiRequest::ClearPending { id, .. } => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(acknowledged.len(), 3);
    assert!(acknowledged.contains(&"1".to_string()));
    assert!(acknowledged.contains(&"2".to_string()));
    assert!(acknowledged.contains(&"3".to_string()));
}

#[tokio::test]
async fn unregistered_device_never_calls_server() {
    let mut store = Store::open_in_memory().unwrap();
    store.save_tracked(&program("1", "A")).unwrap();
    let controller = SyncController::new(store, MockTransport::ok(), RecordingUi::accepting());

    assert_eq!(controller.export().await.outcome, Outcome::NotRegistered);
    assert_eq!(controller.import(false).await.outcome, Outcome::NotRegistered);
    assert_eq!(controller.sync(false).await[0].outcome, Outcome::NotRegistered);
    assert_eq!(controller.transport().request_count(), 0);
    assert!(controller.ui().prompts().is_empty());
}

#[tokio::test]
async fn second_request_while_running_is_rejected() {
    let mut store = registered_store(true);
    store.save_tracked(&program("1", "A")).unwrap();
    let controller = SyncController::new(store, MockTransport::ok(), RecordingUi::accepting());

    let (first, second) = tokio::join!(controller.sync(true), controller.export());

    assert_eq!(first.len(), 2);
    assert_eq!(second.outcome, Outcome::AlreadyRunning);
    assert_eq!(second.status_message(), "An export is already running");
    assert!(!controller.is_busy());

    // The controller accepts new work once idle again
    assert!(controller.export().await.is_success());
}

#[tokio::test]
async fn declined_prompt_aborts_without_side_effects() {
    let mut store = registered_store(true);
    store.save_tracked(&program("1", "A")).unwrap();
    let controller = SyncController::new(store, MockTransport::ok(), RecordingUi::declining());

    let report = controller.import(false).await;

    assert_eq!(report.status_message(), "Import aborted");
    assert_eq!(controller.transport().request_count(), 0);
    let store = controller.into_store();
    assert_eq!(store.pending_count().unwrap(), 1);
    assert!(store.setting("LastSyncTime").unwrap().is_none());
}
