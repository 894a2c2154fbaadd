//! Sync passes against a store whose chosen operations fail

use serde_json::json;

use showtrack_core::models::{Entity, EntityType, Program};
use showtrack_core::store::{EntityStore, SettingsStore, Store};
use showtrack_core::sync::{
    checksum, export_changes, import_data, last_sync_time, ApiRequest, ApiResponse, ChangeLedger,
    Device, ImportMode, MockTransport, Outcome, RecordingUi, SyncController, SyncErrorKind,
    SyncRecord,
};
use showtrack_core::{StorageError, StorageResult};

/// Delegates to a real store, failing the named operations
struct FailingStore {
    inner: Store,
    failing: Vec<&'static str>,
}

impl FailingStore {
    fn new(inner: Store, failing: &[&'static str]) -> Self {
        Self {
            inner,
            failing: failing.to_vec(),
        }
    }

    fn check(&self, operation: &str) -> StorageResult<()> {
        if self.failing.iter().any(|f| *f == operation) {
            return Err(StorageError::InvalidValue {
                column: "injected",
                value: operation.to_string(),
            });
        }
        Ok(())
    }
}

impl EntityStore for FailingStore {
    fn list(&self, entity_type: EntityType) -> StorageResult<Vec<Entity>> {
        self.check("list")?;
        self.inner.list(entity_type)
    }

    fn find(&self, entity_type: EntityType, id: &str) -> StorageResult<Option<Entity>> {
        self.check("find")?;
        self.inner.find(entity_type, id)
    }

    fn save(&mut self, entity: &Entity) -> StorageResult<()> {
        self.check("save")?;
        self.inner.save(entity)
    }

    fn remove(&mut self, entity_type: EntityType, id: &str) -> StorageResult<()> {
        self.check("remove")?;
        self.inner.remove(entity_type, id)
    }

    fn remove_all(&mut self, entity_type: EntityType) -> StorageResult<()> {
        self.check(&format!("remove_all {}", entity_type))?;
        self.inner.remove_all(entity_type)
    }
}

impl ChangeLedger for FailingStore {
    fn pending_changes(&self) -> StorageResult<Vec<SyncRecord>> {
        self.check("pending_changes")?;
        self.inner.pending_changes()
    }

    fn pending_count(&self) -> StorageResult<usize> {
        self.check("pending_count")?;
        self.inner.pending_count()
    }

    fn record_change(&mut self, record: &SyncRecord) -> StorageResult<()> {
        self.check("record_change")?;
        self.inner.record_change(record)
    }

    fn clear_change(&mut self, entity_type: EntityType, id: &str) -> StorageResult<()> {
        self.check("clear_change")?;
        self.inner.clear_change(entity_type, id)
    }

    fn clear_all_changes(&mut self) -> StorageResult<()> {
        self.check("clear_all_changes")?;
        self.inner.clear_all_changes()
    }
}

impl SettingsStore for FailingStore {
    fn setting(&self, name: &str) -> StorageResult<Option<String>> {
        self.check(&format!("setting {}", name))?;
        self.inner.setting(name)
    }

    fn set_setting(&mut self, name: &str, value: &str) -> StorageResult<()> {
        self.check(&format!("set_setting {}", name))?;
        self.inner.set_setting(name, value)
    }

    fn remove_setting(&mut self, name: &str) -> StorageResult<()> {
        self.check(&format!("remove_setting {}", name))?;
        self.inner.remove_setting(name)
    }
}

fn device(imported: bool) -> Device {
    Device {
        id: "dev-1".into(),
        name: "Laptop".into(),
        imported_full_set: imported,
    }
}

fn program(id: &str, name: &str) -> Entity {
    Entity::Program(Program {
        id: id.into(),
        program_name: name.into(),
    })
}

/// A registered store with one unexported local change
fn failing_store(imported: bool, failing: &[&'static str]) -> FailingStore {
    let mut store = Store::open_in_memory().unwrap();
    device(imported).save(&mut store).unwrap();
    store.save_tracked(&program("local", "Local")).unwrap();
    FailingStore::new(store, failing)
}

fn full_server() -> MockTransport {
    let data = json!([{ "type": "Program", "id": "9", "programName": "From server" }]);
    let sum = checksum::checksum(&data).unwrap();
    let body = json!({ "checksum": sum, "data": data }).to_string();
    MockTransport::new(move |request| match request {
        ApiRequest::AllDocuments { .. } => Ok(ApiResponse::ok().body(body.clone())),
        _ => Ok(ApiResponse::ok()),
    })
}

#[tokio::test]
async fn wipe_failure_is_recorded_and_import_still_fetches() {
    let mut store = failing_store(false, &["remove_all Series"]);
    let mut device = device(false);
    let transport = full_server();
    let ui = RecordingUi::accepting();

    let report = import_data(&mut store, &transport, &mut device, ImportMode::Full, &ui).await;

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, SyncErrorKind::DeleteError);
    assert_eq!(report.errors[0].entity_type, "Series");

    assert_eq!(transport.request_count(), 1);
    assert!(matches!(transport.requests()[0], ApiRequest::AllDocuments { .. }));
    assert!(store.inner.find(EntityType::Program, "9").unwrap().is_some());
    assert!(store.inner.find(EntityType::Program, "local").unwrap().is_none());

    // Not a clean full import: no flag, ledger kept, no sync time
    assert!(!device.imported_full_set);
    assert!(!Device::load(&store.inner).unwrap().imported_full_set);
    assert_eq!(store.inner.pending_count().unwrap(), 1);
    assert!(last_sync_time(&store.inner).unwrap().is_none());
}

#[tokio::test]
async fn ledger_clear_failure_fails_import_but_keeps_flag() {
    let mut store = failing_store(false, &["clear_all_changes"]);
    let mut device = device(false);
    let transport = full_server();
    let ui = RecordingUi::accepting();

    let report = import_data(&mut store, &transport, &mut device, ImportMode::Full, &ui).await;

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, SyncErrorKind::DeleteError);
    assert_eq!(report.errors[0].entity_type, "Sync");

    // The full data set was applied, so the device stays marked
    assert!(device.imported_full_set);
    assert!(Device::load(&store.inner).unwrap().imported_full_set);
    assert_eq!(store.inner.pending_count().unwrap(), 1);
    assert!(last_sync_time(&store.inner).unwrap().is_none());
}

#[tokio::test]
async fn device_save_failure_reverts_flag() {
    let mut store = failing_store(false, &["set_setting Device"]);
    let mut device = device(false);
    let transport = full_server();
    let ui = RecordingUi::accepting();

    let report = import_data(&mut store, &transport, &mut device, ImportMode::Full, &ui).await;

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, SyncErrorKind::SaveError);
    assert_eq!(report.errors[0].entity_type, "Device");

    assert!(!device.imported_full_set);
    assert!(!Device::load(&store.inner).unwrap().imported_full_set);
    assert_eq!(store.inner.pending_count().unwrap(), 1);
    assert!(last_sync_time(&store.inner).unwrap().is_none());
}

#[tokio::test]
async fn export_keeps_row_when_clearing_it_fails() {
    let mut store = failing_store(true, &["clear_change"]);
    let transport = MockTransport::ok();
    let ui = RecordingUi::accepting();

    let report = export_changes(&mut store, &transport, &device(true), &ui).await;

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, SyncErrorKind::DeleteError);
    assert_eq!(report.errors[0].id.as_deref(), Some("local"));
    assert_eq!(transport.request_count(), 1);
    assert_eq!(report.pending, Some(1));
    assert!(last_sync_time(&store.inner).unwrap().is_none());
}

#[tokio::test]
async fn unreadable_ledger_still_warns_before_import() {
    let store = failing_store(true, &["pending_count"]);
    let controller = SyncController::new(store, MockTransport::ok(), RecordingUi::declining());

    let report = controller.import(false).await;

    assert_eq!(report.outcome, Outcome::Aborted);
    assert!(controller.ui().prompts()[0].contains("Warning: Local changes have been made."));
    assert_eq!(controller.transport().request_count(), 0);
}
