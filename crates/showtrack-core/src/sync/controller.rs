//! Sync controller
//!
//! Sequences export and import passes for the user interface. A pass moves
//! through `Idle → Confirming → Running → Idle`; while it is in progress
//! any new request is rejected with an "already running" report instead of
//! being queued. The busy flag is released by a guard, so every exit path
//! returns the controller to `Idle`.

use std::cell::Cell;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::device::{self, Device, RegistryError};
use super::error::{SyncError, SyncErrorKind};
use super::export::export_changes;
use super::import::{import_data, ImportMode};
use super::report::{Operation, Outcome, SyncReport};
use super::state::SyncSummary;
use super::transport::SyncTransport;
use super::ui::SyncUi;
use crate::storage::StorageResult;
use crate::store::LocalStore;

/// Where the controller is in a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Ready for a new request
    Idle,
    /// Waiting for the user to confirm
    Confirming,
    /// Requests are in flight
    Running,
}

/// Clears the busy flag when a pass ends, however it ends
struct BusyGuard<'a> {
    phase: &'a Cell<SyncPhase>,
}

impl<'a> BusyGuard<'a> {
    fn running(&self) {
        self.phase.set(SyncPhase::Running);
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.phase.set(SyncPhase::Idle);
    }
}

/// Coordinates passes against one store, transport and UI
pub struct SyncController<S, T, U> {
    store: Mutex<S>,
    transport: T,
    ui: U,
    phase: Cell<SyncPhase>,
}

impl<S, T, U> SyncController<S, T, U>
where
    S: LocalStore,
    T: SyncTransport,
    U: SyncUi,
{
    pub fn new(store: S, transport: T, ui: U) -> Self {
        Self {
            store: Mutex::new(store),
            transport,
            ui,
            phase: Cell::new(SyncPhase::Idle),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase.get()
    }

    pub fn is_busy(&self) -> bool {
        self.phase() != SyncPhase::Idle
    }

    /// Exclusive access to the store, waiting for a running pass to finish
    pub async fn store(&self) -> MutexGuard<'_, S> {
        self.store.lock().await
    }

    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    /// Push pending local changes, after confirmation
    pub async fn export(&self) -> SyncReport {
        let operation = Operation::Export;
        let Some(guard) = self.begin() else {
            return self.reject(operation, Outcome::AlreadyRunning);
        };

        let mut store = self.store.lock().await;
        let device = match self.registered_device(&*store, operation) {
            Ok(device) => device,
            Err(report) => return report,
        };

        if !self.ui.confirm("Are you sure you want to export?") {
            return self.finish(SyncReport::new(operation, Outcome::Aborted));
        }

        guard.running();
        self.ui.show_status("Exporting changes...");
        let report = export_changes(&mut *store, &self.transport, &device, &self.ui).await;
        self.finish(report)
    }

    /// Pull server changes, after confirmation
    ///
    /// A fast import is only possible once a full import has completed;
    /// until then the request runs as a full import.
    pub async fn import(&self, fast: bool) -> SyncReport {
        let Some(guard) = self.begin() else {
            let mode = if fast { ImportMode::Fast } else { ImportMode::Full };
            return self.reject(Operation::Import(mode), Outcome::AlreadyRunning);
        };

        let mut store = self.store.lock().await;
        let requested = if fast { ImportMode::Fast } else { ImportMode::Full };
        let mut device = match self.registered_device(&*store, Operation::Import(requested)) {
            Ok(device) => device,
            Err(report) => return report,
        };

        let mode = ImportMode::resolve(fast, &device);
        if fast && mode == ImportMode::Full {
            self.ui
                .show_status("Fast import is unavailable until a full import has completed");
        }

        // An unreadable ledger may still hold changes
        let local_changes = match store.pending_count() {
            Ok(count) => count > 0,
            Err(e) => {
                warn!("Could not count local changes: {}", e);
                true
            }
        };
        if !self.ui.confirm(&import_prompt(mode, local_changes)) {
            return self.finish(SyncReport::new(Operation::Import(mode), Outcome::Aborted));
        }

        guard.running();
        self.ui.show_status("Importing data...");
        let report = import_data(&mut *store, &self.transport, &mut device, mode, &self.ui).await;
        self.finish(report)
    }

    /// Export, then import if the export succeeded
    ///
    /// One confirmation covers both passes. Returns the report of each pass
    /// that ran, or a single rejection report.
    pub async fn sync(&self, fast: bool) -> Vec<SyncReport> {
        let Some(guard) = self.begin() else {
            return vec![self.reject(Operation::Sync, Outcome::AlreadyRunning)];
        };

        let mut store = self.store.lock().await;
        let mut device = match self.registered_device(&*store, Operation::Sync) {
            Ok(device) => device,
            Err(report) => return vec![report],
        };

        let mode = ImportMode::resolve(fast, &device);
        if !self
            .ui
            .confirm("Are you sure you want to sync? Local changes will be exported, then server changes imported.")
        {
            return vec![self.finish(SyncReport::new(Operation::Sync, Outcome::Aborted))];
        }

        guard.running();
        self.ui.show_status("Exporting changes...");
        let export = self.finish(export_changes(&mut *store, &self.transport, &device, &self.ui).await);
        if !export.is_success() {
            return vec![export];
        }

        self.ui.show_status("Importing data...");
        let import = self.finish(
            import_data(&mut *store, &self.transport, &mut device, mode, &self.ui).await,
        );
        vec![export, import]
    }

    /// Register this device under `name`
    pub async fn register(&self, name: &str) -> Result<Device, RegistryError> {
        let mut store = self.store.lock().await;
        match device::register(&mut *store, &self.transport, name).await {
            Ok(device) => {
                self.ui
                    .show_status(&format!("Device registered as '{}'", device.name));
                Ok(device)
            }
            Err(e) => {
                self.ui.show_errors(&[e.to_sync_error()]);
                Err(e)
            }
        }
    }

    /// Unregister this device
    pub async fn unregister(&self) -> Result<(), RegistryError> {
        let mut store = self.store.lock().await;
        match device::unregister(&mut *store, &self.transport).await {
            Ok(()) => {
                self.ui.show_status("Device unregistered");
                Ok(())
            }
            Err(e) => {
                self.ui.show_errors(&[e.to_sync_error()]);
                Err(e)
            }
        }
    }

    /// Device, last sync time and pending count
    pub async fn summary(&self) -> StorageResult<SyncSummary> {
        let store = self.store.lock().await;
        SyncSummary::load(&*store)
    }

    fn begin(&self) -> Option<BusyGuard<'_>> {
        if self.is_busy() {
            return None;
        }
        self.phase.set(SyncPhase::Confirming);
        Some(BusyGuard { phase: &self.phase })
    }

    fn reject(&self, operation: Operation, outcome: Outcome) -> SyncReport {
        let report = SyncReport::new(operation, outcome);
        warn!("{} rejected: {}", operation, report.status_message());
        self.ui.show_status(&report.status_message());
        report
    }

    /// The registered device, or the report rejecting the pass
    fn registered_device(&self, store: &S, operation: Operation) -> Result<Device, SyncReport> {
        match Device::load(store) {
            Ok(device) if device.is_registered() => Ok(device),
            Ok(_) => Err(self.reject(operation, Outcome::NotRegistered)),
            Err(e) => {
                let mut report = SyncReport::new(operation, Outcome::Failed);
                report.errors.push(SyncError::new(
                    SyncErrorKind::ReceiveError,
                    "Device",
                    format!("Failed to load device: {}", e),
                ));
                Err(self.finish(report))
            }
        }
    }

    fn finish(&self, report: SyncReport) -> SyncReport {
        if !report.errors.is_empty() {
            self.ui.show_errors(&report.errors);
        }
        self.ui.show_status(&report.status_message());
        info!("{}: {}", report.operation, report.status_message());
        report
    }
}

/// Confirmation prompt for an import
pub fn import_prompt(mode: ImportMode, local_changes: bool) -> String {
    let mut prompt = String::from("Are you sure you want to import?");
    if mode == ImportMode::Full {
        prompt.push_str(" All local data will be replaced.");
    }
    if local_changes {
        prompt.push_str(
            " Warning: Local changes have been made. Export them first or they will be overwritten.",
        );
    }
    prompt
}
