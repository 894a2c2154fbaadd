//! Synchronization with the showtrack server
//!
//! Reconciles the local store with a remote document server shared by
//! several devices.
//!
//! ## Protocol
//!
//! 1. Local edits append to the change ledger
//! 2. Export pushes each ledger record (`POST`/`DELETE /documents`)
//! 3. Import pulls either every document or only those still pending for
//!    this device, verifies the checksum, and applies them
//! 4. Applied documents pending for this device are acknowledged
//!    (`DELETE /documents/{id}/pending`)
//!
//! Every request carries the device id in the `X-DEVICE-ID` header.
//!
//! ## Usage
//!
//! ```ignore
//! let transport = HttpTransport::from_config(&config)?;
//! let controller = SyncController::new(store, transport, ui);
//! controller.register("Laptop").await?;
//! let report = controller.export().await;
//! ```

pub mod checksum;
mod controller;
pub mod device;
mod document;
mod error;
mod export;
mod http;
mod import;
pub mod ledger;
mod report;
mod state;
mod transport;
mod ui;

pub use controller::{import_prompt, SyncController, SyncPhase};
pub use device::{Device, RegistryError, RegistryOperation};
pub use document::{FullPayload, ImportDocument};
pub use error::{format_error_panel, ErrorLog, SyncError, SyncErrorKind};
pub use export::export_changes;
pub use http::HttpTransport;
pub use import::{import_data, ImportMode};
pub use ledger::{format_pending, ChangeLedger, SyncAction, SyncRecord};
pub use report::{Operation, Outcome, SyncReport};
pub use state::{last_sync_time, record_sync_time, SyncSummary, LAST_SYNC_TIME_SETTING};
pub use transport::{
    ApiRequest, ApiResponse, MockTransport, SyncTransport, TransportError, DEVICE_ID_HEADER,
};
pub use ui::{RecordingUi, SyncUi};
