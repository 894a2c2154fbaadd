//! showtrack Core Library
//!
//! This crate provides the core functionality for showtrack, an offline
//! tracker for TV programs, series and episodes that periodically
//! reconciles with a sync server shared by several devices.
//!
//! # Architecture
//!
//! - **SQLite**: the local store is the source of truth on each device
//! - **Change ledger**: every local edit is recorded until it is exported
//! - **Sync server**: documents flow out through export and back in
//!   through full or fast import, checked by SHA-256 checksums
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = Store::open(&config)?;
//!
//! // Track a program
//! store.save_tracked(&Program::new("Doctor Who").into())?;
//!
//! // Push it to the server
//! let controller = SyncController::new(store, HttpTransport::from_config(&config)?, ui);
//! let report = controller.export().await;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: Programs, series and episodes
//! - `storage`: SQLite schema and storage errors
//! - `sync`: Change ledger, device registry, export/import engines
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::Config;
pub use models::{Entity, EntityType, Episode, EpisodeStatus, Program, Series};
pub use storage::{StorageError, StorageResult};
pub use store::{EntityStore, LocalStore, SettingsStore, Store};
pub use sync::{
    Device, HttpTransport, ImportMode, SyncController, SyncError, SyncErrorKind, SyncReport,
    SyncSummary, SyncUi,
};
