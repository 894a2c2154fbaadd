//! Sync state persistence
//!
//! Stores the bookkeeping that survives between sessions: when this device
//! last completed a sync pass. Device identity lives in [`super::device`],
//! pending changes in the ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::device::Device;
use super::ledger::{format_pending, ChangeLedger};
use crate::storage::{StorageError, StorageResult};
use crate::store::SettingsStore;

/// Setting key holding the last successful sync time (RFC 3339)
pub const LAST_SYNC_TIME_SETTING: &str = "LastSyncTime";

/// When the last export or import completed, if ever
pub fn last_sync_time<S: SettingsStore + ?Sized>(store: &S) -> StorageResult<Option<DateTime<Utc>>> {
    let Some(value) = store.setting(LAST_SYNC_TIME_SETTING)? else {
        return Ok(None);
    };

    DateTime::parse_from_rfc3339(&value)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| StorageError::InvalidValue {
            column: "settings.LastSyncTime",
            value,
        })
}

/// Record a completed sync pass
pub fn record_sync_time<S: SettingsStore + ?Sized>(store: &mut S, at: DateTime<Utc>) -> StorageResult<()> {
    store.set_setting(LAST_SYNC_TIME_SETTING, &at.to_rfc3339())
}

/// Snapshot of the sync-related state, for status displays
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub device: Device,
    pub last_sync: Option<DateTime<Utc>>,
    pub pending: usize,
}

impl SyncSummary {
    pub fn load<S: SettingsStore + ChangeLedger + ?Sized>(store: &S) -> StorageResult<Self> {
        Ok(Self {
            device: Device::load(store)?,
            last_sync: last_sync_time(store)?,
            pending: store.pending_count()?,
        })
    }

    /// "None pending", "1 change pending", ...
    pub fn pending_text(&self) -> String {
        format_pending(self.pending)
    }
}
