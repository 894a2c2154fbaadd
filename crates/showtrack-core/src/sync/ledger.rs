//! Local change ledger
//!
//! One `SyncRecord` per entity mutated locally since its last successful
//! export. Exporting a record removes it; a full import clears the ledger
//! wholesale and a fast import clears the rows for the entities it applies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::EntityType;
use crate::storage::StorageResult;

/// What happened to an entity locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Modified,
    Deleted,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Modified => "modified",
            SyncAction::Deleted => "deleted",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modified" => Ok(SyncAction::Modified),
            "deleted" => Ok(SyncAction::Deleted),
            other => Err(format!("Unknown sync action: {}", other)),
        }
    }
}

/// A pending local mutation awaiting export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub id: String,
    pub action: SyncAction,
}

impl SyncRecord {
    pub fn new(entity_type: EntityType, id: impl Into<String>, action: SyncAction) -> Self {
        Self {
            entity_type,
            id: id.into(),
            action,
        }
    }

    pub fn modified(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self::new(entity_type, id, SyncAction::Modified)
    }

    pub fn deleted(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self::new(entity_type, id, SyncAction::Deleted)
    }
}

/// Persistent ledger of unsent local changes
///
/// There is at most one record per (type, id); recording a change for an
/// entity that already has one replaces its action.
pub trait ChangeLedger {
    /// Snapshot of every pending record
    fn pending_changes(&self) -> StorageResult<Vec<SyncRecord>>;

    /// Number of pending records
    fn pending_count(&self) -> StorageResult<usize>;

    /// Record (or replace) the pending change for an entity
    fn record_change(&mut self, record: &SyncRecord) -> StorageResult<()>;

    /// Forget the pending change for an entity, if any
    fn clear_change(&mut self, entity_type: EntityType, id: &str) -> StorageResult<()>;

    /// Forget every pending change in one batch
    fn clear_all_changes(&mut self) -> StorageResult<()>;
}

/// Format a pending-change count for display
pub fn format_pending(count: usize) -> String {
    match count {
        0 => "None pending".to_string(),
        1 => "1 change pending".to_string(),
        n => format!("{} changes pending", n),
    }
}
