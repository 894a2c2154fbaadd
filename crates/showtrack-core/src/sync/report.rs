//! Outcome of one export, import or sync pass

use std::fmt;

use serde::Serialize;

use super::error::SyncError;
use super::import::ImportMode;

/// Which pass was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Export,
    Import(ImportMode),
    Sync,
}

impl Operation {
    fn noun(&self) -> &'static str {
        match self {
            Operation::Export => "An export",
            Operation::Import(_) => "An import",
            Operation::Sync => "A sync",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Export => f.write_str("export"),
            Operation::Import(mode) => write!(f, "{} import", mode),
            Operation::Sync => f.write_str("sync"),
        }
    }
}

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Succeeded,
    /// Ran to completion with at least one recorded error
    Failed,
    /// Declined at the confirmation prompt
    Aborted,
    /// Rejected because another pass was in progress
    AlreadyRunning,
    /// Rejected because the device has no server id
    NotRegistered,
}

/// Result of one pass, returned to the caller instead of kept in globals
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub operation: Operation,
    pub outcome: Outcome,
    /// Records or documents that settled (successfully or not)
    pub processed: usize,
    /// Records or documents the pass set out to handle
    pub total: usize,
    pub errors: Vec<SyncError>,
    /// Ledger size after the pass, when it was recomputed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<usize>,
}

impl SyncReport {
    pub fn new(operation: Operation, outcome: Outcome) -> Self {
        Self {
            operation,
            outcome,
            processed: 0,
            total: 0,
            errors: Vec::new(),
            pending: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }

    /// Status line shown to the user when the pass ends
    pub fn status_message(&self) -> String {
        match (self.outcome, self.operation) {
            (Outcome::Succeeded, Operation::Export) => {
                "Database has been successfully exported.".to_string()
            }
            (Outcome::Succeeded, _) => "Database has been successfully imported.".to_string(),
            (Outcome::Failed, Operation::Export) => "Export failed.".to_string(),
            (Outcome::Failed, _) => "Import failed.".to_string(),
            (Outcome::Aborted, Operation::Import(_)) => "Import aborted".to_string(),
            (Outcome::Aborted, _) => "Export aborted".to_string(),
            (Outcome::AlreadyRunning, op) => format!("{} is already running", op.noun()),
            (Outcome::NotRegistered, _) => "This device is not registered".to_string(),
        }
    }
}
