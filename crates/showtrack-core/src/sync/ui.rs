//! User-facing collaborator of the sync controller
//!
//! The controller never prints. It reports status, progress and errors
//! through a [`SyncUi`] and asks it for confirmation before a pass starts.

use std::sync::Mutex;

use super::error::{format_error_panel, SyncError};

/// What the sync controller needs from the user interface
pub trait SyncUi {
    /// Replace the current status line
    fn show_status(&self, message: &str);

    /// `current` of `total` records have settled
    fn show_progress(&self, current: usize, total: usize);

    /// Ask a yes/no question
    fn confirm(&self, prompt: &str) -> bool;

    /// Show a one-off message
    fn notify(&self, message: &str);

    /// Show the accumulated errors of a pass
    fn show_errors(&self, errors: &[SyncError]) {
        self.notify(&format_error_panel(errors));
    }
}

/// A UI that records everything shown to it (for testing)
#[derive(Debug, Default)]
pub struct RecordingUi {
    answer: bool,
    statuses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    notifications: Mutex<Vec<String>>,
    progress: Mutex<Vec<(usize, usize)>>,
}

impl RecordingUi {
    /// Answers "yes" to every prompt
    pub fn accepting() -> Self {
        Self {
            answer: true,
            ..Default::default()
        }
    }

    /// Answers "no" to every prompt
    pub fn declining() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The most recent status line
    pub fn last_status(&self) -> Option<String> {
        self.statuses.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.progress.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SyncUi for RecordingUi {
    fn show_status(&self, message: &str) {
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }

    fn show_progress(&self, current: usize, total: usize) {
        self.progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((current, total));
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        self.answer
    }

    fn notify(&self, message: &str) {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}
