//! Export, import and sync command handlers

use anyhow::{bail, Context, Result};

use showtrack_core::sync::{Outcome, SyncReport};
use showtrack_core::{Config, HttpTransport, Store, SyncController};

use crate::output::Output;
use crate::ui::ConsoleUi;

/// Controller used by every command that talks to the server
pub type Controller = SyncController<Store, HttpTransport, ConsoleUi>;

/// Build a controller for the configured server
pub fn controller(config: &Config, store: Store, ui: ConsoleUi) -> Result<Controller> {
    if config.server_url.is_none() {
        bail!(
            "Sync server not configured. Set it with:\n  \
             showtrack config set server_url http://your-server:3000"
        );
    }

    let transport = HttpTransport::from_config(config).context("Failed to set up sync transport")?;
    Ok(SyncController::new(store, transport, ui))
}

/// Whether an import should be fast
///
/// `--full` and `--fast` win over the configured `fast_import` default.
pub fn fast_requested(fast: bool, full: bool, config: &Config) -> bool {
    if full {
        false
    } else {
        fast || config.fast_import
    }
}

/// Push local changes to the server
pub async fn export(controller: &Controller, output: &Output) -> Result<()> {
    let report = controller.export().await;
    output.print_report(&report);
    check(&report)
}

/// Pull server changes
pub async fn import(controller: &Controller, fast: bool, output: &Output) -> Result<()> {
    let report = controller.import(fast).await;
    output.print_report(&report);
    check(&report)
}

/// Export, then import
pub async fn sync(controller: &Controller, fast: bool, output: &Output) -> Result<()> {
    let reports = controller.sync(fast).await;
    if output.is_json() {
        output.print_json(&reports);
    } else if let Some(last) = reports.last() {
        output.print_report(last);
    }
    reports.iter().try_for_each(check)
}

/// Turn an unsuccessful report into a command error
fn check(report: &SyncReport) -> Result<()> {
    match report.outcome {
        Outcome::Succeeded | Outcome::Aborted => Ok(()),
        Outcome::NotRegistered => bail!(
            "This device is not registered. Register it with:\n  \
             showtrack device register <name>"
        ),
        Outcome::AlreadyRunning => bail!("{}", report.status_message()),
        Outcome::Failed => bail!(
            "{} {} error(s) recorded.",
            report.status_message(),
            report.errors.len()
        ),
    }
}
