//! Status command handler

use anyhow::Result;

use showtrack_core::sync::{format_pending, SyncSummary};
use showtrack_core::{Config, EntityType, Store};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let summary = SyncSummary::load(store)?;
    let programs = store.count(EntityType::Program)?;
    let series = store.count(EntityType::Series)?;
    let episodes = store.count(EntityType::Episode)?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "device": summary.device,
                    "last_sync": summary.last_sync,
                    "pending": summary.pending,
                    "server_url": config.server_url,
                    "counts": {
                        "programs": programs,
                        "series": series,
                        "episodes": episodes
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", summary.pending);
        }
        OutputFormat::Human => {
            println!("showtrack Status");
            println!("================");
            println!();
            println!("Device:");
            if summary.device.is_registered() {
                println!("  Name: {}", summary.device.name);
                println!("  ID:   {}", summary.device.id);
                println!(
                    "  Full import: {}",
                    if summary.device.imported_full_set {
                        "done"
                    } else {
                        "not yet"
                    }
                );
            } else {
                println!("  Not registered");
            }
            println!();
            println!("Sync:");
            println!(
                "  Server:    {}",
                config.server_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  Last sync: {}",
                summary
                    .last_sync
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string())
            );
            println!("  {}", format_pending(summary.pending));
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!();
            println!("Contents:");
            println!("  Programs: {}", programs);
            println!("  Series:   {}", series);
            println!("  Episodes: {}", episodes);
        }
    }

    Ok(())
}
