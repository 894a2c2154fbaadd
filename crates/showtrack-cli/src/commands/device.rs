//! Device command handlers

use anyhow::Result;

use showtrack_core::{Device, Store};

use super::sync::Controller;
use crate::output::{Output, OutputFormat};
use crate::ui::confirm;

/// Show this device's registration
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let device = Device::load(store)?;

    match output.format {
        OutputFormat::Json => output.print_json(&device),
        OutputFormat::Quiet => println!("{}", device.id),
        OutputFormat::Human => {
            if !device.is_registered() {
                println!("This device is not registered. Register it with:");
                println!("  showtrack device register <name>");
                return Ok(());
            }
            println!("Name: {}", device.name);
            println!("ID:   {}", device.id);
        }
    }

    Ok(())
}

/// Register this device with the sync server
pub async fn register(controller: &Controller, name: String, output: &Output) -> Result<()> {
    let device = controller.register(&name).await?;

    if output.is_json() {
        output.print_json(&device);
    } else if output.is_quiet() {
        println!("{}", device.id);
    }
    Ok(())
}

/// Unregister this device from the sync server
pub async fn unregister(controller: &Controller, assume_yes: bool, output: &Output) -> Result<()> {
    if !assume_yes && output.should_prompt() && !confirm("Unregister this device?")? {
        println!("Cancelled.");
        return Ok(());
    }

    controller.unregister().await?;
    if output.is_json() {
        output.success("Device unregistered");
    }
    Ok(())
}
