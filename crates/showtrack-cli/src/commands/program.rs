//! Program command handlers

use anyhow::{Context, Result};

use showtrack_core::{Entity, EntityStore, EntityType, Program, Store};

use super::resolve_id;
use crate::output::Output;
use crate::ui::confirm;

/// Add a program
pub fn add(store: &mut Store, name: String, output: &Output) -> Result<()> {
    let program = Entity::from(Program::new(name));
    store
        .save_tracked(&program)
        .context("Failed to add program")?;

    output.success(&format!("Added program: {}", program.id()));
    Ok(())
}

/// List all programs
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let programs = store.list(EntityType::Program)?;
    output.print_entities(&programs);
    Ok(())
}

/// Delete a program
pub fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(store, EntityType::Program, &id)?;
    let series = store.series_for_program(&id)?;

    if output.should_prompt() {
        if !series.is_empty() {
            println!("This program still has {} series.", series.len());
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .remove_tracked(EntityType::Program, &id)
        .context("Failed to delete program")?;

    output.success(&format!("Deleted program: {}", id));
    Ok(())
}
