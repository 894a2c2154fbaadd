//! Series command handlers

use anyhow::{Context, Result};

use showtrack_core::{Entity, EntityStore, EntityType, Series, Store};

use super::resolve_id;
use crate::output::Output;
use crate::ui::confirm;

/// Add a series to a program
pub fn add(
    store: &mut Store,
    name: String,
    program: String,
    now_showing: Option<u32>,
    output: &Output,
) -> Result<()> {
    let program_id = resolve_id(store, EntityType::Program, &program)?;

    let mut series = Series::new(name, program_id);
    series.now_showing = now_showing;
    let series = Entity::from(series);
    store
        .save_tracked(&series)
        .context("Failed to add series")?;

    output.success(&format!("Added series: {}", series.id()));
    Ok(())
}

/// List series, optionally only those of one program
pub fn list(store: &Store, program: Option<String>, output: &Output) -> Result<()> {
    let series = match program {
        Some(ref p) => {
            let program_id = resolve_id(store, EntityType::Program, p)?;
            store
                .series_for_program(&program_id)?
                .into_iter()
                .map(Entity::from)
                .collect()
        }
        None => store.list(EntityType::Series)?,
    };

    output.print_entities(&series);
    Ok(())
}

/// Delete a series
pub fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(store, EntityType::Series, &id)?;

    if output.should_prompt() && !confirm("Are you sure?")? {
        println!("Cancelled.");
        return Ok(());
    }

    store
        .remove_tracked(EntityType::Series, &id)
        .context("Failed to delete series")?;

    output.success(&format!("Deleted series: {}", id));
    Ok(())
}
