//! Command handlers

pub mod config;
pub mod device;
pub mod episode;
pub mod program;
pub mod series;
pub mod status;
pub mod sync;

use anyhow::{bail, Result};

use showtrack_core::{EntityStore, EntityType, Store};

/// Resolve an entity ID (supports full ID or prefix)
pub(crate) fn resolve_id(store: &Store, entity_type: EntityType, id: &str) -> Result<String> {
    if store.find(entity_type, id)?.is_some() {
        return Ok(id.to_string());
    }

    let entities = store.list(entity_type)?;
    let matches: Vec<_> = entities.iter().filter(|e| e.id().starts_with(id)).collect();

    match matches.len() {
        0 => bail!("No {} found matching: {}", entity_type.as_str().to_lowercase(), id),
        1 => Ok(matches[0].id().to_string()),
        _ => {
            eprintln!("Multiple entries match '{}':", id);
            for entity in &matches {
                eprintln!("  {} - {}", entity.id(), entity.name());
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showtrack_core::Program;

    #[test]
    fn test_resolve_id_by_prefix() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .save(&Program { id: "abc-123".into(), program_name: "A".into() }.into())
            .unwrap();
        store
            .save(&Program { id: "abd-456".into(), program_name: "B".into() }.into())
            .unwrap();

        assert_eq!(resolve_id(&store, EntityType::Program, "abc-123").unwrap(), "abc-123");
        assert_eq!(resolve_id(&store, EntityType::Program, "abd").unwrap(), "abd-456");
        assert!(resolve_id(&store, EntityType::Program, "ab").is_err());
        assert!(resolve_id(&store, EntityType::Program, "zzz").is_err());
        assert!(resolve_id(&store, EntityType::Series, "abc").is_err());
    }
}
