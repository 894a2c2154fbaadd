//! Episode command handlers

use anyhow::{anyhow, Context, Result};

use showtrack_core::{Entity, EntityStore, EntityType, Episode, EpisodeStatus, Store};

use super::resolve_id;
use crate::output::Output;
use crate::ui::confirm;

/// Fields for a new episode
pub struct NewEpisode {
    pub name: String,
    pub series: String,
    pub status: Option<String>,
    pub date: Option<String>,
    pub sequence: Option<u32>,
}

/// Add an episode to a series
pub fn add(store: &mut Store, new: NewEpisode, output: &Output) -> Result<()> {
    let series_id = resolve_id(store, EntityType::Series, &new.series)?;

    let mut episode = Episode::new(new.name, series_id.clone());
    if let Some(status) = new.status {
        episode.status = parse_status(&status)?;
    }
    episode.status_date = new.date.unwrap_or_default();
    episode.sequence = match new.sequence {
        Some(sequence) => sequence,
        // Append after the last episode of the series
        None => store
            .episodes_for_series(&series_id)?
            .iter()
            .map(|e| e.sequence + 1)
            .max()
            .unwrap_or(1),
    };

    let episode = Entity::from(episode);
    store
        .save_tracked(&episode)
        .context("Failed to add episode")?;

    output.success(&format!("Added episode: {}", episode.id()));
    Ok(())
}

/// List episodes, optionally only those of one series
pub fn list(store: &Store, series: Option<String>, output: &Output) -> Result<()> {
    let episodes = match series {
        Some(ref s) => {
            let series_id = resolve_id(store, EntityType::Series, s)?;
            store
                .episodes_for_series(&series_id)?
                .into_iter()
                .map(Entity::from)
                .collect()
        }
        None => store.list(EntityType::Episode)?,
    };

    output.print_entities(&episodes);
    Ok(())
}

/// Delete an episode
pub fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(store, EntityType::Episode, &id)?;

    if output.should_prompt() && !confirm("Are you sure?")? {
        println!("Cancelled.");
        return Ok(());
    }

    store
        .remove_tracked(EntityType::Episode, &id)
        .context("Failed to delete episode")?;

    output.success(&format!("Deleted episode: {}", id));
    Ok(())
}

/// Parse a status name, case-insensitively
fn parse_status(status: &str) -> Result<EpisodeStatus> {
    let normalized = match status.to_lowercase().as_str() {
        "" | "none" => String::new(),
        other => {
            let mut chars = other.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect())
                .unwrap_or_default()
        }
    };
    normalized.parse().map_err(|e: String| {
        anyhow!("{}. Use one of: watched, recorded, expected, missed, none", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use showtrack_core::sync::ChangeLedger;
    use showtrack_core::Series;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("watched").unwrap(), EpisodeStatus::Watched);
        assert_eq!(parse_status("MISSED").unwrap(), EpisodeStatus::Missed);
        assert_eq!(parse_status("none").unwrap(), EpisodeStatus::Unset);
        assert!(parse_status("binged").is_err());
    }

    #[test]
    fn test_add_appends_sequence_and_records_change() {
        let mut store = Store::open_in_memory().unwrap();
        let series = Series::new("Series 1", "p1");
        let series_id = series.id.clone();
        store.save(&series.into()).unwrap();
        let output = Output::new(OutputFormat::Quiet);

        for name in ["Rose", "The End of the World"] {
            let new = NewEpisode {
                name: name.to_string(),
                series: series_id.clone(),
                status: Some("expected".to_string()),
                date: None,
                sequence: None,
            };
            add(&mut store, new, &output).unwrap();
        }

        let episodes = store.episodes_for_series(&series_id).unwrap();
        let sequences: Vec<_> = episodes.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert!(episodes.iter().all(|e| e.status == EpisodeStatus::Expected));
        assert_eq!(store.pending_count().unwrap(), 2);
    }
}
