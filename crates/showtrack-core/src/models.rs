//! Data models for showtrack
//!
//! Defines the tracked entities: Program, Series and Episode, plus the
//! closed `EntityType` tag used by the change ledger and the wire format.
//!
//! Field names serialize in camelCase to match the sync server's documents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kinds of entity tracked by the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Program,
    Series,
    Episode,
}

impl EntityType {
    /// Every tracked type, in dependency order (parents first)
    pub const ALL: [EntityType; 3] = [EntityType::Program, EntityType::Series, EntityType::Episode];

    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Program => "Program",
            EntityType::Series => "Series",
            EntityType::Episode => "Episode",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown entity type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown entity type: {0}")]
pub struct UnknownEntityType(pub String);

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Program" => Ok(EntityType::Program),
            "Series" => Ok(EntityType::Series),
            "Episode" => Ok(EntityType::Episode),
            other => Err(UnknownEntityType(other.to_string())),
        }
    }
}

/// A TV program (the top of the hierarchy)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Program {
    pub id: String,
    pub program_name: String,
}

impl Program {
    /// Create a new program with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            program_name: name.into(),
        }
    }
}

/// A series (season) belonging to a program
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Series {
    pub id: String,
    pub series_name: String,
    /// Day of week the series airs on, if currently showing
    pub now_showing: Option<u32>,
    pub program_id: String,
}

impl Series {
    /// Create a new series under the given program
    pub fn new(name: impl Into<String>, program_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            series_name: name.into(),
            now_showing: None,
            program_id: program_id.into(),
        }
    }
}

/// Viewing status of an episode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeStatus {
    #[default]
    #[serde(rename = "")]
    Unset,
    Watched,
    Recorded,
    Expected,
    Missed,
}

impl EpisodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeStatus::Unset => "",
            EpisodeStatus::Watched => "Watched",
            EpisodeStatus::Recorded => "Recorded",
            EpisodeStatus::Expected => "Expected",
            EpisodeStatus::Missed => "Missed",
        }
    }
}

impl FromStr for EpisodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(EpisodeStatus::Unset),
            "Watched" => Ok(EpisodeStatus::Watched),
            "Recorded" => Ok(EpisodeStatus::Recorded),
            "Expected" => Ok(EpisodeStatus::Expected),
            "Missed" => Ok(EpisodeStatus::Missed),
            other => Err(format!("Unknown episode status: {}", other)),
        }
    }
}

/// A single episode belonging to a series
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Episode {
    pub id: String,
    pub episode_name: String,
    pub series_id: String,
    pub status: EpisodeStatus,
    /// Free-form date the status applies to (e.g. air date)
    pub status_date: String,
    pub unverified: bool,
    pub unscheduled: bool,
    pub sequence: u32,
}

impl Episode {
    /// Create a new episode under the given series
    pub fn new(name: impl Into<String>, series_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            episode_name: name.into(),
            series_id: series_id.into(),
            ..Default::default()
        }
    }
}

/// Any tracked entity
///
/// Serialized with an internal `type` tag, which is how the server tells
/// the three kinds apart inside one document collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Entity {
    Program(Program),
    Series(Series),
    Episode(Episode),
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Program(_) => EntityType::Program,
            Entity::Series(_) => EntityType::Series,
            Entity::Episode(_) => EntityType::Episode,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Program(p) => &p.id,
            Entity::Series(s) => &s.id,
            Entity::Episode(e) => &e.id,
        }
    }

    /// Human-readable name of the entity
    pub fn name(&self) -> &str {
        match self {
            Entity::Program(p) => &p.program_name,
            Entity::Series(s) => &s.series_name,
            Entity::Episode(e) => &e.episode_name,
        }
    }
}

impl From<Program> for Entity {
    fn from(p: Program) -> Self {
        Entity::Program(p)
    }
}

impl From<Series> for Entity {
    fn from(s: Series) -> Self {
        Entity::Series(s)
    }
}

impl From<Episode> for Entity {
    fn from(e: Episode) -> Self {
        Entity::Episode(e)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_round_trip_names() {
        for kind in EntityType::ALL {
            assert_eq!(kind.as_str().parse::<EntityType>().unwrap(), kind);
        }
        assert!("Movie".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_program_new() {
        let program = Program::new("Doctor Who");
        assert_eq!(program.program_name, "Doctor Who");
        assert!(Uuid::parse_str(&program.id).is_ok());
    }

    #[test]
    fn test_entity_serializes_with_type_tag() {
        let entity = Entity::from(Program {
            id: "1".to_string(),
            program_name: "Doctor Who".to_string(),
        });
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "Program");
        assert_eq!(json["programName"], "Doctor Who");
        assert_eq!(json["id"], "1");
    }

    #[test]
    fn test_episode_from_wire() {
        let json = serde_json::json!({
            "type": "Episode",
            "id": "42",
            "episodeName": "Pilot",
            "seriesId": "7",
            "status": "Watched",
            "unverified": true
        });
        let entity: Entity = serde_json::from_value(json).unwrap();
        let Entity::Episode(episode) = entity else {
            panic!("expected an episode");
        };
        assert_eq!(episode.episode_name, "Pilot");
        assert_eq!(episode.status, EpisodeStatus::Watched);
        assert!(episode.unverified);
        assert_eq!(episode.sequence, 0);
        assert_eq!(episode.status_date, "");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = serde_json::json!({ "type": "Movie", "id": "1" });
        assert!(serde_json::from_value::<Entity>(json).is_err());
    }

    #[test]
    fn test_entity_accessors() {
        let series = Series::new("Series 1", "p1");
        let id = series.id.clone();
        let entity = Entity::from(series);
        assert_eq!(entity.entity_type(), EntityType::Series);
        assert_eq!(entity.id(), id);
        assert_eq!(entity.name(), "Series 1");
    }

    #[test]
    fn test_episode_status_empty_string() {
        let status: EpisodeStatus = serde_json::from_str("\"\"").unwrap();
        assert_eq!(status, EpisodeStatus::Unset);
        assert_eq!("Missed".parse::<EpisodeStatus>().unwrap(), EpisodeStatus::Missed);
    }
}
