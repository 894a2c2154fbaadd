//! Unified storage interface
//!
//! The `Store` owns the SQLite connection and exposes it through three
//! narrow traits used by the sync engine:
//!
//! - [`EntityStore`]: list/find/save/remove per entity type
//! - [`ChangeLedger`]: the local change ledger
//! - [`SettingsStore`]: named settings (device identity, last sync time)
//!
//! User edits go through [`Store::save_tracked`] and
//! [`Store::remove_tracked`], which also append to the ledger so the change
//! is exported on the next sync. The engines use the untracked trait
//! methods when applying server data.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open(&config)?;
//! store.save_tracked(&Program::new("Doctor Who").into())?;
//! assert_eq!(store.pending_count()?, 1);
//! ```

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::config::Config;
use crate::models::{Entity, EntityType, Episode, EpisodeStatus, Program, Series};
use crate::storage::{init_schema, needs_init, StorageError, StorageResult};
use crate::sync::ledger::{ChangeLedger, SyncAction, SyncRecord};

/// CRUD access to tracked entities
pub trait EntityStore {
    /// All entities of one type
    fn list(&self, entity_type: EntityType) -> StorageResult<Vec<Entity>>;

    /// Look up one entity by type and id
    fn find(&self, entity_type: EntityType, id: &str) -> StorageResult<Option<Entity>>;

    /// Insert or replace an entity
    fn save(&mut self, entity: &Entity) -> StorageResult<()>;

    /// Remove an entity; removing one that doesn't exist is not an error
    fn remove(&mut self, entity_type: EntityType, id: &str) -> StorageResult<()>;

    /// Remove every entity of one type
    fn remove_all(&mut self, entity_type: EntityType) -> StorageResult<()>;
}

/// Named string settings
pub trait SettingsStore {
    fn setting(&self, name: &str) -> StorageResult<Option<String>>;

    fn set_setting(&mut self, name: &str, value: &str) -> StorageResult<()>;

    fn remove_setting(&mut self, name: &str) -> StorageResult<()>;
}

/// Everything the sync engine needs from local storage
pub trait LocalStore: EntityStore + ChangeLedger + SettingsStore {}

impl<T: EntityStore + ChangeLedger + SettingsStore> LocalStore for T {}

/// SQLite-backed local store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the database described by the configuration
    pub fn open(config: &Config) -> StorageResult<Self> {
        let path = config.sqlite_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path).map_err(|source| StorageError::Open {
            path: path.clone(),
            source,
        })?;

        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        debug!("Opened store at {:?}", path);
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Save an entity and record it as modified in the ledger
    pub fn save_tracked(&mut self, entity: &Entity) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        upsert_entity(&tx, entity)?;
        upsert_record(
            &tx,
            &SyncRecord::modified(entity.entity_type(), entity.id()),
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove an entity and record the deletion in the ledger
    ///
    /// Fails with `NotFound` when there is nothing to remove, so no
    /// deletion is pushed for an entity the server never had from us.
    pub fn remove_tracked(&mut self, entity_type: EntityType, id: &str) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        let removed = delete_entity(&tx, entity_type, id)?;
        if removed == 0 {
            return Err(StorageError::NotFound {
                entity_type: entity_type.to_string(),
                id: id.to_string(),
            });
        }
        upsert_record(&tx, &SyncRecord::deleted(entity_type, id))?;
        tx.commit()?;
        Ok(())
    }

    /// Count entities of one type
    pub fn count(&self, entity_type: EntityType) -> StorageResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table_name(entity_type));
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Series belonging to a program
    pub fn series_for_program(&self, program_id: &str) -> StorageResult<Vec<Series>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, series_name, now_showing, program_id FROM series WHERE program_id = ? ORDER BY series_name",
        )?;
        let rows = stmt.query_map(params![program_id], series_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Episodes belonging to a series, in sequence order
    pub fn episodes_for_series(&self, series_id: &str) -> StorageResult<Vec<Episode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, episode_name, series_id, status, status_date, unverified, unscheduled, sequence
             FROM episodes WHERE series_id = ? ORDER BY sequence, id",
        )?;
        let rows = stmt.query_map(params![series_id], episode_row)?;
        let episodes = rows
            .map(|row| row?.into_episode())
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(episodes)
    }
}

impl EntityStore for Store {
    fn list(&self, entity_type: EntityType) -> StorageResult<Vec<Entity>> {
        match entity_type {
            EntityType::Program => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT id, program_name FROM programs ORDER BY program_name")?;
                let rows = stmt.query_map([], program_from_row)?;
                Ok(rows
                    .map(|r| r.map(Entity::Program))
                    .collect::<Result<Vec<_>, _>>()?)
            }
            EntityType::Series => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, series_name, now_showing, program_id FROM series ORDER BY series_name",
                )?;
                let rows = stmt.query_map([], series_from_row)?;
                Ok(rows
                    .map(|r| r.map(Entity::Series))
                    .collect::<Result<Vec<_>, _>>()?)
            }
            EntityType::Episode => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, episode_name, series_id, status, status_date, unverified, unscheduled, sequence
                     FROM episodes ORDER BY series_id, sequence",
                )?;
                let rows = stmt.query_map([], episode_row)?;
                let episodes = rows
                    .map(|row| row?.into_episode().map(Entity::Episode))
                    .collect::<StorageResult<Vec<_>>>()?;
                Ok(episodes)
            }
        }
    }

    fn find(&self, entity_type: EntityType, id: &str) -> StorageResult<Option<Entity>> {
        let entity = match entity_type {
            EntityType::Program => self
                .conn
                .query_row(
                    "SELECT id, program_name FROM programs WHERE id = ?",
                    params![id],
                    program_from_row,
                )
                .optional()?
                .map(Entity::Program),
            EntityType::Series => self
                .conn
                .query_row(
                    "SELECT id, series_name, now_showing, program_id FROM series WHERE id = ?",
                    params![id],
                    series_from_row,
                )
                .optional()?
                .map(Entity::Series),
            EntityType::Episode => {
                let row = self
                    .conn
                    .query_row(
                        "SELECT id, episode_name, series_id, status, status_date, unverified, unscheduled, sequence
                         FROM episodes WHERE id = ?",
                        params![id],
                        episode_row,
                    )
                    .optional()?;
                match row {
                    Some(row) => Some(Entity::Episode(row.into_episode()?)),
                    None => None,
                }
            }
        };
        Ok(entity)
    }

    fn save(&mut self, entity: &Entity) -> StorageResult<()> {
        upsert_entity(&self.conn, entity)
    }

    fn remove(&mut self, entity_type: EntityType, id: &str) -> StorageResult<()> {
        delete_entity(&self.conn, entity_type, id)?;
        Ok(())
    }

    fn remove_all(&mut self, entity_type: EntityType) -> StorageResult<()> {
        let sql = format!("DELETE FROM {}", table_name(entity_type));
        let removed = self.conn.execute(&sql, [])?;
        debug!("Removed all {} rows ({})", entity_type, removed);
        Ok(())
    }
}

impl ChangeLedger for Store {
    fn pending_changes(&self) -> StorageResult<Vec<SyncRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT type, id, action FROM sync ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (kind, id, action) = row?;
            let entity_type = kind.parse::<EntityType>().map_err(|_| StorageError::InvalidValue {
                column: "sync.type",
                value: kind.clone(),
            })?;
            let action = action.parse::<SyncAction>().map_err(|_| StorageError::InvalidValue {
                column: "sync.action",
                value: action.clone(),
            })?;
            records.push(SyncRecord::new(entity_type, id, action));
        }
        Ok(records)
    }

    fn pending_count(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn record_change(&mut self, record: &SyncRecord) -> StorageResult<()> {
        upsert_record(&self.conn, record)
    }

    fn clear_change(&mut self, entity_type: EntityType, id: &str) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM sync WHERE type = ? AND id = ?",
            params![entity_type.as_str(), id],
        )?;
        Ok(())
    }

    fn clear_all_changes(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM sync", [])?;
        Ok(())
    }
}

impl SettingsStore for Store {
    fn setting(&self, name: &str) -> StorageResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set_setting(&mut self, name: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (name, value) VALUES (?, ?)",
            params![name, value],
        )?;
        Ok(())
    }

    fn remove_setting(&mut self, name: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM settings WHERE name = ?", params![name])?;
        Ok(())
    }
}

// ==================== Row helpers ====================

fn table_name(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Program => "programs",
        EntityType::Series => "series",
        EntityType::Episode => "episodes",
    }
}

fn upsert_entity(conn: &Connection, entity: &Entity) -> StorageResult<()> {
    match entity {
        Entity::Program(p) => {
            conn.execute(
                "INSERT OR REPLACE INTO programs (id, program_name) VALUES (?, ?)",
                params![p.id, p.program_name],
            )?;
        }
        Entity::Series(s) => {
            conn.execute(
                "INSERT OR REPLACE INTO series (id, series_name, now_showing, program_id) VALUES (?, ?, ?, ?)",
                params![s.id, s.series_name, s.now_showing, s.program_id],
            )?;
        }
        Entity::Episode(e) => {
            conn.execute(
                "INSERT OR REPLACE INTO episodes
                 (id, episode_name, series_id, status, status_date, unverified, unscheduled, sequence)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    e.id,
                    e.episode_name,
                    e.series_id,
                    e.status.as_str(),
                    e.status_date,
                    e.unverified,
                    e.unscheduled,
                    e.sequence
                ],
            )?;
        }
    }
    Ok(())
}

fn delete_entity(conn: &Connection, entity_type: EntityType, id: &str) -> StorageResult<usize> {
    let sql = format!("DELETE FROM {} WHERE id = ?", table_name(entity_type));
    Ok(conn.execute(&sql, params![id])?)
}

fn upsert_record(conn: &Connection, record: &SyncRecord) -> StorageResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sync (type, id, action) VALUES (?, ?, ?)",
        params![record.entity_type.as_str(), record.id, record.action.as_str()],
    )?;
    Ok(())
}

fn program_from_row(row: &Row<'_>) -> rusqlite::Result<Program> {
    Ok(Program {
        id: row.get(0)?,
        program_name: row.get(1)?,
    })
}

fn series_from_row(row: &Row<'_>) -> rusqlite::Result<Series> {
    Ok(Series {
        id: row.get(0)?,
        series_name: row.get(1)?,
        now_showing: row.get(2)?,
        program_id: row.get(3)?,
    })
}

/// Raw episode row; status is parsed after the query
struct EpisodeRow {
    id: String,
    episode_name: String,
    series_id: String,
    status: String,
    status_date: String,
    unverified: bool,
    unscheduled: bool,
    sequence: u32,
}

impl EpisodeRow {
    fn into_episode(self) -> StorageResult<Episode> {
        let status = self
            .status
            .parse::<EpisodeStatus>()
            .map_err(|_| StorageError::InvalidValue {
                column: "episodes.status",
                value: self.status.clone(),
            })?;
        Ok(Episode {
            id: self.id,
            episode_name: self.episode_name,
            series_id: self.series_id,
            status,
            status_date: self.status_date,
            unverified: self.unverified,
            unscheduled: self.unscheduled,
            sequence: self.sequence,
        })
    }
}

fn episode_row(row: &Row<'_>) -> rusqlite::Result<EpisodeRow> {
    Ok(EpisodeRow {
        id: row.get(0)?,
        episode_name: row.get(1)?,
        series_id: row.get(2)?,
        status: row.get(3)?,
        status_date: row.get(4)?,
        unverified: row.get(5)?,
        unscheduled: row.get(6)?,
        sequence: row.get(7)?,
    })
}
