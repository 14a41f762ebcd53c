//! SQLite-backed scheduler state.
//!
//! Holds what must survive a restart:
//! - The framework identity assigned at registration, so a restarted
//!   scheduler re-registers as the same framework
//! - Desired counts per group, as last set through the API
//!
//! Running task sets are not stored; they live in the in-memory registry.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use fleet_id::{FrameworkId, GroupKey};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

/// Errors from state store operations.
#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid state: {0}")]
    Invalid(String),
}

/// Framework registration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkRecord {
    pub framework_id: FrameworkId,
    pub registered_at: DateTime<Utc>,
}

/// SQLite state store.
pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    /// Open or create a state store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StateStoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self { conn };
        store.init_schema()?;

        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StateStoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StateStoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS framework (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                framework_id TEXT NOT NULL,
                registered_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS requirements (
                group_key TEXT PRIMARY KEY,
                desired INTEGER NOT NULL CHECK (desired >= 0),
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        debug!("State store schema initialized");
        Ok(())
    }

    /// The stored framework registration, if any.
    pub fn framework(&self) -> Result<Option<FrameworkRecord>, StateStoreError> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT framework_id, registered_at FROM framework WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((raw_id, registered_at)) = row else {
            return Ok(None);
        };

        let framework_id = FrameworkId::parse(&raw_id)
            .map_err(|e| StateStoreError::Invalid(format!("framework_id {raw_id:?}: {e}")))?;
        let registered_at = DateTime::from_timestamp(registered_at, 0).ok_or_else(|| {
            StateStoreError::Invalid(format!("registered_at out of range: {registered_at}"))
        })?;

        Ok(Some(FrameworkRecord {
            framework_id,
            registered_at,
        }))
    }

    /// Record the framework identity, replacing any previous one.
    pub fn set_framework_id(&self, framework_id: &FrameworkId) -> Result<(), StateStoreError> {
        self.conn.execute(
            r#"
            INSERT INTO framework (id, framework_id, registered_at) VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                framework_id = excluded.framework_id,
                registered_at = excluded.registered_at
            "#,
            params![framework_id.as_str(), Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// All stored desired counts.
    pub fn requirements(&self) -> Result<BTreeMap<GroupKey, u32>, StateStoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT group_key, desired FROM requirements ORDER BY group_key")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(raw, desired)| {
                let group = GroupKey::parse(&raw)
                    .map_err(|e| StateStoreError::Invalid(format!("group {raw:?}: {e}")))?;
                Ok((group, desired))
            })
            .collect()
    }

    /// Insert or update a group's desired count.
    pub fn set_requirement(&self, group: &GroupKey, desired: u32) -> Result<(), StateStoreError> {
        self.conn.execute(
            r#"
            INSERT INTO requirements (group_key, desired, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(group_key) DO UPDATE SET
                desired = excluded.desired,
                updated_at = excluded.updated_at
            "#,
            params![group.as_str(), desired, Utc::now().timestamp()],
        )?;
        Ok(())
    }
}
