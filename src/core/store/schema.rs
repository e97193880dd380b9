//! Database schema initialization

use rusqlite::{params, OptionalExtension};

use super::{SqliteRepository, SCHEMA_VERSION};
use crate::core::error::RepositoryError;

impl SqliteRepository {
    /// Create tables on a fresh database and check the version of an existing one
    ///
    /// A version mismatch is reported, never rebuilt.
    pub(super) fn ensure_schema(&mut self) -> Result<(), RepositoryError> {
        let has_version_table: bool = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
                [],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        if !has_version_table {
            return self.init_schema();
        }

        let found: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        if found != SCHEMA_VERSION {
            return Err(RepositoryError::SchemaVersion {
                found,
                expected: SCHEMA_VERSION,
            });
        }

        Ok(())
    }

    /// Initialize database schema
    fn init_schema(&mut self) -> Result<(), RepositoryError> {
        self.conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Entity records; fields hold the persistence-name -> value map as JSON
            CREATE TABLE IF NOT EXISTS entities (
                entity_type TEXT NOT NULL,
                id TEXT NOT NULL,
                fields TEXT NOT NULL,
                updated TEXT NOT NULL,
                PRIMARY KEY (entity_type, id)
            );
            CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(entity_type);

            -- Saved form instances, replayed verbatim on the next load
            CREATE TABLE IF NOT EXISTS form_instances (
                instance_id TEXT NOT NULL,
                form_name TEXT NOT NULL,
                entity_id TEXT,
                instance TEXT NOT NULL,
                submitted TEXT NOT NULL,
                PRIMARY KEY (instance_id, form_name)
            );
            CREATE INDEX IF NOT EXISTS idx_form_instances_entity ON form_instances(entity_id);
            "#,
        )?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }
}
