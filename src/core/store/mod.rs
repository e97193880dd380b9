//! SQLite-backed form data repository
//!
//! This module provides the local store that:
//! - Keeps every entity as a JSON field map keyed by (type, id)
//! - Merges repeated saves of the same entity instead of duplicating it
//! - Assembles entity hierarchies by following the relationship graph
//! - Keeps submitted form instances for verbatim replay

mod queries;
mod schema;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::definition::EntityDefinitions;
use crate::core::error::RepositoryError;
use crate::core::form::{FormModel, FormParams};
use crate::core::hierarchy::EntityHierarchy;
use crate::core::instance::id_string;
use crate::core::repository::FormDataRepository;

/// Database file location within a project
pub const DATABASE_FILE: &str = ".ziggy/forms.db";

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Row counts reported by `ziggy status`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub entities_by_type: BTreeMap<String, usize>,
    pub form_instances: usize,
}

impl StoreStats {
    pub fn total_entities(&self) -> usize {
        self.entities_by_type.values().sum()
    }
}

/// The form data store backed by SQLite
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open or create the store at `path`
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let mut repository = Self { conn };
        repository.ensure_schema()?;
        debug!(path = %path.display(), "opened form store");
        Ok(repository)
    }

    /// Open a throwaway store that lives only as long as the value
    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        let mut repository = Self {
            conn: Connection::open_in_memory()?,
        };
        repository.ensure_schema()?;
        Ok(repository)
    }

    /// Stored fields of one entity
    pub fn find_entity(
        &self,
        entity_type: &str,
        id: &str,
    ) -> Result<Option<Map<String, Value>>, RepositoryError> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT fields FROM entities WHERE entity_type = ?1 AND id = ?2",
                params![entity_type, id],
                |row| row.get(0),
            )
            .optional()?;

        stored
            .map(|json| serde_json::from_str(&json).map_err(RepositoryError::from))
            .transpose()
    }

    /// Entities of a type whose `field` equals `value`, in insertion order
    pub fn find_entities_by_field(
        &self,
        entity_type: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Map<String, Value>>, RepositoryError> {
        let path = format!("$.\"{}\"", field.replace('"', "\\\""));
        let mut stmt = self.conn.prepare(
            "SELECT fields FROM entities
             WHERE entity_type = ?1 AND CAST(json_extract(fields, ?2) AS TEXT) = ?3
             ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![entity_type, path, value], |row| {
            row.get::<_, String>(0)
        })?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(serde_json::from_str(&row?)?);
        }
        Ok(entities)
    }

    /// Row counts per entity type and saved form instances
    pub fn statistics(&self) -> Result<StoreStats, RepositoryError> {
        let mut stats = StoreStats::default();

        let mut stmt = self
            .conn
            .prepare("SELECT entity_type, COUNT(*) FROM entities GROUP BY entity_type")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (entity_type, count) = row?;
            stats.entities_by_type.insert(entity_type, count as usize);
        }

        let instances: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM form_instances", [], |row| row.get(0))?;
        stats.form_instances = instances as usize;

        Ok(stats)
    }
}

impl FormDataRepository for SqliteRepository {
    fn get_form_instance_by_form_type_and_id(
        &self,
        id: &str,
        form_name: &str,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .conn
            .query_row(
                "SELECT instance FROM form_instances WHERE instance_id = ?1 AND form_name = ?2",
                params![id, form_name],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn load_entity_hierarchy(
        &self,
        definitions: &EntityDefinitions,
        root_type: &str,
        root_id: &str,
    ) -> Result<EntityHierarchy, RepositoryError> {
        self.load_hierarchy(definitions, root_type, root_id)
    }

    fn save_entity(
        &self,
        entity_type: &str,
        fields: &Map<String, Value>,
    ) -> Result<Option<String>, RepositoryError> {
        let id = fields
            .get("id")
            .and_then(id_string)
            .ok_or_else(|| RepositoryError::MissingId(entity_type.to_string()))?;

        let tx = self.conn.unchecked_transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT fields FROM entities WHERE entity_type = ?1 AND id = ?2",
                params![entity_type, id],
                |row| row.get(0),
            )
            .optional()?;

        let mut merged: Map<String, Value> = match existing {
            Some(json) => serde_json::from_str(&json)?,
            None => Map::new(),
        };
        merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        tx.execute(
            "INSERT INTO entities (entity_type, id, fields, updated) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(entity_type, id) DO UPDATE SET fields = excluded.fields, updated = excluded.updated",
            params![
                entity_type,
                id,
                serde_json::to_string(&merged)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;

        debug!(entity_type, id = %id, fields = merged.len(), "saved entity");
        Ok(Some(id))
    }

    fn save_form_submission(
        &self,
        params: &FormParams,
        model: &FormModel,
    ) -> Result<(), RepositoryError> {
        let instance_id = params
            .id
            .as_deref()
            .ok_or_else(|| RepositoryError::MissingId(format!("{} form instance", params.form_name)))?;

        self.conn.execute(
            "INSERT OR REPLACE INTO form_instances (instance_id, form_name, entity_id, instance, submitted)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                instance_id,
                params.form_name,
                params.entity_id,
                serde_json::to_string(model)?,
                Utc::now().to_rfc3339()
            ],
        )?;

        debug!(instance_id, form_name = %params.form_name, "saved form submission");
        Ok(())
    }

    fn delete_form_instance(&self, id: &str, form_name: &str) -> Result<bool, RepositoryError> {
        let deleted = self.conn.execute(
            "DELETE FROM form_instances WHERE instance_id = ?1 AND form_name = ?2",
            params![id, form_name],
        )?;
        Ok(deleted > 0)
    }
}
