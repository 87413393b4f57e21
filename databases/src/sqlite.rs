//! SQLite Model Catalog
//!
//! This module provides the SQLite-backed catalog of trained models,
//! including connection management, schema creation, and the record
//! operations used by the model service.

use crate::models::{ClassificationMetrics, ModelRecord, ParamMap};
use crate::{CatalogError, CatalogStore, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

const SELECT_COLUMNS: &str = "SELECT id, model_type, params, file_path, created_at, metrics FROM ml_models";

/// SQLite catalog of model records
pub struct SqliteCatalog {
    /// Database connection
    connection: Mutex<Connection>,
    /// Database path
    db_path: String,
}

/// Row as stored, before JSON and timestamp decoding
struct StoredRow {
    id: String,
    model_type: String,
    params: String,
    file_path: String,
    created_at: String,
    metrics: String,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            model_type: row.get(1)?,
            params: row.get(2)?,
            file_path: row.get(3)?,
            created_at: row.get(4)?,
            metrics: row.get(5)?,
        })
    }

    fn decode(self) -> Result<ModelRecord> {
        let corrupt = |reason: String| CatalogError::Corrupt {
            id: self.id.clone(),
            reason,
        };

        let params: ParamMap = serde_json::from_str(&self.params)
            .map_err(|e| corrupt(format!("invalid params JSON: {e}")))?;
        let metrics: ClassificationMetrics = serde_json::from_str(&self.metrics)
            .map_err(|e| corrupt(format!("invalid metrics JSON: {e}")))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt(format!("invalid created_at: {e}")))?
            .with_timezone(&Utc);

        Ok(ModelRecord {
            id: self.id,
            model_type: self.model_type,
            params,
            file_path: self.file_path,
            created_at,
            metrics,
        })
    }
}

impl SqliteCatalog {
    /// Open (or create) the catalog at the given path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().to_string_lossy().to_string();

        info!("Opening SQLite model catalog at: {path}");

        let conn = Connection::open(&path)?;
        Self::with_connection(conn, path)
    }

    /// Catalog backed by a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, ":memory:".to_string())
    }

    fn with_connection(conn: Connection, db_path: String) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(30))?;
        Self::initialize_schema(&conn)?;

        Ok(Self {
            connection: Mutex::new(conn),
            db_path,
        })
    }

    /// Initialize database schema
    fn initialize_schema(conn: &Connection) -> Result<()> {
        debug!("Initializing model catalog schema");

        // seq keeps creation order stable across replace
        conn.execute(
            "CREATE TABLE IF NOT EXISTS ml_models (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                model_type TEXT NOT NULL,
                params TEXT NOT NULL,
                file_path TEXT NOT NULL,
                created_at TEXT NOT NULL,
                metrics TEXT NOT NULL
            );",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_ml_models_type ON ml_models(model_type);",
            [],
        )?;

        Ok(())
    }

    /// Path of the backing database file
    pub fn database_path(&self) -> &str {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| CatalogError::LockPoisoned)
    }

    fn insert(conn: &Connection, record: &ModelRecord) -> Result<()> {
        let params_json = serde_json::to_string(&record.params)?;
        let metrics_json = serde_json::to_string(&record.metrics)?;

        conn.execute(
            "INSERT INTO ml_models (id, model_type, params, file_path, created_at, metrics)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                record.id,
                record.model_type,
                params_json,
                record.file_path,
                record.created_at.to_rfc3339(),
                metrics_json,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                CatalogError::Duplicate(record.id.clone())
            }
            other => CatalogError::Sqlite(other),
        })?;

        Ok(())
    }
}

impl CatalogStore for SqliteCatalog {
    fn create(&self, record: &ModelRecord) -> Result<()> {
        debug!("Creating model record: {}", record.id);

        let conn = self.lock()?;
        Self::insert(&conn, record)?;

        info!("Model record created: {} ({})", record.id, record.model_type);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ModelRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY seq;"))?;
        let rows = stmt
            .query_map([], StoredRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        let records = rows
            .into_iter()
            .map(StoredRow::decode)
            .collect::<Result<Vec<_>>>()?;

        debug!("Listed {} model records", records.len());
        Ok(records)
    }

    fn get(&self, id: &str) -> Result<ModelRecord> {
        debug!("Getting model record: {id}");

        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1;"),
                params![id],
                StoredRow::from_row,
            )
            .optional()?;
        drop(conn);

        match row {
            Some(row) => row.decode(),
            None => {
                debug!("Model record not found: {id}");
                Err(CatalogError::NotFound(id.to_string()))
            }
        }
    }

    fn delete(&self, id: &str) -> Result<()> {
        debug!("Deleting model record: {id}");

        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM ml_models WHERE id = ?1;", params![id])?;

        if deleted == 0 {
            warn!("Model record not found for deletion: {id}");
            return Err(CatalogError::NotFound(id.to_string()));
        }

        info!("Model record deleted: {id}");
        Ok(())
    }

    fn replace(&self, old_id: &str, record: &ModelRecord) -> Result<()> {
        debug!("Replacing model record {old_id} with {}", record.id);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let deleted = tx.execute("DELETE FROM ml_models WHERE id = ?1;", params![old_id])?;
        if deleted == 0 {
            warn!("Model record not found for replacement: {old_id}");
            return Err(CatalogError::NotFound(old_id.to_string()));
        }
        Self::insert(&tx, record)?;

        tx.commit()?;

        info!("Model record {old_id} replaced by {}", record.id);
        Ok(())
    }
}
