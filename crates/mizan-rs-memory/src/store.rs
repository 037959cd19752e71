//! SQLite-backed record store.
//!
//! One `memories` table, indexed on `category` and `timestamp`. Tags and
//! embeddings are stored as JSON text. Every call is individually atomic;
//! nothing spans calls.

use crate::error::MemoryError;
use crate::model::{ListOptions, MemoryCategory, MemoryRecord};
use log::{debug, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    category TEXT NOT NULL,
    tags TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    importance REAL NOT NULL,
    embedding TEXT NOT NULL,
    lastAccessed INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);
CREATE INDEX IF NOT EXISTS idx_memories_timestamp ON memories(timestamp);
";

const COLUMNS: &str = "id, content, category, tags, timestamp, importance, embedding, lastAccessed";

/// Persistent table of memory records.
#[derive(Debug)]
pub struct MemoryStore {
    conn: Connection,
    path: PathBuf,
}

impl MemoryStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        let store = Self::init(conn, path)?;
        info!(
            "opened memory store (path={}, journal_mode={mode})",
            store.path.display()
        );
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, MemoryError> {
        Self::init(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self, MemoryError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, path })
    }

    /// Location of the database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new record; an existing id fails with `DuplicateId`.
    pub fn add_memory(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let sql = format!("INSERT INTO memories ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)");
        let result = self.conn.execute(&sql, params_from_iter(params_for(record)?));
        match result {
            Ok(_) => {
                debug!(
                    "stored memory record (id={}, category={})",
                    record.id, record.category
                );
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(MemoryError::DuplicateId(record.id.clone()))
            }
            Err(err) => Err(MemoryError::Storage(err)),
        }
    }

    /// Insert or fully replace a record by id. Used by log replay.
    pub fn upsert_memory(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let sql = format!(
            "INSERT INTO memories ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                category = excluded.category,
                tags = excluded.tags,
                timestamp = excluded.timestamp,
                importance = excluded.importance,
                embedding = excluded.embedding,
                lastAccessed = excluded.lastAccessed"
        );
        self.conn.execute(&sql, params_from_iter(params_for(record)?))?;
        debug!("upserted memory record (id={})", record.id);
        Ok(())
    }

    /// Fetch a record by id.
    pub fn get_memory(&self, id: &str) -> Result<Option<MemoryRecord>, MemoryError> {
        let sql = format!("SELECT {COLUMNS} FROM memories WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(record_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Delete a record; true iff a row was removed.
    pub fn delete_memory(&self, id: &str) -> Result<bool, MemoryError> {
        let changed = self
            .conn
            .execute("DELETE FROM memories WHERE id = ?1", params![id])?;
        debug!("deleted memory record (id={id}, removed={})", changed > 0);
        Ok(changed > 0)
    }

    /// List records matching `options`, newest first.
    ///
    /// Tag filtering runs before `offset`/`limit`, so a page never comes back
    /// short while further tag matches exist.
    pub fn list_memories(&self, options: &ListOptions) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut clauses = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();
        if let Some(category) = options.category {
            values.push(SqlValue::Text(category.as_str().to_string()));
            clauses.push(format!("category = ?{}", values.len()));
        }
        if let Some(since) = options.since {
            values.push(SqlValue::Integer(since));
            clauses.push(format!("timestamp >= ?{}", values.len()));
        }
        if let Some(until) = options.until {
            values.push(SqlValue::Integer(until));
            clauses.push(format!("timestamp <= ?{}", values.len()));
        }

        let mut sql = format!("SELECT {COLUMNS} FROM memories");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp DESC, id ASC");

        let filter_tags = !options.tags.is_empty();
        if !filter_tags && (options.limit.is_some() || options.offset.is_some()) {
            let limit = options.limit.map_or(-1, |limit| sql_count(limit));
            values.push(SqlValue::Integer(limit));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
            values.push(SqlValue::Integer(sql_count(options.offset.unwrap_or(0))));
            sql.push_str(&format!(" OFFSET ?{}", values.len()));
        }

        let records = self.query_records(&sql, values)?;
        if !filter_tags {
            return Ok(records);
        }
        let matching = records
            .into_iter()
            .filter(|record| record.has_all_tags(&options.tags))
            .skip(options.offset.unwrap_or(0));
        Ok(match options.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    /// Full table scan in storage order.
    pub fn get_all_memories(&self) -> Result<Vec<MemoryRecord>, MemoryError> {
        let sql = format!("SELECT {COLUMNS} FROM memories ORDER BY rowid");
        self.query_records(&sql, Vec::new())
    }

    /// Set `lastAccessed`; no-op for unknown ids.
    pub fn update_access(&self, id: &str, accessed_at: i64) -> Result<(), MemoryError> {
        self.conn.execute(
            "UPDATE memories SET lastAccessed = ?1 WHERE id = ?2",
            params![accessed_at, id],
        )?;
        Ok(())
    }

    /// Set `importance`; no-op for unknown ids.
    pub fn update_importance(&self, id: &str, importance: f64) -> Result<(), MemoryError> {
        self.conn.execute(
            "UPDATE memories SET importance = ?1 WHERE id = ?2",
            params![importance, id],
        )?;
        Ok(())
    }

    /// Delete records with `importance < threshold` AND `timestamp < older_than`.
    pub fn prune_below_importance(
        &self,
        threshold: f64,
        older_than: i64,
    ) -> Result<usize, MemoryError> {
        let removed = self.conn.execute(
            "DELETE FROM memories WHERE importance < ?1 AND timestamp < ?2",
            params![threshold, older_than],
        )?;
        debug!("pruned memory records (threshold={threshold}, older_than={older_than}, removed={removed})");
        Ok(removed)
    }

    /// Length of the embedding on the oldest stored row, if any.
    pub fn embedding_dimensions(&self) -> Result<Option<usize>, MemoryError> {
        let embedding: Option<String> = self
            .conn
            .query_row(
                "SELECT embedding FROM memories ORDER BY rowid LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match embedding {
            Some(embedding) => Ok(Some(serde_json::from_str::<Vec<f32>>(&embedding)?.len())),
            None => Ok(None),
        }
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize, MemoryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Close the connection, surfacing any close error.
    pub fn close(self) -> Result<(), MemoryError> {
        self.conn.close().map_err(|(_, err)| MemoryError::Storage(err))
    }

    fn query_records(
        &self,
        sql: &str,
        values: Vec<SqlValue>,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(record_from_row(row)?);
        }
        Ok(records)
    }
}

fn sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn params_for(record: &MemoryRecord) -> Result<[SqlValue; 8], MemoryError> {
    Ok([
        SqlValue::Text(record.id.clone()),
        SqlValue::Text(record.content.clone()),
        SqlValue::Text(record.category.as_str().to_string()),
        SqlValue::Text(serde_json::to_string(&record.tags)?),
        SqlValue::Integer(record.timestamp),
        SqlValue::Real(record.importance),
        SqlValue::Text(serde_json::to_string(&record.embedding)?),
        SqlValue::Integer(record.last_accessed),
    ])
}

fn record_from_row(row: &Row<'_>) -> Result<MemoryRecord, MemoryError> {
    let category: String = row.get(2)?;
    let tags: String = row.get(3)?;
    let embedding: String = row.get(6)?;
    Ok(MemoryRecord {
        id: row.get(0)?,
        content: row.get(1)?,
        category: category
            .parse::<MemoryCategory>()
            .map_err(|err| {
                MemoryError::Storage(rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(err),
                ))
            })?,
        tags: serde_json::from_str(&tags)?,
        timestamp: row.get(4)?,
        importance: row.get(5)?,
        embedding: serde_json::from_str(&embedding)?,
        last_accessed: row.get(7)?,
    })
}
