//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Every named index lives in the same database file; entries are keyed by
//! `(index_name, id)`.

use super::{
    check_dimension, rank_entries, EntryMetadata, IndexEntry, IndexProvider, IndexSpec,
    RetrievalMatch, VectorIndex,
};
use crate::error::{Result, VidragError};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS indexes (
        name TEXT PRIMARY KEY,
        dimension INTEGER NOT NULL,
        metric TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS entries (
        index_name TEXT NOT NULL,
        id TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata_json TEXT NOT NULL,
        indexed_at TEXT NOT NULL,
        PRIMARY KEY (index_name, id)
    );
"#;

fn lock_error<E: std::fmt::Display>(e: E) -> VidragError {
    VidragError::VectorStore(format!("Failed to acquire lock: {}", e))
}

/// SQLite-backed index provider.
pub struct SqliteProvider {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProvider {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Serialize embedding to bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[async_trait]
impl IndexProvider for SqliteProvider {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().map_err(lock_error)?;
        let mut stmt = conn.prepare("SELECT name FROM indexes ORDER BY name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(names.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    #[instrument(skip(self))]
    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let conn = self.conn.lock().map_err(lock_error)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO indexes (name, dimension, metric, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                spec.name,
                spec.dimension as i64,
                spec.metric.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if inserted == 0 {
            return Err(VidragError::IndexProvisioning(format!(
                "Index '{}' already exists",
                spec.name
            )));
        }

        info!("Created index '{}'", spec.name);
        Ok(())
    }

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let conn = self.conn.lock().map_err(lock_error)?;
        let dimension = conn.query_row(
            "SELECT dimension FROM indexes WHERE name = ?1",
            params![name],
            |row| row.get::<_, i64>(0),
        );

        match dimension {
            Ok(dimension) => Ok(Arc::new(SqliteIndex {
                conn: self.conn.clone(),
                name: name.to_string(),
                dimension: dimension as usize,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(VidragError::IndexProvisioning(
                format!("Index '{}' not found", name),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

/// Handle on a single index inside the SQLite database.
pub struct SqliteIndex {
    conn: Arc<Mutex<Connection>>,
    name: String,
    dimension: usize,
}

impl SqliteIndex {
    fn load_entries(&self) -> Result<Vec<IndexEntry>> {
        let conn = self.conn.lock().map_err(lock_error)?;
        let mut stmt =
            conn.prepare("SELECT id, embedding, metadata_json FROM entries WHERE index_name = ?1")?;

        let rows = stmt.query_map(params![self.name], |row| {
            let id: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(1)?;
            let metadata_json: String = row.get(2)?;
            Ok((id, embedding_bytes, metadata_json))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, embedding_bytes, metadata_json) = row?;
            let metadata: EntryMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
                VidragError::VectorStore(format!("Corrupt metadata for entry {}: {}", id, e))
            })?;
            entries.push(IndexEntry {
                id,
                vector: bytes_to_embedding(&embedding_bytes),
                metadata,
            });
        }
        Ok(entries)
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, entries), fields(index = %self.name, count = entries.len()))]
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize> {
        for entry in entries {
            check_dimension(&self.name, self.dimension, &entry.vector)?;
        }

        let conn = self.conn.lock().map_err(lock_error)?;
        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for entry in entries {
            let metadata_json = serde_json::to_string(&entry.metadata)?;
            tx.execute(
                r#"
                INSERT OR REPLACE INTO entries (index_name, id, embedding, metadata_json, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    self.name,
                    entry.id,
                    embedding_to_bytes(&entry.vector),
                    metadata_json,
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        debug!("Upserted {} entries", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, vector), fields(index = %self.name))]
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievalMatch>> {
        check_dimension(&self.name, self.dimension, vector)?;
        let entries = self.load_entries()?;
        let matches = rank_entries(vector, &entries, top_k, include_metadata);
        debug!("Found {} matching entries", matches.len());
        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().map_err(lock_error)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE index_name = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
