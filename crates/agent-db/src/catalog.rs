//! SQLite-backed movie catalog.
//!
//! Every call opens its own connection and drops it when done. Reads open the
//! file read-only, so a missing catalog is reported as an error instead of
//! silently creating an empty database.

use crate::error::{Result, StoreError};
use crate::lookup::Lookup;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS movies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    json TEXT NOT NULL,
    name TEXT,
    actors TEXT,
    director TEXT,
    year INTEGER,
    genre TEXT
)
"#;

/// Handle to a single-file movie catalog.
#[derive(Debug, Clone)]
pub struct MovieCatalog {
    db_path: PathBuf,
}

impl MovieCatalog {
    /// Point at an existing catalog. Nothing is opened until the first query.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            db_path: path.as_ref().to_path_buf(),
        }
    }

    /// Create the catalog file (if needed) and ensure the schema exists.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path)?;
        conn.execute(SCHEMA, [])?;
        Ok(Self { db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Return every record whose searchable column matches `lookup`.
    ///
    /// No matches is `Ok(vec![])`. Rows holding malformed JSON are skipped.
    pub async fn find(&self, lookup: Lookup) -> Result<Vec<Value>> {
        let db_path = self.db_path.clone();
        debug!("Catalog lookup {} in {}", lookup, db_path.display());

        let rows = tokio::task::spawn_blocking(move || {
            let conn = Connection::open_with_flags(
                &db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            let mut stmt = conn.prepare(&lookup.sql())?;
            let rows = stmt
                .query_map([lookup.param()], |row| {
                    // Decoded per row in `parse_rows`.
                    Ok(match row.get_ref(0)? {
                        ValueRef::Text(bytes) => Some(bytes.to_vec()),
                        _ => None,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok::<_, StoreError>(rows)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))??;

        Ok(parse_rows(rows))
    }

    pub async fn by_actor(&self, actor: impl Into<String>) -> Result<Vec<Value>> {
        self.find(Lookup::Actor(actor.into())).await
    }

    pub async fn by_title(&self, title: impl Into<String>) -> Result<Vec<Value>> {
        self.find(Lookup::Title(title.into())).await
    }

    pub async fn by_director(&self, director: impl Into<String>) -> Result<Vec<Value>> {
        self.find(Lookup::Director(director.into())).await
    }

    pub async fn by_genre(&self, genre: impl Into<String>) -> Result<Vec<Value>> {
        self.find(Lookup::Genre(genre.into())).await
    }

    pub async fn by_year(&self, year: i64) -> Result<Vec<Value>> {
        self.find(Lookup::Year(year)).await
    }

    /// Insert a single movie record.
    pub async fn insert(&self, record: Value) -> Result<()> {
        self.import(vec![record]).await.map(|_| ())
    }

    /// Insert a batch of movie records in one transaction.
    ///
    /// Either every record is stored or none is.
    pub async fn import(&self, records: Vec<Value>) -> Result<usize> {
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&db_path)?;
            conn.execute(SCHEMA, [])?;
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO movies (json, name, actors, director, year, genre) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for (i, record) in records.iter().enumerate() {
                    let row = SearchColumns::from_record(record)
                        .map_err(|e| StoreError::InvalidRecord(format!("entry {}: {}", i, e)))?;
                    stmt.execute(params![
                        serde_json::to_string(record)?,
                        row.name,
                        row.actors,
                        row.director,
                        row.year,
                        row.genre,
                    ])?;
                }
            }
            tx.commit()?;
            Ok::<_, StoreError>(records.len())
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }

    /// Seed the catalog from a file holding a JSON array of movie objects.
    pub async fn import_json_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        let records: Vec<Value> = serde_json::from_str(&contents)?;
        self.import(records).await
    }
}

/// Decode stored JSON text. Non-text values, invalid UTF-8 and malformed JSON
/// are skipped.
fn parse_rows(rows: Vec<Option<Vec<u8>>>) -> Vec<Value> {
    rows.into_iter()
        .filter_map(|raw| {
            let Some(bytes) = raw else {
                warn!("Skipping catalog row whose json column is not text");
                return None;
            };
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Skipping catalog row with malformed JSON: {}", e);
                    None
                }
            }
        })
        .collect()
}

/// Denormalized search columns derived from a record.
struct SearchColumns {
    name: Option<String>,
    actors: Option<String>,
    director: Option<String>,
    year: Option<i64>,
    genre: Option<String>,
}

impl SearchColumns {
    fn from_record(record: &Value) -> std::result::Result<Self, String> {
        let obj = record
            .as_object()
            .ok_or_else(|| format!("expected a JSON object, got {}", record))?;

        let year = match obj.get("year") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        Ok(Self {
            name: obj.get("title").and_then(flatten_text),
            actors: obj.get("actors").and_then(flatten_text),
            director: obj.get("director").and_then(flatten_text),
            year,
            genre: obj.get("genre").and_then(flatten_text),
        })
    }
}

/// Strings stay as-is, arrays of strings are joined with ", ".
fn flatten_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}
