use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dedup_common::{DedupError, DedupResult, ErrorContext, FileInfo};
use log::{trace, warn};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::row::{FileRow, MediaSummary};
use crate::schema::{CREATE_INDEXES, CREATE_TABLE};

/// The `files` table, guarded by a single connection.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so all access (reads
/// included) is serialized behind one [`parking_lot::Mutex`] rather than
/// pooled. SQLite under WAL journaling would happily serve concurrent
/// readers from separate connections, but a manual connection pool is
/// more machinery than this scope needs; documented as a deliberate
/// simplicity/throughput tradeoff (see DESIGN.md).
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if absent) the store at `path`, enabling WAL
    /// journaling and creating the `files` table and its indexes if they
    /// don't already exist.
    pub fn open(path: impl AsRef<Path>) -> DedupResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DedupError::filesystem(format!("failed to create store directory: {e}"))
                    .with_context(ctx(path, "open"))
                    .with_source(e)
            })?;
        }

        let conn = Connection::open(path).map_err(|e| db_err(e, "open", path))?;
        conn.pragma_update(None, "journal_mode", "WAL").map_err(|e| db_err(e, "set_journal_mode", path))?;
        conn.execute(CREATE_TABLE, []).map_err(|e| db_err(e, "create_table", path))?;
        for stmt in CREATE_INDEXES {
            conn.execute(stmt, []).map_err(|e| db_err(e, "create_index", path))?;
        }

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory store, used by tests that don't need a file on
    /// disk.
    pub fn open_in_memory() -> DedupResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| db_err(e, "open_in_memory", Path::new(":memory:")))?;
        conn.execute(CREATE_TABLE, []).map_err(|e| db_err(e, "create_table", Path::new(":memory:")))?;
        for stmt in CREATE_INDEXES {
            conn.execute(stmt, []).map_err(|e| db_err(e, "create_index", Path::new(":memory:")))?;
        }
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Replaces `path`'s row atomically (single `INSERT OR REPLACE`).
    /// Must be durable (synchronously committed) before the caller's
    /// dedup stage begins; this connection runs with SQLite's default
    /// (non-deferred) commit behavior, so a successful return already
    /// implies that.
    pub fn upsert(&self, info: &FileInfo) -> DedupResult<()> {
        let row = FileRow::from(info);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO files (
                path, content_hash, size, created_at, modified_at,
                width, height, gps_lat, gps_lon, camera_model, image_date,
                media_duration, p_hash, lsh1, lsh2, lsh3, lsh4
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                path_key(&row.path),
                row.content_hash_hex,
                row.size,
                row.created_at_millis,
                row.modified_at_millis,
                row.width,
                row.height,
                row.gps_lat,
                row.gps_lon,
                row.camera_model,
                row.image_date,
                row.media_duration,
                row.p_hash_hex,
                row.lsh1,
                row.lsh2,
                row.lsh3,
                row.lsh4,
            ],
        )
        .map_err(|e| db_err(e, "upsert", &row.path))?;
        trace!(target: "metadata_store_write", "upserted {}", row.path.display());
        Ok(())
    }

    /// Point lookup by primary key.
    pub fn get(&self, path: &Path) -> DedupResult<Option<FileRow>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM files WHERE path = ?1", params![path_key(path)], row_from_sql)
            .optional()
            .map_err(|e| db_err(e, "get", path))
    }

    /// Batched point lookup.
    pub fn get_many(&self, paths: &[PathBuf]) -> DedupResult<HashMap<PathBuf, FileRow>> {
        let conn = self.conn.lock();
        let mut out = HashMap::with_capacity(paths.len());
        let mut stmt = conn
            .prepare("SELECT * FROM files WHERE path = ?1")
            .map_err(|e| db_err(e, "get_many_prepare", Path::new("")))?;
        for path in paths {
            if let Some(row) = stmt
                .query_row(params![path_key(path)], row_from_sql)
                .optional()
                .map_err(|e| db_err(e, "get_many", path))?
            {
                out.insert(path.clone(), row);
            }
        }
        Ok(out)
    }

    /// The thin `{p_hash, duration}` projection the duplicate detector
    /// uses for similarity verification, batched over `paths`.
    pub fn media_info_for(&self, paths: &[PathBuf]) -> DedupResult<HashMap<PathBuf, MediaSummary>> {
        let conn = self.conn.lock();
        let mut out = HashMap::with_capacity(paths.len());
        let mut stmt = conn
            .prepare("SELECT p_hash, media_duration FROM files WHERE path = ?1")
            .map_err(|e| db_err(e, "media_info_for_prepare", Path::new("")))?;
        for path in paths {
            let found = stmt
                .query_row(params![path_key(path)], |r| {
                    Ok(MediaSummary {
                        p_hash_hex: r.get(0)?,
                        duration: r.get(1)?,
                    })
                })
                .optional()
                .map_err(|e| db_err(e, "media_info_for", path))?;
            if let Some(summary) = found {
                out.insert(path.clone(), summary);
            }
        }
        Ok(out)
    }

    /// Every row sharing an exact pHash hex string (the Stage A exact
    /// duplicate group).
    pub fn find_by_p_hash(&self, hex: &str) -> DedupResult<Vec<FileRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT * FROM files WHERE p_hash = ?1")
            .map_err(|e| db_err(e, "find_by_p_hash_prepare", Path::new("")))?;
        let rows = stmt
            .query_map(params![hex], row_from_sql)
            .map_err(|e| db_err(e, "find_by_p_hash", Path::new("")))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|e| db_err(e, "find_by_p_hash", Path::new("")))
    }

    /// Distinct paths where any of `lsh1..lsh4` equals the corresponding
    /// non-null band, excluding `exclude_path`. Null bands are not
    /// probed, matching the spec's "null bands are not probed" rule —
    /// a `NULL = NULL` comparison in SQL is itself always false, so this
    /// would already hold even without the explicit filter, but the
    /// filter keeps the generated SQL free of dead clauses.
    pub fn find_lsh_candidates(&self, exclude_path: &Path, bands: &[Option<String>; 4]) -> DedupResult<Vec<PathBuf>> {
        let present: Vec<(&str, &str)> = [("lsh1", bands[0].as_deref()), ("lsh2", bands[1].as_deref()), ("lsh3", bands[2].as_deref()), ("lsh4", bands[3].as_deref())]
            .into_iter()
            .filter_map(|(col, band)| band.map(|b| (col, b)))
            .collect();

        if present.is_empty() {
            return Ok(Vec::new());
        }

        let clause = present.iter().enumerate().map(|(i, (col, _))| format!("{col} = ?{}", i + 2)).collect::<Vec<_>>().join(" OR ");
        let sql = format!("SELECT DISTINCT path FROM files WHERE path != ?1 AND ({clause})");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(|e| db_err(e, "find_lsh_candidates_prepare", exclude_path))?;

        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(path_key(exclude_path))];
        for (_, band) in &present {
            bound.push(Box::new((*band).to_string()));
        }
        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |r| r.get::<_, String>(0))
            .map_err(|e| db_err(e, "find_lsh_candidates", exclude_path))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(PathBuf::from(row.map_err(|e| db_err(e, "find_lsh_candidates", exclude_path))?));
        }
        trace!(target: "metadata_store_search", "{} LSH candidate(s) for {}", out.len(), exclude_path.display());
        Ok(out)
    }

    /// Runs `PRAGMA wal_checkpoint`, folding the write-ahead log back
    /// into the main database file. Ambient store hygiene, mirroring the
    /// teacher's backup-before-overwrite discipline in its own cache
    /// layer; not required for correctness.
    pub fn checkpoint(&self) -> DedupResult<()> {
        let conn = self.conn.lock();
        conn.pragma_query(None, "wal_checkpoint", |_| Ok(())).map_err(|e| db_err(e, "checkpoint", Path::new("")))?;
        Ok(())
    }

    /// Runs SQLite's own `PRAGMA integrity_check`, returning `Ok(true)`
    /// when the database reports no corruption.
    pub fn integrity_check(&self) -> DedupResult<bool> {
        let conn = self.conn.lock();
        let result: String = conn.pragma_query_value(None, "integrity_check", |r| r.get(0)).map_err(|e| db_err(e, "integrity_check", Path::new("")))?;
        let ok = result == "ok";
        if !ok {
            warn!(target: "metadata_store_health", "integrity_check reported: {result}");
        }
        Ok(ok)
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn row_from_sql(r: &Row) -> rusqlite::Result<FileRow> {
    Ok(FileRow {
        path: PathBuf::from(r.get::<_, String>("path")?),
        content_hash_hex: r.get("content_hash")?,
        size: r.get("size")?,
        created_at_millis: r.get("created_at")?,
        modified_at_millis: r.get("modified_at")?,
        width: r.get("width")?,
        height: r.get("height")?,
        gps_lat: r.get("gps_lat")?,
        gps_lon: r.get("gps_lon")?,
        camera_model: r.get("camera_model")?,
        image_date: r.get("image_date")?,
        media_duration: r.get("media_duration")?,
        p_hash_hex: r.get("p_hash")?,
        lsh1: r.get("lsh1")?,
        lsh2: r.get("lsh2")?,
        lsh3: r.get("lsh3")?,
        lsh4: r.get("lsh4")?,
    })
}

fn db_err(e: rusqlite::Error, op: &str, path: &Path) -> DedupError {
    DedupError::database(format!("{op} failed: {e}")).with_context(ctx(path, op)).with_source(e)
}

fn ctx(path: &Path, op: &str) -> ErrorContext {
    ErrorContext::new().with_path(path).with_operation(op)
}
