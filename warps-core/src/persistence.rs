//! Persistence backends for the warp registry.
//!
//! The registry talks to storage only through [`WarpStore`]: read every row,
//! or replace every row. Stores hand back raw [`StoredWarp`] rows so the
//! registry decides which ones are usable; a single bad row never fails a
//! load.
//!
//! Two backends:
//!
//! - [`SqliteWarpStore`]: one table, WAL mode, online backups
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS warp_signs (
//!     world      TEXT NOT NULL,
//!     owner      TEXT NOT NULL,
//!     x          INTEGER NOT NULL,
//!     y          INTEGER NOT NULL,
//!     z          INTEGER NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     PRIMARY KEY (world, owner)
//! );
//! ```
//!
//! - [`JsonWarpStore`]: a per-world list, handy for hand editing:
//!
//! ```json
//! { "version": 1, "worlds": { "oneblock": [ { "owner": "…", "x": 1, "y": 64, "z": 0 } ] } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{PersistenceConfig, StoreBackend};
use crate::error::{Result, WarpsError};
use crate::types::{BlockLocation, PlayerId, WorldId};

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// A persisted warp row, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWarp {
    /// World name as stored.
    pub world: String,
    /// Owner id as stored; may not be a valid UUID.
    pub owner: String,
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl StoredWarp {
    /// Build a row from a registry entry.
    #[must_use]
    pub fn from_parts(owner: PlayerId, location: &BlockLocation) -> Self {
        Self {
            world: location.world.name().to_string(),
            owner: owner.to_string(),
            x: location.x,
            y: location.y,
            z: location.z,
        }
    }

    /// The block this row points at.
    #[must_use]
    pub fn location(&self) -> BlockLocation {
        BlockLocation::new(WorldId::new(self.world.clone()), self.x, self.y, self.z)
    }
}

/// Durable storage for warp rows.
pub trait WarpStore: Send + Sync {
    /// Read every stored row.
    ///
    /// Rows that cannot be decoded are skipped by the store itself.
    ///
    /// # Errors
    /// Returns an error only if the store cannot be read at all.
    fn load_all(&self) -> Result<Vec<StoredWarp>>;

    /// Replace the stored rows with `records`.
    ///
    /// # Errors
    /// Returns an error if the write did not complete; the previous contents
    /// are then still in place.
    fn save_all(&self, records: &[StoredWarp]) -> Result<()>;

    /// Take a rotating backup of the store, if it supports one.
    ///
    /// # Errors
    /// Returns an error if the backup could not be written.
    fn backup(&self) -> Result<()> {
        Ok(())
    }

    /// Short description for log lines, e.g. `sqlite:warps.db`.
    fn describe(&self) -> String;
}

/// Open the store selected by `config.backend`.
///
/// # Errors
/// Returns [`WarpsError::Config`] for an unknown backend, or the backend's
/// open error.
pub fn open_store(config: &PersistenceConfig) -> Result<Box<dyn WarpStore>> {
    match StoreBackend::from_name(&config.backend) {
        Some(StoreBackend::Sqlite) => Ok(Box::new(SqliteWarpStore::open(&config.path, config)?)),
        Some(StoreBackend::Json) => {
            Ok(Box::new(JsonWarpStore::new(&config.path, config.backup_count)))
        }
        None => Err(WarpsError::Config(format!(
            "unknown persistence backend \"{}\"",
            config.backend
        ))),
    }
}

// ---------------------------------------------------------------------------
// Backup rotation
// ---------------------------------------------------------------------------

/// Path to a numbered backup file: `warps.db` gives `warps.db.bak.1`,
/// `warps` gives `warps.bak.1`.
fn backup_path(path: &Path, n: u32) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(format!(".bak.{n}"));
    PathBuf::from(p)
}

/// Shift `path.bak.1..max` up by one, drop the oldest, then call `write`
/// to produce a fresh `path.bak.1`.
fn rotate_backups<F>(path: &Path, max: u32, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    if max == 0 {
        return Ok(());
    }

    // Highest first so nothing is overwritten.
    for i in (1..max).rev() {
        let src = backup_path(path, i);
        let dst = backup_path(path, i + 1);
        if src.exists() {
            std::fs::rename(&src, &dst)?;
        }
    }

    let oldest = backup_path(path, max + 1);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }

    write(&backup_path(path, 1))?;
    info!(path = %path.display(), max_backups = max, "Rotating backup created");
    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteWarpStore
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS warp_signs (
    world      TEXT NOT NULL,
    owner      TEXT NOT NULL,
    x          INTEGER NOT NULL,
    y          INTEGER NOT NULL,
    z          INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (world, owner)
);";

/// Handle to an open `SQLite` database holding warp rows.
///
/// # Usage
///
/// ```no_run
/// # use warps_core::persistence::{SqliteWarpStore, WarpStore};
/// # use warps_core::config::PersistenceConfig;
/// let store = SqliteWarpStore::open("warps.db", &PersistenceConfig::default())?;
/// let rows = store.load_all()?;
/// store.save_all(&rows)?;
/// # Ok::<(), warps_core::error::WarpsError>(())
/// ```
pub struct SqliteWarpStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    backup_count: u32,
}

impl std::fmt::Debug for SqliteWarpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteWarpStore")
            .field("db_path", &self.db_path)
            .field("backup_count", &self.backup_count)
            .finish_non_exhaustive()
    }
}

impl SqliteWarpStore {
    /// Open (or create) a database at `path`.
    ///
    /// The schema is created if missing. WAL mode is enabled when
    /// `config.wal_mode` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`WarpsError::Database`] on `SQLite` failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            backup_count: config.backup_count,
        };
        if !store.integrity_check()? {
            warn!(path = %store.db_path.display(), "Warp store failed its integrity check");
        }

        info!(
            path = %store.db_path.display(),
            wal = config.wal_mode,
            "Warp store opened"
        );
        Ok(store)
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`WarpsError::Database`] on `SQLite` failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
            backup_count: 0,
        })
    }

    /// Number of stored rows.
    ///
    /// # Errors
    ///
    /// Returns [`WarpsError::Database`] on `SQLite` failures.
    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM warp_signs", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Copy the database to `dest_path` with `SQLite`'s online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`WarpsError::Database`] on `SQLite` failures.
    pub fn backup_to<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let conn = self.conn.lock();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Warp store backup completed"
        );
        Ok(())
    }

    /// Run `PRAGMA integrity_check`.
    ///
    /// # Errors
    ///
    /// Returns [`WarpsError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .lock()
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

impl WarpStore for SqliteWarpStore {
    fn load_all(&self) -> Result<Vec<StoredWarp>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached("SELECT world, owner, x, y, z FROM warp_signs ORDER BY rowid")?;

        let rows = stmt.query_map([], |row| {
            Ok(StoredWarp {
                world: row.get(0)?,
                owner: row.get(1)?,
                x: row.get(2)?,
                y: row.get(3)?,
                z: row.get(4)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            match row {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "Skipping undecodable warp row"),
            }
        }
        debug!(rows = records.len(), "Read warp rows");
        Ok(records)
    }

    fn save_all(&self, records: &[StoredWarp]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM warp_signs", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO warp_signs (world, owner, x, y, z, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(world, owner) DO UPDATE SET
                    x = excluded.x,
                    y = excluded.y,
                    z = excluded.z,
                    updated_at = excluded.updated_at",
            )?;
            for r in records {
                stmt.execute(params![r.world, r.owner, r.x, r.y, r.z, now])?;
            }
        }
        tx.commit()?;
        debug!(rows = records.len(), "Wrote warp rows");
        Ok(())
    }

    fn backup(&self) -> Result<()> {
        if self.db_path.as_os_str() == ":memory:" {
            return Ok(());
        }
        rotate_backups(&self.db_path, self.backup_count, |dest| self.backup_to(dest))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.db_path.display())
    }
}

// ---------------------------------------------------------------------------
// JsonWarpStore
// ---------------------------------------------------------------------------

const JSON_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct WarpFile {
    #[serde(default)]
    version: u32,
    /// Rows stay as raw values so one bad entry does not fail the file.
    #[serde(default)]
    worlds: BTreeMap<String, Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonWarp {
    owner: String,
    x: i32,
    y: i32,
    z: i32,
}

/// Warp rows in a JSON file, grouped by world.
#[derive(Debug, Clone)]
pub struct JsonWarpStore {
    path: PathBuf,
    backup_count: u32,
}

impl JsonWarpStore {
    /// Store backed by the file at `path`. The file is created on first save.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P, backup_count: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            backup_count,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".tmp");
        PathBuf::from(p)
    }
}

impl WarpStore for JsonWarpStore {
    fn load_all(&self) -> Result<Vec<StoredWarp>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No warp file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let file: WarpFile = serde_json::from_slice(&bytes)?;
        if file.version > JSON_FORMAT_VERSION {
            warn!(
                version = file.version,
                supported = JSON_FORMAT_VERSION,
                "Warp file written by a newer version"
            );
        }

        let mut records = Vec::new();
        for (world, entries) in file.worlds {
            for value in entries {
                match serde_json::from_value::<JsonWarp>(value) {
                    Ok(w) => records.push(StoredWarp {
                        world: world.clone(),
                        owner: w.owner,
                        x: w.x,
                        y: w.y,
                        z: w.z,
                    }),
                    Err(e) => warn!(world = %world, error = %e, "Skipping undecodable warp entry"),
                }
            }
        }
        Ok(records)
    }

    fn save_all(&self, records: &[StoredWarp]) -> Result<()> {
        let mut file = WarpFile {
            version: JSON_FORMAT_VERSION,
            worlds: BTreeMap::new(),
        };
        for r in records {
            let entry = serde_json::to_value(JsonWarp {
                owner: r.owner.clone(),
                x: r.x,
                y: r.y,
                z: r.z,
            })?;
            file.worlds.entry(r.world.clone()).or_default().push(entry);
        }

        let json = serde_json::to_vec_pretty(&file)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(rows = records.len(), bytes = json.len(), "Wrote warp file");
        Ok(())
    }

    fn backup(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        rotate_backups(&self.path, self.backup_count, |dest| {
            std::fs::copy(&self.path, dest)?;
            Ok(())
        })
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
