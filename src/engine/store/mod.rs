// TimeFlow Engine — Flow Store
// Persists activities, feedback rollups, pending inputs and the response
// cache in SQLite via rusqlite. The store is the only durable state the
// engine owns; everything else is recomputed on demand.
//
// Module layout:
//   activities     — activity CRUD, ongoing-activity handoff, today queries
//   pending        — pending-input queue rows (FIFO drain, audit trail)
//   response_cache — cached AI responses + usage stats + eviction
//   feedbacks      — daily/weekly rollup records
//
// Concurrency: one connection behind a parking_lot Mutex. The submission
// path and the drain loop are the only writers and both run on the same
// tokio runtime, so the mutex is contention-free in practice.

use crate::atoms::error::EngineResult;
use log::info;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

mod activities;
mod feedbacks;
mod pending;
mod response_cache;
mod schema;

/// Default on-disk location for the engine database.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("timeflow")
        .join("timeflow.db")
}

/// Thread-safe database wrapper.
pub struct FlowStore {
    /// The SQLite connection, protected by a Mutex.
    /// `pub` for tests that need to poke at rows directly.
    pub conn: Mutex<Connection>,
}

impl FlowStore {
    /// Open (or create) the engine database at `path` and run migrations.
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("[store] Opening flow store at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.execute_batch("PRAGMA foreign_keys=ON;").ok();

        schema::run_migrations(&conn)?;

        Ok(FlowStore { conn: Mutex::new(conn) })
    }

    /// Open the store at the default data-dir location.
    pub fn open_default() -> EngineResult<Self> {
        Self::open(&default_db_path())
    }

    /// Fully-migrated in-memory store. Used by tests and throwaway sessions.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(FlowStore { conn: Mutex::new(conn) })
    }
}
