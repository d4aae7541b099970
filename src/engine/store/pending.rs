use super::FlowStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::PendingInput;
use chrono::{DateTime, Duration, Utc};
use log::info;
use rusqlite::params;

impl PendingInput {
    /// Map a row with columns (id, text, timestamp, processed, processed_at,
    /// result) → PendingInput.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(PendingInput {
            id: row.get(0)?,
            text: row.get(1)?,
            timestamp: row.get(2)?,
            processed: row.get::<_, i64>(3)? != 0,
            processed_at: row.get(4)?,
            result: row.get(5)?,
        })
    }
}

const PENDING_COLS: &str = "id, text, timestamp, processed, processed_at, result";

impl FlowStore {
    // ── Pending-input queue rows ───────────────────────────────────────

    /// Queue an input for later classification. Returns the new row id.
    pub fn add_pending_input(&self, text: &str, timestamp: DateTime<Utc>) -> EngineResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO pending_inputs (text, timestamp, processed) VALUES (?1, ?2, 0)",
            params![text, timestamp],
        )?;
        let id = conn.last_insert_rowid();
        info!("[queue] Input queued (id={id}): {text}");
        Ok(id)
    }

    /// Number of inputs still waiting to be processed.
    pub fn pending_count(&self) -> EngineResult<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM pending_inputs WHERE processed = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// All unprocessed inputs, oldest first (FIFO drain order).
    pub fn pending_inputs(&self) -> EngineResult<Vec<PendingInput>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PENDING_COLS} FROM pending_inputs
             WHERE processed = 0 ORDER BY timestamp ASC, id ASC"
        ))?;
        let rows = stmt
            .query_map([], PendingInput::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The single next item to drain, if any.
    pub fn oldest_pending(&self) -> EngineResult<Option<PendingInput>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PENDING_COLS} FROM pending_inputs
             WHERE processed = 0 ORDER BY timestamp ASC, id ASC LIMIT 1"
        ))?;
        let mut rows = stmt.query_map([], PendingInput::from_row)?;
        Ok(rows.next().transpose()?)
    }

    /// Mark an input as drained, recording when and with what result.
    /// Only called after the item's side effects have been committed.
    pub fn mark_pending_processed(
        &self,
        id: i64,
        result: &str,
        processed_at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE pending_inputs SET processed = 1, processed_at = ?2, result = ?3
             WHERE id = ?1",
            params![id, processed_at, result],
        )?;
        Ok(())
    }

    /// Processed inputs kept as an audit trail, newest first.
    pub fn processed_inputs(&self, limit: u32) -> EngineResult<Vec<PendingInput>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PENDING_COLS} FROM pending_inputs
             WHERE processed = 1 ORDER BY processed_at DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit], PendingInput::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Drop audit rows older than `days`. Unprocessed items are never
    /// touched — a failing item stays queued indefinitely.
    pub fn evict_processed_older_than(&self, days: i64) -> EngineResult<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM pending_inputs WHERE processed = 1 AND processed_at < ?1",
            params![cutoff],
        )?;
        if deleted > 0 {
            info!("[queue] Evicted {deleted} processed inputs older than {days} days");
        }
        Ok(deleted)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
