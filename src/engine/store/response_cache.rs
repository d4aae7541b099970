use super::FlowStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::ResponseCacheEntry;
use chrono::{Duration, Utc};
use log::info;
use rusqlite::params;

impl ResponseCacheEntry {
    /// Map a row with columns (id, activity_pattern, category, response,
    /// usage_count, last_used, created_at) → ResponseCacheEntry.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(ResponseCacheEntry {
            id: row.get(0)?,
            activity_pattern: row.get(1)?,
            category: row.get(2)?,
            response: row.get(3)?,
            usage_count: row.get(4)?,
            last_used: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

const CACHE_COLS: &str =
    "id, activity_pattern, category, response, usage_count, last_used, created_at";

impl FlowStore {
    // ── Response cache ─────────────────────────────────────────────────

    /// All cached responses for a category, insertion order.
    /// Similarity ranking happens at the call site (nlp::find_best_match);
    /// the store only narrows by category.
    pub fn cached_responses(&self, category: &str) -> EngineResult<Vec<ResponseCacheEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CACHE_COLS} FROM response_cache WHERE category = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![category], ResponseCacheEntry::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Record a reuse of a cached response: bump the usage counter and
    /// refresh the recency timestamp. Nothing else on an entry ever mutates.
    pub fn record_cache_hit(&self, id: i64) -> EngineResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE response_cache SET usage_count = usage_count + 1, last_used = ?2
             WHERE id = ?1",
            params![id, Utc::now()],
        )?;
        Ok(())
    }

    /// Store a freshly produced AI response under its normalized pattern.
    /// No write-time deduplication: near-duplicate patterns accumulate as
    /// separate rows and are only merged implicitly by the read-side
    /// similarity lookup.
    pub fn insert_cached_response(
        &self,
        pattern: &str,
        category: &str,
        response: &str,
    ) -> EngineResult<i64> {
        let now = Utc::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO response_cache (activity_pattern, category, response,
                                         usage_count, last_used, created_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)",
            params![pattern, category, response, now],
        )?;
        let id = conn.last_insert_rowid();
        info!("[cache] Cached response for pattern \"{pattern}\" ({category})");
        Ok(id)
    }

    /// Delete entries whose last use predates the cutoff. Returns how many
    /// rows were removed. This time-based pass is the only eviction policy —
    /// there is no size cap.
    pub fn evict_cache_older_than(&self, days: i64) -> EngineResult<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM response_cache WHERE last_used < ?1",
            params![cutoff],
        )?;
        if deleted > 0 {
            info!("[cache] Evicted {deleted} responses unused for {days}+ days");
        }
        Ok(deleted)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FlowStore {
        FlowStore::open_in_memory().expect("in-memory store")
    }

    #[test]
    fn insert_starts_usage_at_one_and_hit_increments() {
        let store = store();
        let id = store
            .insert_cached_response("lavar louca", "🏠 Casa", "Casa organizada! 🏡")
            .unwrap();

        let entries = store.cached_responses("🏠 Casa").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].usage_count, 1);

        store.record_cache_hit(id).unwrap();
        let entries = store.cached_responses("🏠 Casa").unwrap();
        assert_eq!(entries[0].usage_count, 2);
    }

    #[test]
    fn lookup_is_scoped_to_category() {
        let store = store();
        store
            .insert_cached_response("lavar louca", "🏠 Casa", "Casa organizada! 🏡")
            .unwrap();
        store
            .insert_cached_response("revisar codigo", "💼 Trabalho", "Foco total! 💪")
            .unwrap();

        assert_eq!(store.cached_responses("🏠 Casa").unwrap().len(), 1);
        assert_eq!(store.cached_responses("🎮 Lazer").unwrap().len(), 0);
    }

    #[test]
    fn near_duplicate_patterns_accumulate() {
        // Write-side dedup is deliberately absent; two nearly identical
        // patterns coexist as separate rows.
        let store = store();
        store
            .insert_cached_response("limpar cozinha", "🏠 Casa", "Limpeza feita! 🧹")
            .unwrap();
        store
            .insert_cached_response("limpar cozinha toda", "🏠 Casa", "Organização top! 📦")
            .unwrap();

        assert_eq!(store.cached_responses("🏠 Casa").unwrap().len(), 2);
    }

    #[test]
    fn eviction_removes_only_stale_entries() {
        let store = store();
        let stale = store
            .insert_cached_response("padrao velho", "🏠 Casa", "…")
            .unwrap();
        store
            .insert_cached_response("padrao novo", "🏠 Casa", "…")
            .unwrap();

        store
            .conn
            .lock()
            .execute(
                "UPDATE response_cache SET last_used = ?2 WHERE id = ?1",
                params![stale, Utc::now() - Duration::days(40)],
            )
            .unwrap();

        assert_eq!(store.evict_cache_older_than(30).unwrap(), 1);
        let remaining = store.cached_responses("🏠 Casa").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].activity_pattern, "padrao novo");
    }
}
