// Database schema and migrations for the TimeFlow engine store.
// Called once at open time by FlowStore::open()/open_in_memory().
// Adding a new table or column: append an idempotent CREATE TABLE IF NOT
// EXISTS or ALTER TABLE … ADD COLUMN at the end of run_migrations() — never
// modify existing SQL, to keep upgrade paths clean.

use crate::atoms::error::EngineResult;
use rusqlite::Connection;

pub(crate) fn run_migrations(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS activities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            summary TEXT,
            category TEXT,
            ai_response TEXT,
            response_source TEXT,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            duration_minutes INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_activities_started
            ON activities(started_at);
        CREATE INDEX IF NOT EXISTS idx_activities_category
            ON activities(category);

        CREATE TABLE IF NOT EXISTS pending_inputs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0,
            processed_at TEXT,
            result TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_pending_drain
            ON pending_inputs(processed, timestamp);

        CREATE TABLE IF NOT EXISTS response_cache (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            activity_pattern TEXT NOT NULL,
            category TEXT NOT NULL,
            response TEXT NOT NULL,
            usage_count INTEGER NOT NULL DEFAULT 1,
            last_used TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cache_category
            ON response_cache(category);
        CREATE INDEX IF NOT EXISTS idx_cache_last_used
            ON response_cache(last_used);

        CREATE TABLE IF NOT EXISTS feedbacks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            period TEXT NOT NULL,
            theme TEXT,
            score REAL,
            insights TEXT NOT NULL DEFAULT '[]',
            suggestion TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feedbacks_date
            ON feedbacks(date, period);
        ",
    )?;

    Ok(())
}
