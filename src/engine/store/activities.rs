use super::FlowStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Activity, ResponseSource};
use chrono::{DateTime, NaiveTime, Utc};
use log::info;
use rusqlite::params;

fn source_from_str(s: &str) -> Option<ResponseSource> {
    match s {
        "ai" => Some(ResponseSource::Ai),
        "cache" => Some(ResponseSource::Cache),
        "template" => Some(ResponseSource::Template),
        _ => None,
    }
}

impl Activity {
    /// Map a row with columns (id, title, summary, category, ai_response,
    /// response_source, started_at, ended_at, duration_minutes) → Activity.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let source: Option<String> = row.get(5)?;
        Ok(Activity {
            id: row.get(0)?,
            title: row.get(1)?,
            summary: row.get(2)?,
            category: row.get(3)?,
            ai_response: row.get(4)?,
            response_source: source.as_deref().and_then(source_from_str),
            started_at: row.get(6)?,
            ended_at: row.get(7)?,
            duration_minutes: row.get(8)?,
        })
    }
}

const ACTIVITY_COLS: &str =
    "id, title, summary, category, ai_response, response_source, started_at, ended_at, duration_minutes";

/// UTC midnight of the day containing `now`.
pub(crate) fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

impl FlowStore {
    // ── Activity CRUD ──────────────────────────────────────────────────

    /// Insert an activity row and return its id.
    pub fn add_activity(&self, activity: &Activity) -> EngineResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO activities (title, summary, category, ai_response, response_source,
                                     started_at, ended_at, duration_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                activity.title,
                activity.summary,
                activity.category,
                activity.ai_response,
                activity.response_source.map(|s| s.as_str()),
                activity.started_at,
                activity.ended_at,
                activity.duration_minutes,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fetch a single activity by id.
    pub fn activity(&self, id: i64) -> EngineResult<Option<Activity>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTIVITY_COLS} FROM activities WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id], Activity::from_row)?;
        Ok(rows.next().transpose()?)
    }

    /// The activity still running (no end timestamp), newest first.
    pub fn ongoing_activity(&self) -> EngineResult<Option<Activity>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTIVITY_COLS} FROM activities
             WHERE ended_at IS NULL ORDER BY started_at DESC LIMIT 1"
        ))?;
        let mut rows = stmt.query_map([], Activity::from_row)?;
        Ok(rows.next().transpose()?)
    }

    /// Close an activity, computing its duration from the stored start time.
    /// Returns the updated row, or None if the id is unknown.
    pub fn end_activity(
        &self,
        id: i64,
        ended_at: DateTime<Utc>,
    ) -> EngineResult<Option<Activity>> {
        let Some(mut activity) = self.activity(id)? else {
            return Ok(None);
        };

        let duration_minutes =
            (ended_at - activity.started_at).num_seconds().max(0) / 60;

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE activities SET ended_at = ?2, duration_minutes = ?3 WHERE id = ?1",
            params![id, ended_at, duration_minutes],
        )?;
        drop(conn);

        activity.ended_at = Some(ended_at);
        activity.duration_minutes = Some(duration_minutes);
        Ok(Some(activity))
    }

    /// Register a new activity, closing the ongoing one first.
    ///
    /// The ongoing activity is only closed when it started today — an open
    /// activity left over from an imported earlier day is left untouched.
    /// Returns the new row id and the previous activity (with its freshly
    /// computed duration) when one was closed.
    pub fn start_new_activity(
        &self,
        activity: &Activity,
        now: DateTime<Utc>,
    ) -> EngineResult<(i64, Option<Activity>)> {
        let mut previous = None;

        if let Some(ongoing) = self.ongoing_activity()? {
            if day_start(ongoing.started_at) == day_start(now) {
                if let Some(id) = ongoing.id {
                    previous = self.end_activity(id, now)?;
                }
            } else {
                info!(
                    "[store] Ongoing activity {:?} started on an earlier day — leaving open",
                    ongoing.id
                );
            }
        }

        let id = self.add_activity(activity)?;
        Ok((id, previous))
    }

    /// All activities started today (UTC day of `now`), oldest first.
    pub fn today_activities(&self, now: DateTime<Utc>) -> EngineResult<Vec<Activity>> {
        self.activities_between(day_start(now), now + chrono::Duration::days(1))
    }

    /// Activities with `from <= started_at < to`, oldest first.
    pub fn activities_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<Activity>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTIVITY_COLS} FROM activities
             WHERE started_at >= ?1 AND started_at < ?2
             ORDER BY started_at ASC"
        ))?;
        let rows = stmt
            .query_map(params![from, to], Activity::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Lifetime count of registered activities.
    pub fn count_activities(&self) -> EngineResult<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?;
        Ok(count)
    }

    /// How many activities were answered by a given response source.
    pub fn count_activities_with_source(&self, source: ResponseSource) -> EngineResult<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM activities WHERE response_source = ?1",
            params![source.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// When the user last received a live AI response, if ever.
    pub fn last_ai_response_at(&self) -> EngineResult<Option<DateTime<Utc>>> {
        let conn = self.conn.lock();
        let last = conn.query_row(
            "SELECT MAX(started_at) FROM activities WHERE response_source = 'ai'",
            [],
            |row| row.get(0),
        )?;
        Ok(last)
    }

    /// Delete activities in `[from, to)` after they have been rolled up.
    pub fn delete_activities_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM activities WHERE started_at >= ?1 AND started_at < ?2",
            params![from, to],
        )?;
        Ok(deleted)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
