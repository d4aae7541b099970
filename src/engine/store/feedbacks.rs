use super::FlowStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Feedback, FeedbackPeriod};
use rusqlite::params;

fn period_from_str(s: &str) -> FeedbackPeriod {
    match s {
        "weekly" => FeedbackPeriod::Weekly,
        _ => FeedbackPeriod::Daily,
    }
}

impl Feedback {
    /// Map a row with columns (id, date, period, theme, score, insights,
    /// suggestion, created_at) → Feedback. `insights` is a JSON array column.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let period: String = row.get(2)?;
        let insights_json: String = row.get(5)?;
        Ok(Feedback {
            id: row.get(0)?,
            date: row.get(1)?,
            period: period_from_str(&period),
            theme: row.get(3)?,
            score: row.get(4)?,
            insights: serde_json::from_str(&insights_json).unwrap_or_default(),
            suggestion: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

const FEEDBACK_COLS: &str = "id, date, period, theme, score, insights, suggestion, created_at";

impl FlowStore {
    // ── Feedback rollups ───────────────────────────────────────────────

    pub fn add_feedback(&self, feedback: &Feedback) -> EngineResult<i64> {
        let insights = serde_json::to_string(&feedback.insights)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO feedbacks (date, period, theme, score, insights, suggestion, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                feedback.date,
                feedback.period.as_str(),
                feedback.theme,
                feedback.score,
                insights,
                feedback.suggestion,
                feedback.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Whether a rollup already exists for this date + period.
    pub fn feedback_exists(&self, date: &str, period: FeedbackPeriod) -> EngineResult<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM feedbacks WHERE date = ?1 AND period = ?2",
            params![date, period.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Most recent rollups first — used as history context for the analyst
    /// prompt so suggestions stay personalized.
    pub fn recent_feedbacks(&self, limit: u32) -> EngineResult<Vec<Feedback>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEEDBACK_COLS} FROM feedbacks ORDER BY date DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit], Feedback::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn feedback_roundtrip_and_existence() {
        let store = FlowStore::open_in_memory().expect("in-memory store");
        let feedback = Feedback {
            id: None,
            date: "2026-08-08".to_string(),
            period: FeedbackPeriod::Daily,
            theme: Some("dia produtivo".to_string()),
            score: Some(8.0),
            insights: vec!["manteve o foco".to_string(), "poucas pausas".to_string()],
            suggestion: Some("começar pelo mais difícil".to_string()),
            created_at: Utc::now(),
        };

        assert!(!store.feedback_exists("2026-08-08", FeedbackPeriod::Daily).unwrap());
        store.add_feedback(&feedback).unwrap();
        assert!(store.feedback_exists("2026-08-08", FeedbackPeriod::Daily).unwrap());
        // Same date, different period — still absent.
        assert!(!store.feedback_exists("2026-08-08", FeedbackPeriod::Weekly).unwrap());

        let recent = store.recent_feedbacks(5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].insights.len(), 2);
        assert_eq!(recent[0].theme.as_deref(), Some("dia produtivo"));
    }
}
