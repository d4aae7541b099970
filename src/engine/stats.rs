// TimeFlow Engine — Activity Statistics
// Ephemeral aggregates recomputed on demand from the activities table:
// the strategy's UserStats, per-day breakdowns, and the cost-savings
// summary surfaced in the cache stats view.

use crate::atoms::error::EngineResult;
use crate::atoms::types::{Activity, TodayTotals, UserStats};
use crate::engine::store::FlowStore;
use chrono::{DateTime, Timelike, Utc};
use std::collections::BTreeMap;

/// Assemble the strategy inputs. Not persisted anywhere — the activities
/// table is the single source of truth.
pub fn user_stats(store: &FlowStore, now: DateTime<Utc>) -> EngineResult<UserStats> {
    Ok(UserStats {
        total_activities_registered: store.count_activities()?,
        last_ai_response_date: store.last_ai_response_at()?,
        today_activities_count: store.today_activities(now)?.len() as i64,
    })
}

/// Today's counters for AI prompt context.
pub fn today_totals(store: &FlowStore, now: DateTime<Utc>) -> EngineResult<TodayTotals> {
    let today = store.today_activities(now)?;
    Ok(TodayTotals {
        activities_count: today.len() as i64,
        total_minutes: today.iter().filter_map(|a| a.duration_minutes).sum(),
    })
}

// ── Day breakdown ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CategoryStats {
    pub category: String,
    pub count: usize,
    pub total_minutes: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DayStats {
    pub total_activities: usize,
    pub total_minutes: i64,
    pub by_category: Vec<CategoryStats>,
    /// Hour of day (0–23) with the most activity starts.
    pub most_productive_hour: Option<u32>,
    pub average_duration: i64,
}

/// Detailed breakdown of a set of activities. Only finished activities
/// (with a duration) count toward time totals.
pub fn day_stats(activities: &[Activity]) -> DayStats {
    let finished: Vec<&Activity> = activities
        .iter()
        .filter(|a| a.ended_at.is_some() && a.duration_minutes.is_some())
        .collect();

    if finished.is_empty() {
        return DayStats::default();
    }

    let total_minutes: i64 = finished.iter().filter_map(|a| a.duration_minutes).sum();

    // Per-category totals (BTreeMap keeps the output order stable).
    let mut categories: BTreeMap<String, (usize, i64)> = BTreeMap::new();
    for activity in &finished {
        let category = activity
            .category
            .clone()
            .unwrap_or_else(|| crate::atoms::constants::DEFAULT_CATEGORY.to_string());
        let entry = categories.entry(category).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += activity.duration_minutes.unwrap_or(0);
    }

    let by_category = categories
        .into_iter()
        .map(|(category, (count, minutes))| CategoryStats {
            category,
            count,
            total_minutes: minutes,
            percentage: if total_minutes > 0 {
                minutes as f64 / total_minutes as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    // Hour with the most starts.
    let mut per_hour = [0usize; 24];
    for activity in &finished {
        per_hour[activity.started_at.hour() as usize] += 1;
    }
    let most_productive_hour = per_hour
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)
        .filter(|(_, count)| **count > 0)
        .map(|(hour, _)| hour as u32);

    DayStats {
        total_activities: finished.len(),
        total_minutes,
        by_category,
        most_productive_hour,
        average_duration: total_minutes / finished.len() as i64,
    }
}

// ── Cost savings ───────────────────────────────────────────────────────────

/// Estimated spend avoided by the cache/template strategy.
/// DeepSeek pricing: ~$0.001 per request (1000 requests ≈ $1).
#[derive(Debug, Clone)]
pub struct CostSavings {
    pub ai_calls_saved: i64,
    pub estimated_savings: String,
    pub template_usage_percent: f64,
}

pub fn calculate_savings(total_activities: i64, ai_calls: i64) -> CostSavings {
    let saved_calls = (total_activities - ai_calls).max(0);
    let cost_per_call = 0.001;
    let saved_money = saved_calls as f64 * cost_per_call;

    CostSavings {
        ai_calls_saved: saved_calls,
        estimated_savings: format!("${saved_money:.2}"),
        template_usage_percent: if total_activities > 0 {
            saved_calls as f64 / total_activities as f64 * 100.0
        } else {
            0.0
        },
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::ResponseSource;
    use chrono::TimeZone;

    fn finished(category: &str, hour: u32, minutes: i64) -> Activity {
        let started = Utc.with_ymd_and_hms(2026, 8, 8, hour, 0, 0).unwrap();
        Activity {
            id: None,
            title: "x".to_string(),
            summary: None,
            category: Some(category.to_string()),
            ai_response: None,
            response_source: None,
            started_at: started,
            ended_at: Some(started + chrono::Duration::minutes(minutes)),
            duration_minutes: Some(minutes),
        }
    }

    #[test]
    fn empty_day_is_all_zeroes() {
        let stats = day_stats(&[]);
        assert_eq!(stats.total_activities, 0);
        assert!(stats.most_productive_hour.is_none());
    }

    #[test]
    fn breakdown_sums_and_percentages() {
        let activities = vec![
            finished("💼 Trabalho", 9, 120),
            finished("💼 Trabalho", 9, 60),
            finished("🏠 Casa", 18, 20),
        ];
        let stats = day_stats(&activities);

        assert_eq!(stats.total_activities, 3);
        assert_eq!(stats.total_minutes, 200);
        assert_eq!(stats.average_duration, 66);
        assert_eq!(stats.most_productive_hour, Some(9));

        let work = stats
            .by_category
            .iter()
            .find(|c| c.category == "💼 Trabalho")
            .unwrap();
        assert_eq!(work.count, 2);
        assert_eq!(work.total_minutes, 180);
        assert!((work.percentage - 90.0).abs() < 1e-9);
    }

    #[test]
    fn unfinished_activities_do_not_count() {
        let mut open = finished("💼 Trabalho", 9, 60);
        open.ended_at = None;
        open.duration_minutes = None;
        let stats = day_stats(&[open]);
        assert_eq!(stats.total_activities, 0);
    }

    #[test]
    fn user_stats_reads_the_store() {
        let store = FlowStore::open_in_memory().expect("in-memory store");
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0).unwrap();

        let mut a = finished("💼 Trabalho", 9, 60);
        a.response_source = Some(ResponseSource::Ai);
        store.add_activity(&a).unwrap();

        let stats = user_stats(&store, now).unwrap();
        assert_eq!(stats.total_activities_registered, 1);
        assert_eq!(stats.today_activities_count, 1);
        assert!(stats.last_ai_response_date.is_some());
    }

    #[test]
    fn savings_scale_with_avoided_calls() {
        let savings = calculate_savings(200, 50);
        assert_eq!(savings.ai_calls_saved, 150);
        assert_eq!(savings.estimated_savings, "$0.15");
        assert!((savings.template_usage_percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn savings_handle_zero_activities() {
        let savings = calculate_savings(0, 0);
        assert_eq!(savings.ai_calls_saved, 0);
        assert_eq!(savings.template_usage_percent, 0.0);
    }
}
