// TimeFlow Engine — Response Strategy
// Decides, per activity, whether to spend a paid AI call, reuse a cached
// response, or fall back to a local template.
//
// The rules are evaluated in strict order and the first match wins. They are
// NOT mutually exclusive — reordering them changes behavior, so the order is
// part of the contract:
//   1. cache hit            → free, instant, short-circuits everything
//   2. onboarding           → first 20 activities always get the AI
//   3. first of the day     → personalized good-morning
//   4. re-engagement        → 24h+ without an AI reply
//   5. important activity   → keyword-flagged titles
//   6. routine              → local template, no cost

use crate::atoms::constants::{
    IMPORTANT_KEYWORDS, ONBOARDING_ACTIVITY_COUNT, REENGAGEMENT_HOURS, SIMILARITY_THRESHOLD,
};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Decision, DecisionReason, UserStats};
use crate::engine::nlp::{find_best_match, normalize};
use crate::engine::store::FlowStore;
use chrono::{DateTime, Duration, Utc};
use log::info;

/// Decide how to answer a new activity. A cache hit also records the reuse
/// (usage counter + recency) on the matched entry.
pub fn decide(
    store: &FlowStore,
    title: &str,
    category: &str,
    stats: &UserStats,
    now: DateTime<Utc>,
) -> EngineResult<Decision> {
    // Rule 1: reuse a similar cached response.
    let entries = store.cached_responses(category)?;
    if let Some(hit) = find_best_match(&entries, title, SIMILARITY_THRESHOLD) {
        store.record_cache_hit(hit.id)?;
        info!(
            "[strategy] Cache hit for \"{}\" → \"{}\" (used {}x)",
            title,
            hit.response,
            hit.usage_count + 1
        );
        return Ok(Decision {
            use_ai: false,
            reason: DecisionReason::CacheHit,
            cached_response: Some(hit.response.clone()),
        });
    }

    // Rule 2: onboarding — keep new users motivated with live replies.
    if stats.total_activities_registered < ONBOARDING_ACTIVITY_COUNT {
        return Ok(ai_decision(DecisionReason::Onboarding));
    }

    // Rule 3: first activity of the day.
    if stats.today_activities_count == 0 {
        return Ok(ai_decision(DecisionReason::FirstOfDay));
    }

    // Rule 4: no AI reply in the last 24 hours.
    let stale = match stats.last_ai_response_date {
        None => true,
        Some(last) => now - last > Duration::hours(REENGAGEMENT_HOURS),
    };
    if stale {
        return Ok(ai_decision(DecisionReason::Reengagement));
    }

    // Rule 5: important activity keywords.
    let normalized = normalize(title);
    if IMPORTANT_KEYWORDS.iter().any(|kw| normalized.contains(kw)) {
        return Ok(ai_decision(DecisionReason::ImportantActivity));
    }

    // Rule 6: routine — a local template does the job.
    Ok(Decision {
        use_ai: false,
        reason: DecisionReason::Routine,
        cached_response: None,
    })
}

fn ai_decision(reason: DecisionReason) -> Decision {
    Decision { use_ai: true, reason, cached_response: None }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> FlowStore {
        FlowStore::open_in_memory().expect("in-memory store")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, 14, 0, 0).unwrap()
    }

    /// Stats that make rules 2–5 all false: past onboarding, activities
    /// registered today, AI reply two hours ago.
    fn settled_stats() -> UserStats {
        UserStats {
            total_activities_registered: 25,
            last_ai_response_date: Some(now() - Duration::hours(2)),
            today_activities_count: 3,
        }
    }

    #[test]
    fn important_keyword_forces_ai() {
        let store = store();
        let decision = decide(
            &store,
            "corrigir bug urgente do cliente",
            "💼 Trabalho",
            &settled_stats(),
            now(),
        )
        .unwrap();

        assert!(decision.use_ai);
        assert_eq!(decision.reason, DecisionReason::ImportantActivity);
        assert_eq!(decision.reason.label(), "important activity");
    }

    #[test]
    fn cache_hit_short_circuits_and_records_usage() {
        let store = store();
        store
            .insert_cached_response("lavar louca", "🏠 Casa", "Casa organizada! 🏡")
            .unwrap();

        // Even with stats that would trip every AI-forcing rule, the cache wins.
        let eager_stats = UserStats {
            total_activities_registered: 0,
            last_ai_response_date: None,
            today_activities_count: 0,
        };

        let decision =
            decide(&store, "Lavar a louça", "🏠 Casa", &eager_stats, now()).unwrap();

        assert!(!decision.use_ai);
        assert_eq!(decision.reason, DecisionReason::CacheHit);
        assert_eq!(decision.cached_response.as_deref(), Some("Casa organizada! 🏡"));

        let entries = store.cached_responses("🏠 Casa").unwrap();
        assert_eq!(entries[0].usage_count, 2);
    }

    #[test]
    fn cache_lookup_is_category_scoped() {
        let store = store();
        store
            .insert_cached_response("lavar louca", "🏠 Casa", "Casa organizada! 🏡")
            .unwrap();

        // Same title, different category — no hit, falls through to rule 5.
        let decision =
            decide(&store, "Lavar a louça", "💼 Trabalho", &settled_stats(), now()).unwrap();
        assert!(!decision.use_ai);
        assert_eq!(decision.reason, DecisionReason::Routine);
    }

    #[test]
    fn onboarding_wins_before_first_of_day() {
        let store = store();
        let stats = UserStats {
            total_activities_registered: 5,
            last_ai_response_date: None,
            today_activities_count: 0,
        };
        let decision = decide(&store, "lavar louça", "🏠 Casa", &stats, now()).unwrap();
        assert_eq!(decision.reason, DecisionReason::Onboarding);
    }

    #[test]
    fn first_of_day_wins_before_reengagement() {
        let store = store();
        let stats = UserStats {
            total_activities_registered: 30,
            last_ai_response_date: None,
            today_activities_count: 0,
        };
        let decision = decide(&store, "lavar louça", "🏠 Casa", &stats, now()).unwrap();
        assert_eq!(decision.reason, DecisionReason::FirstOfDay);
    }

    #[test]
    fn reengagement_after_24h_silence() {
        let store = store();
        let stats = UserStats {
            total_activities_registered: 30,
            last_ai_response_date: Some(now() - Duration::hours(30)),
            today_activities_count: 2,
        };
        let decision = decide(&store, "lavar louça", "🏠 Casa", &stats, now()).unwrap();
        assert!(decision.use_ai);
        assert_eq!(decision.reason, DecisionReason::Reengagement);
    }

    #[test]
    fn never_used_ai_counts_as_stale() {
        let store = store();
        let stats = UserStats {
            total_activities_registered: 30,
            last_ai_response_date: None,
            today_activities_count: 2,
        };
        let decision = decide(&store, "lavar louça", "🏠 Casa", &stats, now()).unwrap();
        assert_eq!(decision.reason, DecisionReason::Reengagement);
    }

    #[test]
    fn routine_activity_uses_template() {
        let store = store();
        let decision =
            decide(&store, "lavar louça", "🏠 Casa", &settled_stats(), now()).unwrap();
        assert!(!decision.use_ai);
        assert_eq!(decision.reason, DecisionReason::Routine);
        assert!(decision.cached_response.is_none());
    }

    #[test]
    fn decision_is_deterministic() {
        let store = store();
        let stats = settled_stats();
        let first = decide(&store, "passear com o cachorro", "📝 Outros", &stats, now()).unwrap();
        let second = decide(&store, "passear com o cachorro", "📝 Outros", &stats, now()).unwrap();
        assert_eq!(first.reason, second.reason);
        assert_eq!(first.use_ai, second.use_ai);
    }
}
