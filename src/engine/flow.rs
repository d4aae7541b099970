// TimeFlow Engine — Input Orchestration
// The end-to-end submission path: classify → queue when offline → chat reply
// for conversational turns → strategy-routed response (cache / AI / template)
// and activity registration for everything else.
//
// This is the only module that wires the pipeline pieces together; each piece
// stays independently testable underneath it.

use crate::atoms::constants::{
    CACHE_EVICT_DAYS, OFFLINE_NOTICE, PENDING_EVICT_DAYS,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{
    Activity, ActivityContext, ActivityInsight, ChatReply, Decision, DecisionReason,
    IntentOutcome, IntentType, PreviousActivity, ResponseSource,
};
use crate::engine::activity::process_activity;
use crate::engine::chat::{chat_reply, ChatContext};
use crate::engine::config::EngineConfig;
use crate::engine::intent::{classify, should_force_activity};
use crate::engine::nlp::normalize;
use crate::engine::provider::{ChatProvider, DeepSeekProvider};
use crate::engine::queue::PendingQueue;
use crate::engine::stats::{calculate_savings, today_totals, user_stats, CostSavings};
use crate::engine::strategy::decide;
use crate::engine::store::FlowStore;
use crate::engine::templates::{guess_category, local_template, TemplateContext};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::sync::Arc;

/// What happened to one piece of user input.
#[derive(Debug, Clone)]
pub enum InputOutcome {
    /// AI unreachable — the text was queued for the drain loop.
    Queued { notice: String, pending_count: i64 },
    /// Conversational turn — nothing registered.
    Chat { reply: ChatReply },
    /// Activity registered.
    Activity {
        id: i64,
        summary: String,
        category: String,
        response: String,
        source: ResponseSource,
        reason: DecisionReason,
    },
}

pub struct FlowEngine {
    store: Arc<FlowStore>,
    provider: Option<Arc<dyn ChatProvider>>,
    queue: Arc<PendingQueue>,
}

impl FlowEngine {
    /// Open the default on-disk store and build the provider from config.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let store = Arc::new(FlowStore::open_default()?);
        Ok(Self::with_store(store, config))
    }

    /// Build on an existing store; the provider comes from the config's key.
    pub fn with_store(store: Arc<FlowStore>, config: EngineConfig) -> Self {
        let provider: Option<Arc<dyn ChatProvider>> = config.api_key.clone().map(|key| {
            Arc::new(DeepSeekProvider::new(
                key,
                Some(config.base_url.clone()),
                Some(config.model.clone()),
            )) as Arc<dyn ChatProvider>
        });
        Self::with_parts(store, provider, config)
    }

    /// Full dependency injection — tests pass a scripted provider here.
    pub fn with_parts(
        store: Arc<FlowStore>,
        provider: Option<Arc<dyn ChatProvider>>,
        config: EngineConfig,
    ) -> Self {
        let queue = Arc::new(PendingQueue::new(store.clone(), provider.clone(), config));
        FlowEngine { store, provider, queue }
    }

    pub fn store(&self) -> &Arc<FlowStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<PendingQueue> {
        &self.queue
    }

    /// Spawn the background drain loop. Abort the handle to stop it.
    pub fn spawn_drain_loop(&self) -> tokio::task::JoinHandle<()> {
        let queue = self.queue.clone();
        tokio::spawn(async move { queue.run().await })
    }

    // ── Submission path ────────────────────────────────────────────────

    pub async fn handle_input(&self, text: &str) -> EngineResult<InputOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::Other("empty input".to_string()));
        }

        // Explicit "registrar:" style prefixes skip classification entirely,
        // which also makes forced registration work fully offline.
        let outcome = if should_force_activity(text) {
            IntentOutcome {
                kind: IntentType::Activity,
                confidence: 1.0,
                reasoning: None,
                using_fallback: false,
                fallback_message: None,
            }
        } else {
            classify(self.provider.as_deref(), text).await
        };

        if outcome.using_fallback {
            self.queue.enqueue(text)?;
            let notice = outcome
                .fallback_message
                .unwrap_or_else(|| OFFLINE_NOTICE.to_string());
            return Ok(InputOutcome::Queued {
                notice,
                pending_count: self.queue.pending_count()?,
            });
        }

        if !outcome.kind.is_activity() {
            let context = self.chat_context()?;
            let reply = chat_reply(self.provider.as_deref(), text, &context).await;
            return Ok(InputOutcome::Chat { reply });
        }

        self.register_activity(text).await
    }

    /// Strategy-routed registration: cache text, live AI call, or template.
    async fn register_activity(&self, title: &str) -> EngineResult<InputOutcome> {
        let now = Utc::now();
        let stats = user_stats(&self.store, now)?;
        let category_hint = guess_category(title);
        let decision = decide(&self.store, title, category_hint, &stats, now)?;

        let (summary, category, response, source) =
            self.resolve_response(title, category_hint, &decision, now).await?;

        let (id, _previous) = self.store.start_new_activity(
            &Activity {
                id: None,
                title: title.to_string(),
                summary: Some(summary.clone()),
                category: Some(category.clone()),
                ai_response: Some(response.clone()),
                response_source: Some(source),
                started_at: now,
                ended_at: None,
                duration_minutes: None,
            },
            now,
        )?;

        info!(
            "[flow] Activity {} registered ({}, source {:?})",
            id,
            decision.reason.label(),
            source
        );

        Ok(InputOutcome::Activity {
            id,
            summary,
            category,
            response,
            source,
            reason: decision.reason,
        })
    }

    /// Turn a strategy decision into concrete response text.
    async fn resolve_response(
        &self,
        title: &str,
        category_hint: &str,
        decision: &Decision,
        now: DateTime<Utc>,
    ) -> EngineResult<(String, String, String, ResponseSource)> {
        if let Some(cached) = &decision.cached_response {
            return Ok((
                short_title(title),
                category_hint.to_string(),
                cached.clone(),
                ResponseSource::Cache,
            ));
        }

        if decision.use_ai {
            if let Some(insight) = self.try_ai(title, now).await {
                // Write back so the next similar title is a cache hit.
                self.store.insert_cached_response(
                    &normalize(title),
                    &insight.category,
                    &insight.response,
                )?;
                return Ok((
                    insight.summary,
                    insight.category,
                    insight.response,
                    ResponseSource::Ai,
                ));
            }
            // AI wanted but unavailable mid-flight: degrade to a template so
            // the submission never blocks on the provider.
        }

        let context = self.template_context(title, now)?;
        Ok((
            short_title(title),
            category_hint.to_string(),
            local_template(category_hint, Some(&context)),
            ResponseSource::Template,
        ))
    }

    async fn try_ai(&self, title: &str, now: DateTime<Utc>) -> Option<ActivityInsight> {
        let provider = self.provider.as_deref()?;
        let context = match self.activity_context(now) {
            Ok(context) => context,
            Err(e) => {
                warn!("[flow] Could not assemble activity context: {e}");
                ActivityContext::default()
            }
        };
        match process_activity(provider, title, &context).await {
            Ok(insight) => Some(insight),
            Err(e) => {
                warn!("[flow] AI processing failed, falling back to template: {e}");
                None
            }
        }
    }

    // ── Context assembly ───────────────────────────────────────────────

    fn activity_context(&self, now: DateTime<Utc>) -> EngineResult<ActivityContext> {
        let previous = self.store.ongoing_activity()?.map(|ongoing| PreviousActivity {
            duration_minutes: (now - ongoing.started_at).num_seconds().max(0) / 60,
            title: ongoing.title,
            summary: ongoing.summary,
            category: ongoing.category,
        });
        Ok(ActivityContext { previous, today: today_totals(&self.store, now)? })
    }

    fn chat_context(&self) -> EngineResult<ChatContext> {
        let now = Utc::now();
        let current_activity = self.store.ongoing_activity()?.map(|ongoing| {
            let minutes = (now - ongoing.started_at).num_seconds().max(0) / 60;
            (ongoing.title, minutes)
        });
        let last_feedback = self
            .store
            .recent_feedbacks(1)?
            .into_iter()
            .next()
            .and_then(|f| Some((f.theme?, f.score?)));
        Ok(ChatContext {
            today: today_totals(&self.store, now)?,
            current_activity,
            last_feedback,
        })
    }

    fn template_context(&self, title: &str, now: DateTime<Utc>) -> EngineResult<TemplateContext> {
        let today = self.store.today_activities(now)?;
        let normalized_title = normalize(title);

        let previous_category = today.last().and_then(|a| a.category.clone());
        let total_minutes_worked = today
            .iter()
            .filter(|a| a.category.as_deref() == Some("💼 Trabalho"))
            .filter_map(|a| a.duration_minutes)
            .sum();
        let same_activity_count = today
            .iter()
            .filter(|a| normalize(&a.title) == normalized_title)
            .count() as i64;

        Ok(TemplateContext { previous_category, total_minutes_worked, same_activity_count })
    }

    // ── Maintenance & reporting ────────────────────────────────────────

    /// Evict stale cache entries and old audit rows. Returns (cache, audit)
    /// eviction counts.
    pub fn run_maintenance(&self) -> EngineResult<(usize, usize)> {
        let cache = self.store.evict_cache_older_than(CACHE_EVICT_DAYS)?;
        let audit = self.store.evict_processed_older_than(PENDING_EVICT_DAYS)?;
        Ok((cache, audit))
    }

    /// Spend avoided by answering from cache/templates instead of the AI.
    pub fn cost_savings(&self) -> EngineResult<CostSavings> {
        let total = self.store.count_activities()?;
        let ai_calls = self.store.count_activities_with_source(ResponseSource::Ai)?;
        Ok(calculate_savings(total, ai_calls))
    }
}

/// Trimmed raw title used as the summary when no AI summary exists.
fn short_title(title: &str) -> String {
    title.chars().take(50).collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::provider::testing::{CannedReply, MockProvider};

    const INTENT_ACTIVITY: &str = r#"{"type": "activity", "confidence": 0.9}"#;
    const INTENT_CHAT: &str = r#"{"type": "chat", "confidence": 0.9}"#;
    const INSIGHT: &str =
        r#"{"summary": "Louça", "category": "🏠 Casa", "response": "Brilhando! ✨"}"#;
    const CHAT_REPLY: &str = r#"{"message": "Entendo! 💙", "type": "empathy"}"#;

    fn engine(provider: Option<MockProvider>) -> (FlowEngine, Option<Arc<MockProvider>>) {
        let store = Arc::new(FlowStore::open_in_memory().expect("in-memory store"));
        let provider = provider.map(Arc::new);
        let engine = FlowEngine::with_parts(
            store,
            provider.clone().map(|p| p as Arc<dyn ChatProvider>),
            EngineConfig::default(),
        );
        (engine, provider)
    }

    /// Seed the store so strategy rules 2–4 are all false: 25 activities
    /// today, one of them answered by the AI just now.
    fn settle_stats(store: &FlowStore) {
        let now = Utc::now();
        for i in 0..25i64 {
            let mut activity = Activity {
                id: None,
                title: format!("atividade {i}"),
                summary: None,
                category: Some("📝 Outros".to_string()),
                ai_response: None,
                response_source: Some(ResponseSource::Template),
                started_at: now - chrono::Duration::minutes(300 - i),
                ended_at: Some(now - chrono::Duration::minutes(290 - i)),
                duration_minutes: Some(10),
            };
            if i == 0 {
                activity.response_source = Some(ResponseSource::Ai);
                activity.started_at = now - chrono::Duration::seconds(30);
                activity.ended_at = Some(now);
            }
            store.add_activity(&activity).unwrap();
        }
    }

    #[tokio::test]
    async fn offline_input_is_queued_with_notice() {
        let (engine, _) = engine(None);

        let outcome = engine.handle_input("lavar louça").await.unwrap();
        match outcome {
            InputOutcome::Queued { notice, pending_count } => {
                assert!(notice.contains("IA offline"));
                assert_eq!(pending_count, 1);
            }
            other => panic!("expected Queued, got {other:?}"),
        }
        assert_eq!(engine.store().count_activities().unwrap(), 0);
    }

    #[tokio::test]
    async fn conversational_input_gets_a_chat_reply() {
        let provider = MockProvider::new()
            .with(CannedReply::Content(INTENT_CHAT.to_string()))
            .with(CannedReply::Content(CHAT_REPLY.to_string()));
        let (engine, _) = engine(Some(provider));

        let outcome = engine.handle_input("estou desanimado").await.unwrap();
        match outcome {
            InputOutcome::Chat { reply } => assert_eq!(reply.message, "Entendo! 💙"),
            other => panic!("expected Chat, got {other:?}"),
        }
        assert_eq!(engine.store().count_activities().unwrap(), 0);
    }

    #[tokio::test]
    async fn onboarding_activity_uses_ai_and_seeds_the_cache() {
        let provider = MockProvider::new()
            .with(CannedReply::Content(INTENT_ACTIVITY.to_string()))
            .with(CannedReply::Content(INSIGHT.to_string()));
        let (engine, _) = engine(Some(provider));

        let outcome = engine.handle_input("lavar louça").await.unwrap();
        match outcome {
            InputOutcome::Activity { source, reason, category, .. } => {
                assert_eq!(source, ResponseSource::Ai);
                assert_eq!(reason, DecisionReason::Onboarding);
                assert_eq!(category, "🏠 Casa");
            }
            other => panic!("expected Activity, got {other:?}"),
        }

        // The AI response was written back under the normalized pattern.
        let cached = engine.store().cached_responses("🏠 Casa").unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].activity_pattern, "lavar louca");
    }

    #[tokio::test]
    async fn cached_response_skips_the_ai_entirely() {
        let provider =
            MockProvider::new().with(CannedReply::Content(INTENT_ACTIVITY.to_string()));
        let (engine, provider_handle) = engine(Some(provider));
        engine
            .store()
            .insert_cached_response("lavar louca", "🏠 Casa", "Casa organizada! 🏡")
            .unwrap();

        let outcome = engine.handle_input("Lavar a louça").await.unwrap();
        match outcome {
            InputOutcome::Activity { source, reason, response, .. } => {
                assert_eq!(source, ResponseSource::Cache);
                assert_eq!(reason, DecisionReason::CacheHit);
                assert_eq!(response, "Casa organizada! 🏡");
            }
            other => panic!("expected Activity, got {other:?}"),
        }

        // Exactly one provider call: the intent classification.
        assert_eq!(provider_handle.unwrap().call_count(), 1);
        let cached = engine.store().cached_responses("🏠 Casa").unwrap();
        assert_eq!(cached[0].usage_count, 2);
    }

    #[tokio::test]
    async fn routine_activity_uses_a_template_without_ai() {
        let provider =
            MockProvider::new().with(CannedReply::Content(INTENT_ACTIVITY.to_string()));
        let (engine, provider_handle) = engine(Some(provider));
        settle_stats(engine.store());

        let outcome = engine.handle_input("lavar louça").await.unwrap();
        match outcome {
            InputOutcome::Activity { source, reason, .. } => {
                assert_eq!(source, ResponseSource::Template);
                assert_eq!(reason, DecisionReason::Routine);
            }
            other => panic!("expected Activity, got {other:?}"),
        }
        assert_eq!(provider_handle.unwrap().call_count(), 1);
    }

    #[tokio::test]
    async fn ai_failure_mid_flight_degrades_to_template() {
        let provider = MockProvider::new()
            .with(CannedReply::Content(INTENT_ACTIVITY.to_string()))
            .with(CannedReply::TransportError);
        let (engine, _) = engine(Some(provider));

        let outcome = engine.handle_input("lavar louça").await.unwrap();
        match outcome {
            InputOutcome::Activity { source, response, .. } => {
                assert_eq!(source, ResponseSource::Template);
                assert!(!response.is_empty());
            }
            other => panic!("expected Activity, got {other:?}"),
        }
        // Nothing was cached — only real AI replies seed the cache.
        assert!(engine.store().cached_responses("🏠 Casa").unwrap().is_empty());
    }

    #[tokio::test]
    async fn forced_prefix_registers_even_offline() {
        let (engine, _) = engine(None);

        let outcome = engine.handle_input("registrar: lavar louça").await.unwrap();
        match outcome {
            InputOutcome::Activity { source, .. } => {
                assert_eq!(source, ResponseSource::Template)
            }
            other => panic!("expected Activity, got {other:?}"),
        }
        assert_eq!(engine.store().count_activities().unwrap(), 1);
        assert_eq!(engine.queue().pending_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let (engine, _) = engine(None);
        assert!(engine.handle_input("   ").await.is_err());
    }

    #[tokio::test]
    async fn savings_report_counts_avoided_calls() {
        let (engine, _) = engine(None);
        settle_stats(engine.store());

        let savings = engine.cost_savings().unwrap();
        assert_eq!(savings.ai_calls_saved, 24);
        assert!((savings.template_usage_percent - 96.0).abs() < 1e-9);
    }
}
