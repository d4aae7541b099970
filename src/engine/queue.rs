// TimeFlow Engine — Pending Input Queue
// Holds user input that could not be classified (AI unreachable) and drains
// it once connectivity returns.
//
// Drain model, one item per attempt:
//   - a fixed-interval tick (or a manual trigger) tries the OLDEST pending
//     item; a single stubborn item cannot starve the rest because every tick
//     re-evaluates from the front
//   - classification and downstream processing run under their own timeouts
//   - failure of any step leaves the item untouched for the next tick; there
//     is no retry cap and no dead-letter — a personal queue waits forever
//   - after a success the loop continues with the next item after a short
//     pause instead of sleeping a full tick, so a recovered backlog clears
//     without bursting the endpoint
//
// Re-entrancy: a tick that fires while a drain is in flight is a no-op
// (AtomicBool guard). A cooldown between FAILED attempts stops the loop from
// thrashing while the AI is still down; success clears it.

use crate::atoms::error::EngineResult;
use crate::atoms::types::{
    Activity, IntentType, PendingInput, ProcessedResult, ResponseSource,
};
use crate::engine::activity::process_activity;
use crate::engine::chat::{chat_reply, ChatContext};
use crate::engine::config::EngineConfig;
use crate::engine::intent::classify;
use crate::engine::provider::ChatProvider;
use crate::engine::stats::today_totals;
use crate::engine::store::FlowStore;
use chrono::Utc;
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{timeout, Instant, MissedTickBehavior};

/// What a single drain attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Queue empty — no state touched, no calls made.
    Idle,
    /// Another drain is already in flight; this tick was a no-op.
    Busy,
    /// Still inside the cooldown window after a failed attempt.
    Cooldown,
    /// Classification reported the AI unreachable; the item stays queued.
    Offline,
    /// Classification succeeded but downstream processing failed or timed
    /// out; the item stays queued, unchanged.
    Failed,
    /// The oldest item was classified, acted on and committed.
    Drained { intent: IntentType },
}

pub struct PendingQueue {
    store: Arc<FlowStore>,
    provider: Option<Arc<dyn ChatProvider>>,
    config: EngineConfig,
    /// Re-entrancy guard: set for the whole duration of a drain attempt.
    processing: AtomicBool,
    /// When the last FAILED attempt happened. Success clears it so a
    /// recovered backlog is not throttled.
    last_failure: Mutex<Option<Instant>>,
}

impl PendingQueue {
    pub fn new(
        store: Arc<FlowStore>,
        provider: Option<Arc<dyn ChatProvider>>,
        config: EngineConfig,
    ) -> Self {
        PendingQueue {
            store,
            provider,
            config,
            processing: AtomicBool::new(false),
            last_failure: Mutex::new(None),
        }
    }

    /// Queue an input for later classification.
    pub fn enqueue(&self, text: &str) -> EngineResult<i64> {
        self.store.add_pending_input(text, Utc::now())
    }

    /// How many items are waiting.
    pub fn pending_count(&self) -> EngineResult<i64> {
        self.store.pending_count()
    }

    /// Attempt to drain the oldest pending item. Called by the background
    /// loop and by manual "try now" triggers; safe to call at any time.
    pub async fn drain_tick(&self) -> DrainOutcome {
        if self.processing.swap(true, Ordering::SeqCst) {
            return DrainOutcome::Busy;
        }
        let outcome = self.drain_oldest().await;
        self.processing.store(false, Ordering::SeqCst);
        outcome
    }

    /// Fixed-interval drain loop. The interval never grows under sustained
    /// failure; abort the task to stop it.
    pub async fn run(&self) {
        info!(
            "[queue] Drain loop started (tick {:?}, cooldown {:?})",
            self.config.drain_tick, self.config.drain_cooldown
        );

        let mut tick = tokio::time::interval(self.config.drain_tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tick.tick().await;
            // Keep going front-to-back while attempts succeed, with a short
            // pause between items.
            while let DrainOutcome::Drained { .. } = self.drain_tick().await {
                tokio::time::sleep(self.config.inter_item_delay).await;
            }
        }
    }

    // ── Internals ──────────────────────────────────────────────────────

    async fn drain_oldest(&self) -> DrainOutcome {
        if let Some(last) = *self.last_failure.lock() {
            if last.elapsed() < self.config.drain_cooldown {
                return DrainOutcome::Cooldown;
            }
        }

        let item = match self.store.oldest_pending() {
            Ok(Some(item)) => item,
            Ok(None) => return DrainOutcome::Idle,
            Err(e) => {
                warn!("[queue] Could not read the pending set: {e}");
                self.note_failure();
                return DrainOutcome::Failed;
            }
        };

        let Some(provider) = self.provider.as_deref() else {
            self.note_failure();
            return DrainOutcome::Offline;
        };

        info!("[queue] Attempting item {} ({})", item.id, item.text);

        let outcome = match timeout(
            self.config.intent_timeout,
            classify(Some(provider), &item.text),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("[queue] Intent classification timed out for item {}", item.id);
                self.note_failure();
                return DrainOutcome::Failed;
            }
        };

        if outcome.using_fallback {
            info!("[queue] AI still offline — item {} stays queued", item.id);
            self.note_failure();
            return DrainOutcome::Offline;
        }

        let result = match timeout(
            self.config.process_timeout,
            self.process_item(provider, &item, outcome.kind),
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!("[queue] Processing failed for item {}: {e}", item.id);
                self.note_failure();
                return DrainOutcome::Failed;
            }
            Err(_) => {
                warn!("[queue] Processing timed out for item {}", item.id);
                self.note_failure();
                return DrainOutcome::Failed;
            }
        };

        // Mark processed only after every side effect has been committed;
        // a store failure here leaves the item pending for the next tick.
        let payload = match serde_json::to_string(&result) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("[queue] Could not serialize result for item {}: {e}", item.id);
                self.note_failure();
                return DrainOutcome::Failed;
            }
        };
        if let Err(e) = self.store.mark_pending_processed(item.id, &payload, Utc::now()) {
            warn!("[queue] Could not mark item {} processed: {e}", item.id);
            self.note_failure();
            return DrainOutcome::Failed;
        }

        self.clear_failure();
        info!("[queue] Item {} drained → {:?}", item.id, result.intent);
        DrainOutcome::Drained { intent: result.intent }
    }

    /// Act on a classified item: register activities, answer chat turns.
    async fn process_item(
        &self,
        provider: &dyn ChatProvider,
        item: &PendingInput,
        kind: IntentType,
    ) -> EngineResult<ProcessedResult> {
        if kind.is_activity() {
            let context = crate::atoms::types::ActivityContext {
                previous: None,
                today: today_totals(&self.store, Utc::now())?,
            };
            let insight = process_activity(provider, &item.text, &context).await?;

            // Registered at its ORIGINAL timestamp, as a closed point-in-time
            // record: a drained item must not become the ongoing activity.
            self.store.add_activity(&Activity {
                id: None,
                title: item.text.clone(),
                summary: Some(insight.summary.clone()),
                category: Some(insight.category.clone()),
                ai_response: Some(insight.response.clone()),
                response_source: Some(ResponseSource::Ai),
                started_at: item.timestamp,
                ended_at: Some(item.timestamp),
                duration_minutes: None,
            })?;

            return Ok(ProcessedResult {
                intent: kind,
                category: Some(insight.category),
                summary: Some(insight.summary),
                response: Some(insight.response),
            });
        }

        // Conversational input: reply, nothing else to persist.
        let context = ChatContext {
            today: today_totals(&self.store, Utc::now())?,
            current_activity: None,
            last_feedback: None,
        };
        let reply = chat_reply(Some(provider), &item.text, &context).await;
        Ok(ProcessedResult {
            intent: kind,
            category: None,
            summary: None,
            response: Some(reply.message),
        })
    }

    fn note_failure(&self) {
        *self.last_failure.lock() = Some(Instant::now());
    }

    fn clear_failure(&self) {
        *self.last_failure.lock() = None;
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
