//! TimeFlow Core — UI-independent engine for the TimeFlow time tracker.
//!
//! Users type free-text activity descriptions; a DeepSeek-backed classifier
//! decides whether the text is an activity, a conversation, a question or
//! feedback; activities get a motivational response routed through a
//! cache → AI → template strategy; input typed while the AI is unreachable
//! is queued and drained later; closed days are rolled up into feedback
//! records and the raw log is purged.
//!
//! Layering:
//!   atoms   — pure types, constants and the canonical error enum
//!   engine  — store, NLP, strategy, provider, queue and orchestration

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::types::{
    Activity, ChatReply, Decision, DecisionReason, Feedback, FeedbackPeriod, IntentOutcome,
    IntentType, PendingInput, ResponseCacheEntry, ResponseSource, UserStats,
};
pub use engine::config::EngineConfig;
pub use engine::flow::{FlowEngine, InputOutcome};
pub use engine::queue::{DrainOutcome, PendingQueue};
pub use engine::store::FlowStore;
