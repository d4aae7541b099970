// ── TimeFlow Atoms: Pure Data Types ────────────────────────────────────────
// All plain struct/enum definitions with no logic.
// Atoms layer rule: no I/O, no side effects, no imports from engine/.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Chat wire types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::User, content: content.into() }
    }
}

// ── Activities ─────────────────────────────────────────────────────────────

/// Where an activity's motivational response came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Ai,
    Cache,
    Template,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Ai => "ai",
            ResponseSource::Cache => "cache",
            ResponseSource::Template => "template",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Option<i64>,
    pub title: String,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub ai_response: Option<String>,
    /// Recorded so `UserStats::last_ai_response_date` can be derived from the
    /// store instead of a side channel.
    pub response_source: Option<ResponseSource>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
}

// ── Pending inputs ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInput {
    pub id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    /// JSON-serialized `ProcessedResult`, set when the item drains.
    pub result: Option<String>,
}

/// Audit payload stored on a pending input once it has been drained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedResult {
    pub intent: IntentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

// ── Response cache ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCacheEntry {
    pub id: i64,
    /// Always the normalized form of the original title — never the raw text.
    pub activity_pattern: String,
    pub category: String,
    pub response: String,
    pub usage_count: i64,
    pub last_used: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ── Feedback rollups ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackPeriod {
    Daily,
    Weekly,
}

impl FeedbackPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackPeriod::Daily => "daily",
            FeedbackPeriod::Weekly => "weekly",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Option<i64>,
    /// ISO date (YYYY-MM-DD) the rollup covers; for weekly rollups, the
    /// Monday of the covered week.
    pub date: String,
    pub period: FeedbackPeriod,
    pub theme: Option<String>,
    pub score: Option<f64>,
    pub insights: Vec<String>,
    pub suggestion: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ── User stats (ephemeral, recomputed per request) ─────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub total_activities_registered: i64,
    pub last_ai_response_date: Option<DateTime<Utc>>,
    pub today_activities_count: i64,
}

// ── Intent classification ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentType {
    Activity,
    Chat,
    Question,
    Feedback,
}

impl IntentType {
    /// Anything that is not an activity routes to the chat reply path.
    pub fn is_activity(&self) -> bool {
        matches!(self, IntentType::Activity)
    }
}

/// Wire shape the classifier model is instructed to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentReply {
    #[serde(rename = "type")]
    pub kind: IntentType,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Classification result including the fail-open fallback signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentOutcome {
    #[serde(rename = "type")]
    pub kind: IntentType,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub using_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_message: Option<String>,
}

// ── AI activity processing ─────────────────────────────────────────────────

/// Wire shape the activity-processing model is instructed to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityInsight {
    /// Short name for the activity (max ~4 words).
    pub summary: String,
    /// Emoji + category, e.g. "🏠 Casa".
    pub category: String,
    /// One-line motivational reply.
    pub response: String,
}

/// Context handed to the AI alongside a new activity title.
#[derive(Debug, Clone, Default)]
pub struct ActivityContext {
    pub previous: Option<PreviousActivity>,
    pub today: TodayTotals,
}

#[derive(Debug, Clone)]
pub struct PreviousActivity {
    pub title: String,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TodayTotals {
    pub activities_count: i64,
    pub total_minutes: i64,
}

// ── Chat replies ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatTone {
    Empathy,
    Motivation,
    Answer,
    Acknowledgment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(rename = "type")]
    pub tone: ChatTone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

// ── Strategy decision ──────────────────────────────────────────────────────

/// Which rule of the response strategy fired. Order matters and is encoded in
/// `strategy::decide` — this enum only names the outcomes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    CacheHit,
    Onboarding,
    FirstOfDay,
    Reengagement,
    ImportantActivity,
    Routine,
}

impl DecisionReason {
    pub fn label(&self) -> &'static str {
        match self {
            DecisionReason::CacheHit => "cache",
            DecisionReason::Onboarding => "onboarding",
            DecisionReason::FirstOfDay => "first activity of day",
            DecisionReason::Reengagement => "re-engagement",
            DecisionReason::ImportantActivity => "important activity",
            DecisionReason::Routine => "routine",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub use_ai: bool,
    pub reason: DecisionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_response: Option<String>,
}

// ── Analysis rollups (wire shape) ──────────────────────────────────────────

/// Wire shape the daily/weekly analysis model is instructed to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReply {
    pub theme: String,
    pub score: f64,
    pub insights: Vec<String>,
    pub suggestion: String,
}
