// ── TimeFlow Atoms: Constants ──────────────────────────────────────────────
// All named constants for the crate live here.
// Rationale: collecting constants in one place eliminates magic strings,
// makes auditing easier, and keeps every layer's code self-documenting.

// ── AI endpoint defaults ───────────────────────────────────────────────────
// Overridable via TIMEFLOW_BASE_URL / TIMEFLOW_MODEL; the defaults match the
// hosted DeepSeek chat-completions API.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Environment variable holding the API key. Its absence is a valid state
/// (AI offline, inputs queue up) — never a startup error.
pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

// ── Response strategy thresholds ───────────────────────────────────────────
// These four values encode the cost/latency policy: the cache short-circuits
// everything, the AI-forcing rules protect engagement quality, and the
// template default minimizes paid calls. Rule order lives in strategy.rs.

/// Minimum Jaccard similarity for a cached response to be reused.
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Users with fewer total activities than this always get a live AI reply.
pub const ONBOARDING_ACTIVITY_COUNT: i64 = 20;

/// Hours without an AI reply after which the next activity forces one.
pub const REENGAGEMENT_HOURS: i64 = 24;

/// Keywords (normalized form) that mark an activity as important enough to
/// warrant a live AI reply regardless of routine-ness.
pub const IMPORTANT_KEYWORDS: &[&str] = &[
    "projeto",
    "importante",
    "reuniao",
    "apresentacao",
    "entrevista",
    "prova",
    "exame",
    "urgente",
    "cliente",
];

// ── Text normalization ─────────────────────────────────────────────────────

/// Portuguese articles, contractions and filler verb forms removed before
/// keyword extraction. Listed in their accent-stripped form ("tô" → "to").
pub const STOPWORDS: &[&str] = &[
    "o", "a", "os", "as", "um", "uma", "de", "da", "do", "das", "dos", "em", "no", "na", "nos",
    "nas", "para", "pra", "pro", "vou", "vamos", "estou", "to", "indo", "fazer",
];

/// Keywords shorter than this many chars are dropped (4+ letters survive).
pub const MIN_KEYWORD_LEN: usize = 4;

/// At most this many keywords are kept per title.
pub const MAX_KEYWORDS: usize = 3;

// ── Retention ──────────────────────────────────────────────────────────────

/// Cached responses unused for this long are eligible for eviction.
pub const CACHE_EVICT_DAYS: i64 = 30;

/// Processed pending inputs are kept this long as an audit trail, then
/// evicted — mirrors the response-cache policy.
pub const PENDING_EVICT_DAYS: i64 = 30;

// ── Pending queue timing ───────────────────────────────────────────────────
// Fixed intervals: the cooldown and tick never grow under sustained failure.
// That is a deliberate non-goal of resilience engineering for a personal tool.

/// Seconds between background drain ticks.
pub const DRAIN_TICK_SECS: u64 = 15;

/// Minimum seconds between failed drain attempts (anti-thrash while the AI
/// is still unreachable). Cleared on success so a backlog drains promptly.
pub const DRAIN_COOLDOWN_SECS: u64 = 5;

/// Per-attempt timeout for intent classification during a drain.
pub const INTENT_TIMEOUT_SECS: u64 = 8;

/// Per-attempt timeout for downstream processing (activity or chat).
pub const PROCESS_TIMEOUT_SECS: u64 = 20;

/// Pause between successive items when clearing a recovered backlog, so the
/// endpoint is not hit in a burst.
pub const INTER_ITEM_DELAY_MS: u64 = 1_000;

// ── User-facing strings (app content stays in Portuguese) ──────────────────

/// Shown whenever classification falls back because the AI is unreachable.
pub const OFFLINE_NOTICE: &str =
    "🔌 IA offline - Seus inputs estão sendo salvos para análise posterior";

/// Category assigned when no better guess exists.
pub const DEFAULT_CATEGORY: &str = "📝 Outros";

/// Canned reply when a live activity submission loses the AI mid-flight.
pub const FALLBACK_ACTIVITY_RESPONSE: &str = "Registrado! Continue assim! 💪";

/// Canned chat reply when the provider errors on a conversational turn.
pub const FALLBACK_CHAT_RESPONSE: &str =
    "Desculpe, preciso estar configurado para conversar com você! 😊";
