// TimeFlow Engine — Intent Classification
// The AI decides whether free text is an activity to register, a chat turn,
// a question, or feedback about the app.
//
// Fail-open by contract: a missing credential, transport error or malformed
// reply yields `using_fallback=true` with the conservative default type
// (`activity`) — unclassifiable input must never be lost, only deferred.
// Classification itself never returns an error to the caller.

use crate::atoms::constants::OFFLINE_NOTICE;
use crate::atoms::types::{ChatMessage, IntentOutcome, IntentReply, IntentType};
use crate::engine::provider::{parse_reply, ChatProvider};
use log::{info, warn};
use regex::Regex;
use std::sync::LazyLock;

/// Fixed classifier instruction (app content stays in Portuguese).
const INTENT_SYSTEM_PROMPT: &str = "\
Você é um classificador de intenção. Analise o texto do usuário e determine se ele quer:
- \"activity\": registrar uma atividade/tarefa (ex: \"limpeza casa\", \"jogar\", \"trabalhar\", \"estudando\")
- \"chat\": conversar ou desabafar (ex: \"estou desanimado\", \"tô cansado\", \"não sei o que fazer\")
- \"question\": fazer uma pergunta (ex: \"como funciona?\", \"por que preciso disso?\")
- \"feedback\": dar feedback sobre o sistema (ex: \"você é chato\", \"isso é legal\", \"não gostei\")

Responda APENAS com um JSON no formato:
{\"type\": \"activity\"|\"chat\"|\"question\"|\"feedback\", \"confidence\": 0.0-1.0, \"reasoning\": \"breve explicação\"}

Seja preciso e direto. Textos muito curtos como \"jogar\", \"limpeza\" são atividades. Emoções e desabafos são chat.";

/// Classify user input. `provider` is `None` when no API key is configured,
/// which is treated identically to an unreachable endpoint.
pub async fn classify(provider: Option<&dyn ChatProvider>, text: &str) -> IntentOutcome {
    let Some(provider) = provider else {
        return offline_outcome();
    };

    let messages = [
        ChatMessage::system(INTENT_SYSTEM_PROMPT),
        ChatMessage::user(text),
    ];

    // Low temperature for consistent classification; the reply is tiny.
    let content = match provider.chat(&messages, 0.3, 100).await {
        Ok(content) => content,
        Err(e) => {
            warn!("[intent] Classification call failed: {e}");
            return offline_outcome();
        }
    };

    match parse_reply::<IntentReply>(&content) {
        Ok(reply) => {
            info!(
                "[intent] \"{}\" → {:?} ({:.2})",
                text, reply.kind, reply.confidence
            );
            IntentOutcome {
                kind: reply.kind,
                confidence: reply.confidence,
                reasoning: reply.reasoning,
                using_fallback: false,
                fallback_message: None,
            }
        }
        Err(e) => {
            warn!("[intent] {e}");
            offline_outcome()
        }
    }
}

/// The conservative fallback: treat the input as an activity so it is queued
/// rather than dropped, and tell the user the classifier is offline.
fn offline_outcome() -> IntentOutcome {
    IntentOutcome {
        kind: IntentType::Activity,
        confidence: 0.0,
        reasoning: None,
        using_fallback: true,
        fallback_message: Some(OFFLINE_NOTICE.to_string()),
    }
}

// ── Explicit activity prefixes ─────────────────────────────────────────────

static FORCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["^registrar:", "^atividade:", "^task:", "^fazendo:", "^inicio:"]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Whether the user explicitly asked for activity mode (e.g. "registrar: x"),
/// bypassing classification entirely.
pub fn should_force_activity(text: &str) -> bool {
    let normalized = text.to_lowercase();
    FORCE_PATTERNS.iter().any(|p| p.is_match(&normalized))
}

// ── Tests ──────────────────────────────────────────────────────────────────
