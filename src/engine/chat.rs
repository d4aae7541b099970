// TimeFlow Engine — Conversational Replies
// For input classified as chat/question/feedback: a short empathetic reply,
// never an activity registration. Degrades to a canned empathetic line when
// the provider errors, so a conversational turn never surfaces an error.

use crate::atoms::constants::FALLBACK_CHAT_RESPONSE;
use crate::atoms::types::{ChatMessage, ChatReply, ChatTone, TodayTotals};
use crate::engine::provider::{parse_reply, ChatProvider};
use log::warn;

const CHAT_SYSTEM_PROMPT: &str =
    "Você é um coach empático e humano. Priorize compreensão sobre produtividade.";

/// Day context folded into the conversation prompt.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub today: TodayTotals,
    /// (title, minutes running) of the ongoing activity, if any.
    pub current_activity: Option<(String, i64)>,
    /// (theme, score) of the latest rollup, if any.
    pub last_feedback: Option<(String, f64)>,
}

fn build_prompt(message: &str, context: &ChatContext) -> String {
    let current = match &context.current_activity {
        Some((title, minutes)) => format!("- Atividade atual: {title} (há {minutes}min)"),
        None => "- Nenhuma atividade em andamento".to_string(),
    };
    let feedback = match &context.last_feedback {
        Some((theme, score)) => format!("\n- Último feedback: {theme} ({score}/10)"),
        None => String::new(),
    };

    format!(
        "Você é um coach de produtividade empático e humano. O usuário quer CONVERSAR com você, não registrar atividade.

Mensagem do usuário: \"{message}\"

CONTEXTO DO DIA:
- {} atividades registradas hoje
- {}h{}min trabalhados
{current}{feedback}

Responda de forma:
- EMPÁTICA se usuário expressar emoção negativa
- MOTIVADORA se usuário estiver desanimado
- COMPREENSIVA se usuário criticar o sistema
- NATURAL e HUMANA (como um amigo)
- CURTA (máximo 3 frases)

Retorne APENAS JSON:
{{
  \"message\": \"sua resposta empática e natural\",
  \"type\": \"empathy|motivation|answer|acknowledgment\",
  \"suggestion\": \"opcional: sugestão leve de atividade se fizer sentido\"
}}

IMPORTANTE:
- NÃO force o usuário a trabalhar
- Valide os sentimentos dele
- Se ele criticar você, aceite com humildade
- Se ele estiver cansado, reconheça isso
- Seja um AMIGO, não um chefe",
        context.today.activities_count,
        context.today.total_minutes / 60,
        context.today.total_minutes % 60,
    )
}

/// Produce a conversational reply. `provider=None` (offline) and provider
/// errors both land on the empathetic canned fallback.
pub async fn chat_reply(
    provider: Option<&dyn ChatProvider>,
    message: &str,
    context: &ChatContext,
) -> ChatReply {
    let Some(provider) = provider else {
        return fallback_reply(message);
    };

    let messages = [
        ChatMessage::system(CHAT_SYSTEM_PROMPT),
        ChatMessage::user(build_prompt(message, context)),
    ];

    // High temperature — conversation should feel human, not canned.
    match provider.chat(&messages, 0.9, 250).await {
        Ok(content) => match parse_reply::<ChatReply>(&content) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[chat] {e}");
                fallback_reply(message)
            }
        },
        Err(e) => {
            warn!("[chat] Conversation call failed: {e}");
            fallback_reply(message)
        }
    }
}

/// Canned empathetic reply for offline/errored turns. Tired or discouraged
/// messages get validation instead of the generic acknowledgment.
fn fallback_reply(message: &str) -> ChatReply {
    let lowered = message.to_lowercase();
    if lowered.contains("desanimado") || lowered.contains("cansado") {
        return ChatReply {
            message:
                "Entendo como você se sente. Às vezes precisamos de uma pausa. Está tudo bem! 💙"
                    .to_string(),
            tone: ChatTone::Empathy,
            suggestion: None,
        };
    }
    ChatReply {
        message: FALLBACK_CHAT_RESPONSE.to_string(),
        tone: ChatTone::Acknowledgment,
        suggestion: None,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::provider::testing::{CannedReply, MockProvider};

    #[tokio::test]
    async fn parses_reply_with_tone() {
        let provider = MockProvider::new().with(CannedReply::Content(
            r#"{"message": "Força! Você consegue. 💪", "type": "motivation"}"#.to_string(),
        ));
        let reply = chat_reply(Some(&provider), "tô sem vontade", &ChatContext::default()).await;
        assert_eq!(reply.tone, ChatTone::Motivation);
        assert!(reply.message.contains("Força"));
    }

    #[tokio::test]
    async fn offline_uses_empathetic_fallback_for_tired_user() {
        let reply = chat_reply(None, "estou muito cansado", &ChatContext::default()).await;
        assert_eq!(reply.tone, ChatTone::Empathy);
        assert!(reply.message.contains("pausa"));
    }

    #[tokio::test]
    async fn provider_error_never_surfaces() {
        let provider = MockProvider::new().with(CannedReply::TransportError);
        let reply = chat_reply(Some(&provider), "isso é útil?", &ChatContext::default()).await;
        assert_eq!(reply.tone, ChatTone::Acknowledgment);
    }

    #[test]
    fn prompt_reports_current_activity() {
        let context = ChatContext {
            today: TodayTotals { activities_count: 2, total_minutes: 130 },
            current_activity: Some(("revisar código".to_string(), 40)),
            last_feedback: None,
        };
        let prompt = build_prompt("oi", &context);
        assert!(prompt.contains("Atividade atual: revisar código (há 40min)"));
        assert!(prompt.contains("2h10min trabalhados"));
    }
}
