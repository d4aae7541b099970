// TimeFlow Engine — AI Activity Processing
// Turns a raw activity title into a short summary, a category and a
// motivational reply, using the day's context to handle transitions
// ("finalizei o projeto, agora vou tomar banho" → the NEW activity wins).
//
// Unlike classification this path is NOT fail-open: errors bubble up so the
// pending queue keeps the item for a later tick. The live submission path
// maps errors to a template fallback instead (see flow.rs).

use crate::atoms::error::EngineResult;
use crate::atoms::types::{ActivityContext, ActivityInsight, ChatMessage};
use crate::engine::provider::{parse_reply, ChatProvider};
use log::info;

const ACTIVITY_SYSTEM_PROMPT: &str =
    "Você é um coach de produtividade empático e motivador. Responda sempre em JSON válido.";

/// Build the activity prompt (app content stays in Portuguese).
fn build_prompt(title: &str, context: &ActivityContext) -> String {
    let context_info = match &context.previous {
        Some(prev) => format!(
            "\n\nATIVIDADE ANTERIOR: \"{}\" ({}min)\nCATEGORIA: {}",
            prev.title,
            prev.duration_minutes,
            prev.category.as_deref().unwrap_or("N/A"),
        ),
        None => "\n\n(Primeira atividade do dia)".to_string(),
    };

    let stats_info = format!(
        "\n\nESTATÍSTICAS DE HOJE:\n- {} atividades registradas\n- {}h{}min trabalhados",
        context.today.activities_count,
        context.today.total_minutes / 60,
        context.today.total_minutes % 60,
    );

    format!(
        "Você é um assistente de produtividade que responde INSTANTANEAMENTE ao usuário.

O usuário acabou de dizer: \"{title}\"

Retorne APENAS um JSON válido (sem markdown):
{{
  \"summary\": \"nome curto e claro (max 4 palavras)\",
  \"category\": \"emoji + categoria (ex: 🏠 Casa, 💼 Trabalho, 🎮 Lazer, 🍳 Alimentação, 🚿 Higiene, 🧘 Saúde, 📚 Estudos)\",
  \"response\": \"resposta motivacional CURTA (1 frase, max 15 palavras, use emoji)\"
}}

REGRAS DE CATEGORIZAÇÃO:
- Se mencionou FINALIZAR/CONCLUIR projeto/trabalho E algo pessoal depois (banho, descansar, etc), use a categoria da NOVA atividade pessoal
- 💼 Trabalho: projetos, reuniões, tarefas profissionais, programação, desenvolvimento
- 🏠 Casa: limpeza, organização, arrumar casa, tarefas domésticas
- 🚿 Higiene: banho, escovar dentes, lavar rosto, barbear, cuidados pessoais
- 🧘 Saúde: exercícios, descanso, meditação, dormir, alongamento, relaxar
- 🍳 Alimentação: cozinhar, comer, preparar comida, almoço, jantar, lanche
- 🎮 Lazer: jogos, séries, filmes, hobby, diversão, entretenimento
- 📚 Estudos: cursos, leitura, aprendizado, faculdade, pesquisa

IMPORTANTE:
- Summary: foque na PRÓXIMA ação se houver transição (ex: \"Banho\" se disse \"finalizei X agora vou tomar banho\")
- Category: escolha baseado na PRÓXIMA atividade, não na anterior mencionada
- Response: reconheça a conquista E incentive a próxima ação{context_info}{stats_info}

Seja natural e humano!"
    )
}

/// Ask the AI to summarize, categorize and respond to a new activity.
pub async fn process_activity(
    provider: &dyn ChatProvider,
    title: &str,
    context: &ActivityContext,
) -> EngineResult<ActivityInsight> {
    let messages = [
        ChatMessage::system(ACTIVITY_SYSTEM_PROMPT),
        ChatMessage::user(build_prompt(title, context)),
    ];

    let content = provider.chat(&messages, 0.7, 200).await?;
    let insight: ActivityInsight = parse_reply(&content)?;

    info!(
        "[activity] \"{}\" → {} / {}",
        title, insight.category, insight.summary
    );
    Ok(insight)
}

// ── Tests ──────────────────────────────────────────────────────────────────
