// TimeFlow Engine — Daily & Weekly Rollups
// Once a day closes, its raw activity log is distilled into a single
// feedback record (theme, 0–10 score, insights, a suggestion for tomorrow)
// and the raw rows are purged. The analyst prompt carries the last week of
// rollups so suggestions stay personalized over time.
//
// Unlike the live pipeline this path has NO fallback: the rollup is an
// AI product, so provider absence or failure aborts with an error, nothing
// is purged, and the caller retries on a later trigger.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{
    AnalysisReply, ChatMessage, Feedback, FeedbackPeriod,
};
use crate::engine::provider::{parse_reply, ChatProvider};
use crate::engine::store::FlowStore;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use log::info;

const ANALYSIS_SYSTEM_PROMPT: &str = "\
Você é um coach de produtividade INTELIGENTE que APRENDE com o usuário ao longo do tempo.

IMPORTANTE: Use o histórico dos dias anteriores para:
- Identificar padrões de comportamento
- Reconhecer progresso ou regressão
- Adaptar sugestões baseadas no que funcionou antes
- Ser cada vez mais personalizado e específico

Retorne APENAS um JSON válido (sem markdown):
{
  \"theme\": \"tema principal do dia em 2-4 palavras\",
  \"score\": número de 0 a 10,
  \"insights\": [\"insight específico 1\", \"insight específico 2\", \"insight específico 3\"],
  \"suggestion\": \"sugestão PERSONALIZADA para amanhã baseada no histórico\"
}

Seja direto, honesto, construtivo e ADAPTATIVO. Quanto mais dias, mais personalizado você deve ser.";

/// How many past rollups feed the analyst prompt as history.
const HISTORY_DAYS: u32 = 7;

/// Roll up one day's activities into a feedback record, then purge them.
/// Returns `None` when the rollup is skipped (already done, or nothing to
/// analyze) and the saved feedback otherwise.
pub async fn run_daily_analysis(
    store: &FlowStore,
    provider: Option<&dyn ChatProvider>,
    date: NaiveDate,
) -> EngineResult<Option<Feedback>> {
    let date_str = date.to_string();

    if store.feedback_exists(&date_str, FeedbackPeriod::Daily)? {
        info!("[analysis] Rollup already exists for {date_str}");
        return Ok(None);
    }

    let from = day_bound(date);
    let to = day_bound(date + chrono::Duration::days(1));
    let activities = store.activities_between(from, to)?;
    if activities.is_empty() {
        info!("[analysis] No activities to analyze for {date_str}");
        return Ok(None);
    }

    // The rollup is mandatory-AI: no key, no analysis.
    let provider = provider.ok_or_else(|| {
        EngineError::Config("daily analysis requires a configured AI provider".to_string())
    })?;

    let timeline: Vec<String> = activities
        .iter()
        .map(|a| {
            format!(
                "{} - {} ({}min)",
                a.started_at.format("%H:%M"),
                a.summary.as_deref().unwrap_or(&a.title),
                a.duration_minutes.unwrap_or(0),
            )
        })
        .collect();

    let history = history_context(store)?;
    let user_message = format!(
        "Atividades de hoje:\n\n{}{}",
        timeline.join("\n"),
        history
    );

    info!("[analysis] Analyzing {} activities for {date_str}", activities.len());

    let messages = [
        ChatMessage::system(ANALYSIS_SYSTEM_PROMPT),
        ChatMessage::user(user_message),
    ];
    let content = provider.chat(&messages, 0.8, 600).await?;
    let reply: AnalysisReply = parse_reply(&content)?;

    let feedback = Feedback {
        id: None,
        date: date_str.clone(),
        period: FeedbackPeriod::Daily,
        theme: Some(reply.theme),
        score: Some(reply.score.clamp(0.0, 10.0)),
        insights: reply.insights,
        suggestion: Some(reply.suggestion),
        created_at: Utc::now(),
    };
    store.add_feedback(&feedback)?;

    // Purge only after the rollup is durably saved.
    let purged = store.delete_activities_between(from, to)?;
    info!(
        "[analysis] Rollup saved for {date_str} ({:?}, {:.0}/10) — {purged} raw activities purged",
        feedback.theme, reply.score.clamp(0.0, 10.0)
    );

    Ok(Some(feedback))
}

/// Roll the week ending at `sunday` (inclusive) into a weekly record, built
/// from that week's daily rollups. Raw activities are untouched — the daily
/// pass already purged them.
pub async fn run_weekly_analysis(
    store: &FlowStore,
    provider: Option<&dyn ChatProvider>,
    sunday: NaiveDate,
) -> EngineResult<Option<Feedback>> {
    let monday = sunday - chrono::Duration::days(6);
    let date_str = monday.to_string();

    if store.feedback_exists(&date_str, FeedbackPeriod::Weekly)? {
        return Ok(None);
    }

    let sunday_str = sunday.to_string();
    let dailies: Vec<Feedback> = store
        .recent_feedbacks(31)?
        .into_iter()
        .filter(|f| f.period == FeedbackPeriod::Daily)
        .filter(|f| f.date >= date_str && f.date <= sunday_str)
        .collect();
    if dailies.is_empty() {
        info!("[analysis] No daily rollups in week of {date_str}");
        return Ok(None);
    }

    let provider = provider.ok_or_else(|| {
        EngineError::Config("weekly analysis requires a configured AI provider".to_string())
    })?;

    let week_summary: Vec<String> = dailies
        .iter()
        .map(|f| {
            format!(
                "{} ({:.0}/10) - {}\n  Insights: {}",
                f.date,
                f.score.unwrap_or(0.0),
                f.theme.as_deref().unwrap_or("sem tema"),
                f.insights.join(", "),
            )
        })
        .collect();

    let user_message = format!(
        "Resumo da semana ({} a {}), um dia por linha:\n\n{}\n\nFaça a análise DA SEMANA como um todo.",
        monday, sunday,
        week_summary.join("\n\n"),
    );

    let messages = [
        ChatMessage::system(ANALYSIS_SYSTEM_PROMPT),
        ChatMessage::user(user_message),
    ];
    let content = provider.chat(&messages, 0.8, 600).await?;
    let reply: AnalysisReply = parse_reply(&content)?;

    let feedback = Feedback {
        id: None,
        date: date_str,
        period: FeedbackPeriod::Weekly,
        theme: Some(reply.theme),
        score: Some(reply.score.clamp(0.0, 10.0)),
        insights: reply.insights,
        suggestion: Some(reply.suggestion),
        created_at: Utc::now(),
    };
    store.add_feedback(&feedback)?;
    Ok(Some(feedback))
}

/// Days before `today` that still have raw activities but no daily rollup,
/// oldest first — the catch-up list for users who skipped a few days.
pub fn pending_rollup_dates(store: &FlowStore, today: NaiveDate) -> EngineResult<Vec<NaiveDate>> {
    let from = day_bound(today - chrono::Duration::days(90));
    let to = day_bound(today);
    let activities = store.activities_between(from, to)?;

    let mut dates: Vec<NaiveDate> = activities
        .iter()
        .map(|a| a.started_at.date_naive())
        .collect();
    dates.sort();
    dates.dedup();

    let mut pending = Vec::new();
    for date in dates {
        if !store.feedback_exists(&date.to_string(), FeedbackPeriod::Daily)? {
            pending.push(date);
        }
    }
    Ok(pending)
}

/// "Sunday 23:59" style trigger helper: which rollups are due at `now`.
/// Daily is always due for yesterday-and-earlier days with activities;
/// weekly is due on Sundays.
pub fn weekly_due(now: DateTime<Utc>) -> bool {
    now.date_naive().weekday() == chrono::Weekday::Sun
}

fn day_bound(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn history_context(store: &FlowStore) -> EngineResult<String> {
    let previous = store.recent_feedbacks(HISTORY_DAYS)?;
    if previous.is_empty() {
        return Ok("\n\n(Primeiro dia de análise - sem histórico ainda)".to_string());
    }

    let lines: Vec<String> = previous
        .iter()
        .map(|f| {
            format!(
                "{} ({:.0}/10) - {}\n  Insights: {}\n  Sugestão dada: {}",
                f.date,
                f.score.unwrap_or(0.0),
                f.theme.as_deref().unwrap_or("sem tema"),
                f.insights.join(", "),
                f.suggestion.as_deref().unwrap_or("nenhuma"),
            )
        })
        .collect();

    Ok(format!(
        "\n\nHISTÓRICO DOS ÚLTIMOS DIAS (use para aprender padrões do usuário):\n{}",
        lines.join("\n\n")
    ))
}

// ── Tests ──────────────────────────────────────────────────────────────────
