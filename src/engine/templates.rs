// TimeFlow Engine — Local Response Templates
// Pre-written motivational replies, keyed by category, used whenever the
// strategy decides a paid AI call is not worth it. Selection is random by
// default with a handful of context-aware overrides (rest after a long work
// stretch, streaks, heavy work days).

use crate::atoms::constants::DEFAULT_CATEGORY;
use crate::engine::nlp::normalize;
use rand::Rng;

/// Per-category template pools. Multiple options per category so routine
/// activities don't always get the same line back.
fn templates_for(category: &str) -> &'static [&'static str] {
    match category {
        "💼 Trabalho" => &[
            "Foco total! 💪",
            "Produtividade em alta! 🚀",
            "Vai que é sua! 💼",
            "Trabalho bem executado!",
            "Mantém o ritmo! ⚡",
            "Arrasando no trampo! 🔥",
            "Profissionalismo nota 10! ⭐",
            "Foco e determinação! 🎯",
        ],
        "🍳 Alimentação" => &[
            "Bom apetite! 🍽️",
            "Recarregando energias! ⚡",
            "Hora de se alimentar bem! 🥗",
            "Nutrição é fundamental! 💪",
            "Que seja delicioso! 😋",
            "Saboreando com calma! ☕",
            "Comida boa, vida boa! 🍲",
        ],
        "🚿 Higiene" => &[
            "Cuidando de você! ✨",
            "Higiene em dia! 🧼",
            "Renovado! 🚿",
            "Auto-cuidado importa! 💙",
            "Limpinho! 😊",
            "Fresquinho agora! 🌊",
            "Cuidados essenciais! ⭐",
        ],
        "🧘 Saúde" => &[
            "Saúde em primeiro lugar! 💚",
            "Descansando bem! 😴",
            "Corpo agradece! 🙏",
            "Equilíbrio é chave! ⚖️",
            "Cuidando do essencial! 💪",
            "Bem-estar garantido! ✨",
            "Mente e corpo em dia! 🧘",
        ],
        "🎮 Lazer" => &[
            "Aproveite! 🎉",
            "Momento de relaxar! 😌",
            "Diversão merecida! 🎮",
            "Equilíbrio é tudo! ⚖️",
            "Hora de curtir! 🎊",
            "Relaxa e aproveita! 🌟",
            "Lazer também é importante! 🎭",
        ],
        "🏠 Casa" => &[
            "Casa organizada! 🏡",
            "Lar bem cuidado! 💙",
            "Ambiente em ordem! ✨",
            "Limpeza feita! 🧹",
            "Organização top! 📦",
            "Casa arrumada, mente tranquila! 🌸",
            "Capricho no lar! 🏠",
        ],
        "📚 Estudos" => &[
            "Conhecimento é poder! 📖",
            "Aprendendo sempre! 🧠",
            "Evolução constante! 📈",
            "Dedicação aos estudos! ⭐",
            "Investindo em você! 💡",
            "Aprendizado contínuo! 🎓",
            "Foco nos estudos! 📚",
        ],
        "🛒 Compras" => &[
            "Comprinha em dia! 🛒",
            "Lista completa! ✅",
            "Abastecimento feito! 🛍️",
            "Organização nas compras! 📝",
        ],
        "🚗 Transporte" => &[
            "Bora lá! 🚗",
            "A caminho! 🛣️",
            "Deslocamento em curso! 🚙",
            "Viagem iniciada! ✈️",
        ],
        "👥 Social" => &[
            "Conexões importam! 💬",
            "Momento social! 👥",
            "Relacionamentos alimentam! 💙",
            "Bom papo! ☕",
            "Tempo de qualidade! ⭐",
        ],
        _ => &[
            "Registrado! ✅",
            "Atividade anotada! 📝",
            "Mais uma feita! 👍",
            "Continuando o dia! 🌟",
            "Ação registrada! ✔️",
            "Marcado! 📌",
        ],
    }
}

/// History context for template selection.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub previous_category: Option<String>,
    pub total_minutes_worked: i64,
    pub same_activity_count: i64,
}

/// Pick a local template for a category, honoring a few history-aware
/// special cases before falling back to a random choice from the pool.
pub fn local_template(category: &str, context: Option<&TemplateContext>) -> String {
    let pool = templates_for(category);

    let Some(ctx) = context else {
        return pick_random(pool);
    };

    let after_work = ctx.previous_category.as_deref() == Some("💼 Trabalho");

    // Rest after a long work stretch.
    if category == "🧘 Saúde" && after_work && ctx.total_minutes_worked > 180 {
        return "Descanso merecido após tanto trabalho! 😌".to_string();
    }

    // Leisure after a solid work block.
    if category == "🎮 Lazer" && after_work && ctx.total_minutes_worked > 120 {
        return "Trabalhou bem, agora é hora de relaxar! 🎮".to_string();
    }

    // Third-or-more repetition of the same activity today.
    if ctx.same_activity_count >= 3 {
        return pick_random(&[
            "De novo? Tá dedicado(a) hoje! 💪",
            "Mais uma rodada! Persistência é tudo! 🔄",
            "Caprichando na repetição! ✨",
        ]);
    }

    // 6h+ of work — nudge toward a pause.
    if category == "💼 Trabalho" && ctx.total_minutes_worked > 360 {
        return "Jornada intensa! Já pensou em uma pausa? 💼⏸️".to_string();
    }

    // First leisure of a light day.
    if category == "🎮 Lazer" && ctx.total_minutes_worked < 60 {
        return "Começando o dia com leveza! 😊".to_string();
    }

    pick_random(pool)
}

fn pick_random(pool: &[&str]) -> String {
    let idx = rand::rng().random_range(0..pool.len());
    pool[idx].to_string()
}

// ── Local category guess ───────────────────────────────────────────────────
// The strategy and template layers need a category before (and sometimes
// instead of) the AI's categorization. This keyword pass mirrors the rubric
// the activity prompt gives the model, over normalized text.

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("🚿 Higiene", &["banho", "dentes", "escovar", "barbear", "rosto", "higiene"]),
    ("🍳 Alimentação", &[
        "cozinhar", "comer", "comida", "almoco", "almocar", "jantar", "lanche", "cafe",
        "refeicao",
    ]),
    ("🧘 Saúde", &[
        "exercicio", "treino", "academia", "correr", "caminhar", "meditar", "meditacao",
        "dormir", "descansar", "descanso", "alongamento", "relaxar", "yoga",
    ]),
    ("🏠 Casa", &[
        "casa", "limpeza", "limpar", "organizar", "arrumar", "louca", "roupa", "faxina",
        "lavar",
    ]),
    ("📚 Estudos", &[
        "estudar", "estudando", "estudo", "curso", "leitura", "ler", "aprender", "faculdade",
        "pesquisa", "aula",
    ]),
    ("🎮 Lazer", &["jogar", "jogo", "serie", "filme", "assistir", "diversao", "hobby"]),
    ("🛒 Compras", &["comprar", "compras", "mercado", "supermercado", "feira"]),
    ("🚗 Transporte", &["dirigir", "viagem", "viajar", "onibus", "metro", "transporte"]),
    ("👥 Social", &["amigo", "amigos", "familia", "conversar", "encontro", "festa", "visita"]),
    ("💼 Trabalho", &[
        "trabalho", "trabalhar", "projeto", "reuniao", "tarefa", "programar", "programacao",
        "desenvolvimento", "codigo", "deploy", "cliente", "apresentacao", "relatorio",
        "email", "bug",
    ]),
];

/// Best-effort local categorization from title keywords. Falls back to the
/// catch-all category when nothing matches.
pub fn guess_category(title: &str) -> &'static str {
    let normalized = normalize(title);
    let words: Vec<&str> = normalized.split_whitespace().collect();

    for (category, keywords) in CATEGORY_KEYWORDS {
        if words.iter().any(|w| keywords.contains(w)) {
            return category;
        }
    }
    DEFAULT_CATEGORY
}

// ── Tests ──────────────────────────────────────────────────────────────────
