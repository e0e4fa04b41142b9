//! AI coach: conversational replies, the daily insight, and a small static
//! knowledge library.

use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::models::user::HealthProfile;
use crate::services::llm::{ChatTurn, CompletionRequest, LlmClient};

/// Turns of prior conversation forwarded to the model.
pub const HISTORY_TURNS: usize = 6;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Llm,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub suggestions: Vec<String>,
    pub source: Source,
}

pub const FALLBACK_REPLY: &str = "I understand your question. As your health coach, I'm here to \
help you achieve your goals through consistent, sustainable habits. Could you tell me more about \
what specific aspect you'd like to focus on?";

const LLM_SUGGESTIONS: [&str; 3] = [
    "How can I improve my routine?",
    "What should I focus on this week?",
    "Can you explain this concept more?",
];

const FALLBACK_SUGGESTIONS: [&str; 3] = [
    "How can I improve my morning routine?",
    "What should I track to measure progress?",
    "Can you help me with meal planning?",
];

pub fn chat_system_prompt(profile: &HealthProfile, context: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are an empathetic and knowledgeable health and fitness coach.\n\
         Your role is to provide personalized advice, motivation, and guidance.\n\n\
         Guidelines:\n\
         - Be supportive and encouraging\n\
         - Provide specific, actionable advice\n\
         - Ask follow-up questions to understand better\n\
         - Reference the user's goals and progress when relevant\n\
         - Keep responses concise (2-3 paragraphs max)\n",
    );

    prompt.push_str("\nUser Context:\n");
    prompt.push_str(&format!("- Goals: {}\n", profile.goals_text()));
    if let Some(level) = profile.activity_level {
        prompt.push_str(&format!("- Activity Level: {}\n", level.as_str()));
    }
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("- Conversation context: {context}\n"));
    }

    prompt
}

pub async fn chat(
    llm: &dyn LlmClient,
    profile: &HealthProfile,
    message: &str,
    context: Option<&str>,
    history: &[ChatTurn],
    timeout: Duration,
) -> ChatReply {
    let skip = history.len().saturating_sub(HISTORY_TURNS);
    let mut messages: Vec<ChatTurn> = history[skip..].to_vec();
    messages.push(ChatTurn::user(message));

    let request = CompletionRequest {
        system: chat_system_prompt(profile, context),
        messages,
        temperature: 0.8,
        max_tokens: 500,
        timeout,
        json_mode: false,
    };

    match llm.generate(request).await {
        Ok(response) => ChatReply {
            response,
            suggestions: LLM_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            source: Source::Llm,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Coach chat failed, using fallback reply");
            ChatReply {
                response: FALLBACK_REPLY.into(),
                suggestions: FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
                source: Source::Fallback,
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyInsight {
    pub title: String,
    pub message: String,
    pub category: String,
    #[serde(default)]
    pub action_items: Vec<String>,
}

pub fn fixed_insights() -> Vec<DailyInsight> {
    let insight = |title: &str, message: &str, category: &str, actions: [&str; 3]| DailyInsight {
        title: title.into(),
        message: message.into(),
        category: category.into(),
        action_items: actions.iter().map(|a| a.to_string()).collect(),
    };

    vec![
        insight(
            "The Power of Small Wins",
            "Celebrating small victories keeps motivation high. Every completed task is worth noticing.",
            "motivation",
            [
                "Log your daily wins in the app",
                "Share your progress with an accountability partner",
                "Reward yourself for consistency",
            ],
        ),
        insight(
            "Recovery is Progress",
            "Rest is when your body adapts and grows stronger. Recovery days are part of the plan.",
            "health",
            [
                "Schedule a rest day this week",
                "Aim for 7-8 hours of sleep tonight",
                "Try a gentle stretching session",
            ],
        ),
        insight(
            "Habit Stacking for Success",
            "Attach new habits to existing ones. Your morning coffee could be the perfect trigger for a 5-minute meditation.",
            "habit",
            [
                "Identify your strongest existing habits",
                "Choose one new habit to stack",
                "Practice for 7 days to build the connection",
            ],
        ),
    ]
}

fn random_fixed_insight() -> DailyInsight {
    let insights = fixed_insights();
    insights
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| insights[0].clone())
}

pub fn insight_prompt(profile: &HealthProfile, recent_activity: &str) -> String {
    format!(
        r#"Generate a brief, motivational daily insight for a health and fitness user.

User Info:
- Goals: {goals}
- Recent activity: {recent_activity}

The insight should acknowledge their progress, give one specific tip, and be
motivating but realistic. Keep the message to 1-2 sentences.

Return ONLY JSON:
{{"title": "short title", "message": "the insight", "category": "motivation" | "health" | "habit", "action_items": ["step 1", "step 2"]}}"#,
        goals = profile.goals_text(),
    )
}

pub async fn daily_insight(
    llm: &dyn LlmClient,
    profile: &HealthProfile,
    recent_activity: &str,
    timeout: Duration,
) -> (DailyInsight, Source) {
    let request = CompletionRequest {
        system: "You are a supportive health coach providing daily insights. \
                 Be concise and motivating. Respond with valid JSON only."
            .into(),
        messages: vec![ChatTurn::user(insight_prompt(profile, recent_activity))],
        temperature: 0.9,
        max_tokens: 200,
        timeout,
        json_mode: true,
    };

    let result = llm.generate(request).await.and_then(|text| {
        let insight: DailyInsight = serde_json::from_str(&text)?;
        if insight.message.trim().is_empty() {
            anyhow::bail!("empty insight message");
        }
        Ok(insight)
    });

    match result {
        Ok(insight) => (insight, Source::Llm),
        Err(e) => {
            tracing::warn!(error = %e, "Daily insight generation failed, using fixed insight");
            (random_fixed_insight(), Source::Fallback)
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KnowledgeArticle {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub relevance_score: f64,
}

struct Article {
    title: &'static str,
    summary: &'static str,
    content: &'static str,
    category: &'static str,
    tags: &'static [&'static str],
}

const LIBRARY: [Article; 5] = [
    Article {
        title: "Building Sustainable Habits",
        summary: "Learn how to create habits that last using the habit loop framework.",
        content: "The habit loop consists of three parts: cue, routine, and reward. \
                  Understanding this framework helps you design habits that stick.",
        category: "habits",
        tags: &["habits", "behavior-change", "psychology"],
    },
    Article {
        title: "Nutrition Fundamentals",
        summary: "Essential guide to balanced nutrition and meal planning.",
        content: "A balanced diet includes macronutrients (protein, carbs, fats) and \
                  micronutrients (vitamins, minerals). Plan meals around whole foods.",
        category: "nutrition",
        tags: &["nutrition", "health", "diet", "meal"],
    },
    Article {
        title: "Recovery and Sleep Optimization",
        summary: "Maximize your recovery through quality sleep and rest strategies.",
        content: "Sleep is crucial for muscle recovery, cognitive function, and overall \
                  health. Aim for 7-9 hours and keep a consistent schedule.",
        category: "recovery",
        tags: &["sleep", "recovery", "health", "energy"],
    },
    Article {
        title: "Stress Management Techniques",
        summary: "Evidence-based approaches to managing stress and anxiety.",
        content: "Chronic stress affects both mental and physical health. Key techniques \
                  include mindfulness and breathing exercises.",
        category: "mental-health",
        tags: &["stress", "mental-health", "wellness"],
    },
    Article {
        title: "Goal Setting Framework",
        summary: "Set and achieve meaningful health goals using SMART criteria.",
        content: "SMART goals are Specific, Measurable, Achievable, Relevant, and \
                  Time-bound. Break big goals into weekly targets.",
        category: "productivity",
        tags: &["goals", "productivity", "success"],
    },
];

const TITLE_WEIGHT: f64 = 3.0;
const TAG_WEIGHT: f64 = 2.0;
const BODY_WEIGHT: f64 = 1.0;

fn relevance(article: &Article, terms: &[String]) -> f64 {
    if terms.is_empty() {
        return 1.0;
    }

    let title = article.title.to_lowercase();
    let body = format!("{} {}", article.summary, article.content).to_lowercase();

    let hits: f64 = terms
        .iter()
        .map(|term| {
            let mut score = 0.0;
            if title.contains(term.as_str()) {
                score += TITLE_WEIGHT;
            }
            if article.tags.iter().any(|t| t.contains(term.as_str())) {
                score += TAG_WEIGHT;
            }
            if body.contains(term.as_str()) {
                score += BODY_WEIGHT;
            }
            score
        })
        .sum();

    let max = (TITLE_WEIGHT + TAG_WEIGHT + BODY_WEIGHT) * terms.len() as f64;
    ((hits / max) * 100.0).round() / 100.0
}

/// Keyword search over the article library. Articles matching no query term
/// are dropped; the rest come back best match first.
pub fn search_knowledge(query: &str, category: Option<&str>, limit: usize) -> Vec<KnowledgeArticle> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() > 1)
        .collect();

    let mut results: Vec<KnowledgeArticle> = LIBRARY
        .iter()
        .filter(|a| category.map_or(true, |c| a.category.eq_ignore_ascii_case(c)))
        .map(|a| (a, relevance(a, &terms)))
        .filter(|(_, score)| *score > 0.0)
        .map(|(a, score)| KnowledgeArticle {
            title: a.title.into(),
            summary: a.summary.into(),
            content: a.content.into(),
            category: a.category.into(),
            tags: a.tags.iter().map(|t| t.to_string()).collect(),
            relevance_score: score,
        })
        .collect();

    // Stable sort keeps library order among ties
    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::testing::StubLlm;
    use crate::services::llm::Role;

    fn timeout() -> Duration {
        Duration::from_secs(1)
    }

    #[test]
    fn test_system_prompt_carries_profile() {
        let profile = HealthProfile {
            goals: vec!["Run a 5k".into()],
            activity_level: Some(crate::models::user::ActivityLevel::Light),
            ..Default::default()
        };
        let prompt = chat_system_prompt(&profile, Some("after a bad night"));
        assert!(prompt.contains("- Goals: Run a 5k"));
        assert!(prompt.contains("- Activity Level: light"));
        assert!(prompt.contains("after a bad night"));
    }

    #[tokio::test]
    async fn test_chat_uses_llm_reply() {
        let llm = StubLlm::replying("Drink more water.");
        let reply = chat(&llm, &HealthProfile::default(), "Tips?", None, &[], timeout()).await;
        assert_eq!(reply.response, "Drink more water.");
        assert_eq!(reply.suggestions.len(), 3);
        assert_eq!(reply.source, Source::Llm);
    }

    #[tokio::test]
    async fn test_chat_falls_back() {
        let history: Vec<ChatTurn> = (0..10)
            .map(|i| ChatTurn {
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                content: format!("turn {i}"),
            })
            .collect();
        let llm = StubLlm::failing();
        let reply = chat(&llm, &HealthProfile::default(), "Hi", None, &history, timeout()).await;
        assert_eq!(reply.response, FALLBACK_REPLY);
        assert_eq!(reply.suggestions.len(), 3);
        assert_eq!(reply.source, Source::Fallback);
    }

    #[tokio::test]
    async fn test_insight_from_llm() {
        let llm = StubLlm::replying(
            r#"{"title":"Keep going","message":"Three days in a row!","category":"motivation"}"#,
        );
        let (insight, source) =
            daily_insight(&llm, &HealthProfile::default(), "3 tasks", timeout()).await;
        assert_eq!(source, Source::Llm);
        assert_eq!(insight.message, "Three days in a row!");
        assert!(insight.action_items.is_empty());
    }

    #[tokio::test]
    async fn test_insight_falls_back_to_fixed_set() {
        let llm = StubLlm::replying("plain text, not json");
        let (insight, source) =
            daily_insight(&llm, &HealthProfile::default(), "", timeout()).await;
        assert_eq!(source, Source::Fallback);
        assert!(fixed_insights().contains(&insight));
    }

    #[test]
    fn test_knowledge_ranks_by_keyword() {
        let results = search_knowledge("sleep recovery", None, 5);
        assert_eq!(results[0].title, "Recovery and Sleep Optimization");
        assert!(results[0].relevance_score > 0.5);
        assert!(results.iter().all(|a| a.relevance_score > 0.0));
    }

    #[test]
    fn test_knowledge_category_and_limit() {
        let results = search_knowledge("", Some("nutrition"), 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, "nutrition");

        assert_eq!(search_knowledge("", None, 2).len(), 2);
        assert!(search_knowledge("zzzz", None, 5).is_empty());
    }
}
