//! Roadmap and weekly task generation.
//!
//! Both generators ask the LLM for JSON and fall back to a fixed plan when the
//! call fails or the reply does not parse.

use std::fmt::Display;
use std::time::Duration;

use chrono::{Duration as Days, NaiveDate};
use serde::Deserialize;

use crate::models::plan::{Phase, Roadmap, Timeline};
use crate::models::task::{NewTask, TaskPriority, TimeOfDay};
use crate::models::user::{ActivityLevel, HealthProfile};
use crate::services::llm::{ChatTurn, CompletionRequest, LlmClient};

pub const PLAN_TITLE: &str = "Your Personalized Health Journey";
pub const PLAN_DESCRIPTION: &str = "A customized plan to help you achieve your health goals";
pub const REGENERATED_TITLE: &str = "Your Regenerated Health Journey";
pub const REGENERATED_DESCRIPTION: &str = "An updated plan optimized based on your progress";

const DAYS_PER_WEEK: i64 = 7;
const MAX_TASKS_PER_WEEK: usize = 28;

/// Hard constraints injected into every generation prompt.
pub fn safety_rules(profile: &HealthProfile) -> Vec<&'static str> {
    let mut rules = Vec::new();

    if let Some(age) = profile.age {
        if age < 18 {
            rules.push("User is under 18: Only light exercises, no heavy weights");
        } else if age > 65 {
            rules.push(
                "User is senior (65+): Focus on low-impact exercises, flexibility, balance",
            );
        }
    }

    if let Some(bmi) = profile.bmi() {
        if bmi < 18.5 {
            rules.push(
                "User is underweight (BMI < 18.5): Focus on strength building, avoid excessive cardio",
            );
        } else if bmi > 30.0 {
            rules.push(
                "User has obesity (BMI > 30): Start with low-impact exercises, gradual progression",
            );
        }
    }

    if profile.activity_level == Some(ActivityLevel::Sedentary) {
        rules.push("User is sedentary: Start very gradually, max 20-30 min sessions initially");
    }

    rules
}

fn safety_section(profile: &HealthProfile) -> String {
    let rules = safety_rules(profile);
    if rules.is_empty() {
        "No special constraints".into()
    } else {
        rules
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn or_unknown<T: Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "Not provided".into())
}

pub fn roadmap_prompt(profile: &HealthProfile, progress_summary: Option<&str>) -> String {
    let progress = progress_summary
        .map(|p| format!("\nRecent Progress:\n{p}\n"))
        .unwrap_or_default();

    format!(
        r#"You are a professional certified health and fitness coach creating a personalized 12-week health journey.

User Profile:
- Age: {age}
- Gender: {gender}
- Current Weight: {weight} kg
- Goal Weight: {goal_weight} kg
- Height: {height} cm
- Activity Level: {activity}
- Primary Goals: {goals}
{progress}
SAFETY CONSTRAINTS (MUST FOLLOW):
{safety}

Create a structured 12-week roadmap with EXACTLY 3 progressive phases:
Phase 1 (Foundation): Weeks 1-4, building baseline habits and routines.
Phase 2 (Progress): Weeks 5-8, increasing intensity and variety.
Phase 3 (Optimization): Weeks 9-12, fine-tuning for long-term sustainability.

Return ONLY valid JSON with this EXACT structure:
{{
    "phases": [
        {{
            "name": "Foundation",
            "duration": "4 weeks",
            "goals": ["specific goal 1", "specific goal 2", "specific goal 3"],
            "milestones": ["measurable milestone 1", "measurable milestone 2"]
        }}
    ],
    "timeline": {{
        "total_duration": "12 weeks",
        "estimated_completion": "Specific completion description based on user's goal"
    }}
}}"#,
        age = or_unknown(profile.age),
        gender = or_unknown(profile.gender.map(|g| format!("{g:?}").to_lowercase())),
        weight = or_unknown(profile.current_weight),
        goal_weight = or_unknown(profile.goal_weight),
        height = or_unknown(profile.height_cm),
        activity = or_unknown(profile.activity_level.map(|a| a.as_str())),
        goals = profile.goals_text(),
        safety = safety_section(profile),
    )
}

pub fn parse_roadmap(text: &str) -> anyhow::Result<Roadmap> {
    let roadmap: Roadmap = serde_json::from_str(text)?;
    if roadmap.phases.is_empty() {
        anyhow::bail!("roadmap has no phases");
    }
    Ok(roadmap)
}

pub async fn generate_roadmap(
    llm: &dyn LlmClient,
    profile: &HealthProfile,
    progress_summary: Option<&str>,
    timeout: Duration,
) -> Roadmap {
    let request = CompletionRequest {
        system: "You are a certified health and fitness coach. Always prioritize user safety. \
                 Respond with valid JSON only."
            .into(),
        messages: vec![ChatTurn::user(roadmap_prompt(profile, progress_summary))],
        temperature: 0.7,
        max_tokens: 1500,
        timeout,
        json_mode: true,
    };

    let result = llm
        .generate(request)
        .await
        .and_then(|text| parse_roadmap(&text));

    match result {
        Ok(roadmap) => {
            tracing::info!(phases = roadmap.phases.len(), "Generated roadmap");
            roadmap
        }
        Err(e) => {
            tracing::warn!(error = %e, "Roadmap generation failed, using fallback roadmap");
            fallback_roadmap()
        }
    }
}

pub fn fallback_roadmap() -> Roadmap {
    let phase = |name: &str, goals: [&str; 3], milestones: [&str; 2]| Phase {
        name: name.into(),
        duration: "4 weeks".into(),
        goals: goals.iter().map(|g| g.to_string()).collect(),
        milestones: milestones.iter().map(|m| m.to_string()).collect(),
    };

    Roadmap {
        phases: vec![
            phase(
                "Foundation",
                [
                    "Establish daily movement habit",
                    "Track nutrition basics",
                    "Build consistency",
                ],
                ["14 days of activity logged", "Baseline measurements taken"],
            ),
            phase(
                "Progress",
                [
                    "Increase activity intensity",
                    "Improve nutrition quality",
                    "Build strength",
                ],
                ["30% progress toward goal", "Improved energy levels"],
            ),
            phase(
                "Optimization",
                [
                    "Maximize results",
                    "Fine-tune habits",
                    "Prepare for maintenance",
                ],
                ["70% progress toward goal", "Sustainable routine established"],
            ),
        ],
        timeline: Timeline {
            total_duration: "12 weeks".into(),
            estimated_completion: "Gradual progress with sustainable habits".into(),
        },
    }
}

pub fn weekly_tasks_prompt(profile: &HealthProfile, phase: &Phase, week_number: u32) -> String {
    format!(
        r#"You are creating a weekly task plan (7 days) for a user in their health journey.

User Profile:
- Age: {age}
- Activity Level: {activity}
- Goals: {goals}

Current Phase: {phase_name}
Phase Goals: {phase_goals}
Week Number: {week_number} of 4

SAFETY CONSTRAINTS (MUST FOLLOW):
{safety}

Generate EXACTLY 7 days of tasks. Each day should have 2-4 tasks covering
exercise or movement, nutrition and hydration, recovery, and habit tracking.
Week 1 is lighter and focused on habit formation; intensity builds toward week 4.
Include 1-2 rest or recovery days.

Return ONLY a JSON object of this shape:
{{
    "tasks": [
        {{
            "day": 1,
            "title": "Specific task title",
            "description": "Detailed description with clear instructions",
            "priority": "high" | "medium" | "low",
            "time_of_day": "morning" | "afternoon" | "evening" | "anytime",
            "duration_minutes": 5-60
        }}
    ]
}}"#,
        age = or_unknown(profile.age),
        activity = or_unknown(profile.activity_level.map(|a| a.as_str())),
        goals = profile.goals_text(),
        phase_name = phase.name,
        phase_goals = phase.goals.join(", "),
        safety = safety_section(profile),
    )
}

#[derive(Debug, Deserialize)]
struct GeneratedTask {
    #[serde(default)]
    day: Option<i64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<TaskPriority>,
    #[serde(default)]
    time_of_day: Option<TimeOfDay>,
    #[serde(default)]
    duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeneratedWeek {
    Tasks { tasks: Vec<GeneratedTask> },
    WeeklyTasks { weekly_tasks: Vec<GeneratedTask> },
    Bare(Vec<GeneratedTask>),
}

/// Accepts `{"tasks": [...]}`, `{"weekly_tasks": [...]}`, or a bare array.
/// A task's `day` (1-7) picks its date; without one, tasks fill the week in
/// order.
pub fn parse_weekly_tasks(text: &str, start: NaiveDate) -> anyhow::Result<Vec<NewTask>> {
    let raw = match serde_json::from_str::<GeneratedWeek>(text)? {
        GeneratedWeek::Tasks { tasks } => tasks,
        GeneratedWeek::WeeklyTasks { weekly_tasks } => weekly_tasks,
        GeneratedWeek::Bare(tasks) => tasks,
    };

    let tasks: Vec<NewTask> = raw
        .into_iter()
        .take(MAX_TASKS_PER_WEEK)
        .enumerate()
        .map(|(i, t)| {
            let offset = t
                .day
                .map(|d| d.clamp(1, DAYS_PER_WEEK) - 1)
                .unwrap_or(i as i64 % DAYS_PER_WEEK);
            NewTask {
                title: t
                    .title
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| format!("Day {} Task", offset + 1)),
                description: t.description.unwrap_or_default(),
                priority: t.priority.unwrap_or_default(),
                scheduled_date: start + Days::days(offset),
                time_of_day: t.time_of_day.unwrap_or(TimeOfDay::Anytime),
                duration_minutes: t.duration_minutes.unwrap_or(30).clamp(5, 120),
            }
        })
        .collect();

    if tasks.is_empty() {
        anyhow::bail!("no tasks in generated week");
    }
    Ok(tasks)
}

pub async fn generate_weekly_tasks(
    llm: &dyn LlmClient,
    profile: &HealthProfile,
    phase: &Phase,
    week_number: u32,
    start: NaiveDate,
    timeout: Duration,
) -> Vec<NewTask> {
    let request = CompletionRequest {
        system: "You are a certified fitness coach creating safe, progressive weekly plans. \
                 Respond with valid JSON only."
            .into(),
        messages: vec![ChatTurn::user(weekly_tasks_prompt(profile, phase, week_number))],
        temperature: 0.8,
        max_tokens: 2000,
        timeout,
        json_mode: true,
    };

    let result = llm
        .generate(request)
        .await
        .and_then(|text| parse_weekly_tasks(&text, start));

    match result {
        Ok(tasks) => {
            tracing::info!(count = tasks.len(), week_number, "Generated weekly tasks");
            tasks
        }
        Err(e) => {
            tracing::warn!(error = %e, "Weekly task generation failed, using fallback week");
            fallback_week(start)
        }
    }
}

/// Two tasks a day for seven days starting at `start`.
pub fn fallback_week(start: NaiveDate) -> Vec<NewTask> {
    use TaskPriority::{High, Low, Medium};
    use TimeOfDay::{Afternoon, Anytime, Evening, Morning};

    const TEMPLATE: [(&str, &str, TaskPriority, TimeOfDay, i32); 14] = [
        ("Morning Walk", "30-minute brisk walk", High, Morning, 30),
        ("Track Meals", "Log all meals and water intake", Medium, Anytime, 10),
        ("Strength Training", "20-minute bodyweight exercises", High, Morning, 20),
        ("Meal Prep", "Prepare healthy lunch and snacks", Medium, Evening, 30),
        ("Yoga Session", "Gentle yoga for flexibility", Medium, Morning, 25),
        ("Hydration Check", "Drink 8 glasses of water", High, Anytime, 5),
        ("Cardio Workout", "30-minute moderate cardio", High, Morning, 30),
        ("Healthy Dinner", "Cook balanced dinner with veggies", Medium, Evening, 25),
        ("Active Recovery", "Light stretching and mobility", Medium, Morning, 20),
        ("Weekly Review", "Review progress and plan next week", Medium, Evening, 15),
        ("Outdoor Activity", "Hiking, cycling, or sports", High, Morning, 45),
        ("Meal Planning", "Plan meals for next week", Medium, Afternoon, 20),
        ("Gentle Stretching", "Light stretching and relaxation", Low, Morning, 15),
        ("Self-Care", "Rest, recovery, and reflection", Low, Anytime, 30),
    ];

    TEMPLATE
        .iter()
        .enumerate()
        .map(|(i, &(title, description, priority, time_of_day, minutes))| {
            let day = start + Days::days(i as i64 / 2);
            NewTask::new(title, description, priority, day, time_of_day, minutes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::testing::StubLlm;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()
    }

    #[test]
    fn test_safety_rules() {
        let teen = HealthProfile {
            age: Some(16),
            ..Default::default()
        };
        assert_eq!(safety_rules(&teen).len(), 1);
        assert!(safety_rules(&teen)[0].contains("under 18"));

        let senior_obese_sedentary = HealthProfile {
            age: Some(70),
            height_cm: Some(170.0),
            current_weight: Some(100.0),
            activity_level: Some(ActivityLevel::Sedentary),
            ..Default::default()
        };
        let rules = safety_rules(&senior_obese_sedentary);
        assert_eq!(rules.len(), 3);
        assert!(rules[0].contains("senior"));
        assert!(rules[1].contains("BMI > 30"));
        assert!(rules[2].contains("sedentary"));

        let underweight = HealthProfile {
            height_cm: Some(180.0),
            current_weight: Some(55.0),
            ..Default::default()
        };
        assert!(safety_rules(&underweight)[0].contains("underweight"));

        assert!(safety_rules(&HealthProfile::default()).is_empty());
    }

    #[test]
    fn test_prompt_includes_constraints() {
        let profile = HealthProfile {
            age: Some(70),
            goals: vec!["Lose weight".into(), "Sleep better".into()],
            ..Default::default()
        };
        let prompt = roadmap_prompt(&profile, Some("12 tasks completed"));
        assert!(prompt.contains("- User is senior"));
        assert!(prompt.contains("Primary Goals: Lose weight, Sleep better"));
        assert!(prompt.contains("Gender: Not provided"));
        assert!(prompt.contains("12 tasks completed"));

        let plain = roadmap_prompt(&HealthProfile::default(), None);
        assert!(plain.contains("No special constraints"));
        assert!(!plain.contains("Recent Progress"));
    }

    #[test]
    fn test_fallback_roadmap_shape() {
        let roadmap = fallback_roadmap();
        let names: Vec<_> = roadmap.phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Foundation", "Progress", "Optimization"]);
        assert!(roadmap.phases.iter().all(|p| p.duration == "4 weeks"));
        assert_eq!(roadmap.timeline.total_duration, "12 weeks");
    }

    #[test]
    fn test_fallback_week_two_per_day() {
        let week = fallback_week(start());
        assert_eq!(week.len(), 14);
        for day in 0..7 {
            let date = start() + Days::days(day);
            assert_eq!(week.iter().filter(|t| t.scheduled_date == date).count(), 2);
        }
        assert_eq!(week[0].title, "Morning Walk");
        assert_eq!(week[13].title, "Self-Care");
        assert_eq!(week[13].scheduled_date, start() + Days::days(6));
    }

    #[test]
    fn test_parse_weekly_tasks_uses_day_field() {
        let text = r#"{"tasks":[
            {"day":1,"title":"Walk","priority":"high","time_of_day":"morning","duration_minutes":20},
            {"day":3,"title":"Stretch"},
            {"day":9,"title":"Overflow"}
        ]}"#;
        let tasks = parse_weekly_tasks(text, start()).unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].scheduled_date, start());
        assert_eq!(tasks[0].priority, TaskPriority::High);
        assert_eq!(tasks[1].scheduled_date, start() + Days::days(2));
        assert_eq!(tasks[1].priority, TaskPriority::Medium);
        assert_eq!(tasks[1].time_of_day, TimeOfDay::Anytime);
        assert_eq!(tasks[1].duration_minutes, 30);
        assert_eq!(tasks[2].scheduled_date, start() + Days::days(6));
    }

    #[test]
    fn test_parse_weekly_tasks_bare_array_and_empty() {
        let tasks = parse_weekly_tasks(r#"[{"title":"A"},{"title":"B"}]"#, start()).unwrap();
        assert_eq!(tasks[1].scheduled_date, start() + Days::days(1));

        assert!(parse_weekly_tasks(r#"{"tasks":[]}"#, start()).is_err());
        assert!(parse_weekly_tasks("not json", start()).is_err());
    }

    #[tokio::test]
    async fn test_generate_roadmap_from_llm() {
        let llm = StubLlm::replying(
            r#"{"phases":[{"name":"Base","duration":"6 weeks","goals":["g"],"milestones":["m"]}],
                "timeline":{"total_duration":"6 weeks","estimated_completion":"soon"}}"#,
        );
        let roadmap =
            generate_roadmap(&llm, &HealthProfile::default(), None, Duration::from_secs(1)).await;
        assert_eq!(roadmap.phases.len(), 1);
        assert_eq!(roadmap.phases[0].name, "Base");
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_failure() {
        let llm = StubLlm::failing();
        let roadmap =
            generate_roadmap(&llm, &HealthProfile::default(), None, Duration::from_secs(1)).await;
        assert_eq!(roadmap, fallback_roadmap());

        let phase = &roadmap.phases[0];
        let tasks = generate_weekly_tasks(
            &llm,
            &HealthProfile::default(),
            phase,
            1,
            start(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(tasks, fallback_week(start()));
    }

    #[tokio::test]
    async fn test_unparseable_roadmap_falls_back() {
        let llm = StubLlm::replying(r#"{"phases":[]}"#);
        let roadmap =
            generate_roadmap(&llm, &HealthProfile::default(), None, Duration::from_secs(1)).await;
        assert_eq!(roadmap, fallback_roadmap());
    }
}
