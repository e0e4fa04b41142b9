//! Energy-aware task adaptation and completion-pattern recommendations.
//!
//! Energy here is on the 1-10 scale the client reports, not the 0-100 Body
//! Battery score. See [`energy_to_ten_scale`] for the conversion.

use serde::Serialize;

use crate::models::task::{Task, TaskPriority, TimeOfDay};

const LOW_ENERGY_MAX: i32 = 3;
const HIGH_ENERGY_MIN: i32 = 8;
const DEFAULT_DURATION: i32 = 30;
const MIN_DURATION: i32 = 5;
const MAX_DURATION: i32 = 90;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Adaptation {
    Simplified,
    Unchanged,
    Intensified,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdaptedTask {
    #[serde(flatten)]
    pub task: Task,
    pub adaptation: Adaptation,
    pub adapted_reason: String,
}

/// One adapted copy per input task, in order. The input is left untouched.
pub fn adapt_tasks(tasks: &[Task], energy_level: i32) -> Vec<AdaptedTask> {
    tasks
        .iter()
        .map(|task| adapt_task(task, energy_level))
        .collect()
}

fn adapt_task(task: &Task, energy_level: i32) -> AdaptedTask {
    let mut adapted = task.clone();

    if energy_level <= LOW_ENERGY_MAX {
        simplify(&mut adapted);
        AdaptedTask {
            task: adapted,
            adaptation: Adaptation::Simplified,
            adapted_reason: format!("Simplified for low energy ({energy_level}/10)"),
        }
    } else if energy_level >= HIGH_ENERGY_MIN {
        intensify(&mut adapted);
        AdaptedTask {
            task: adapted,
            adaptation: Adaptation::Intensified,
            adapted_reason: format!("Increased for high energy ({energy_level}/10)"),
        }
    } else {
        AdaptedTask {
            task: adapted,
            adaptation: Adaptation::Unchanged,
            adapted_reason: "Optimal task for current energy".into(),
        }
    }
}

fn simplify(task: &mut Task) {
    let duration = task.duration_minutes.unwrap_or(DEFAULT_DURATION);
    task.duration_minutes = Some(MIN_DURATION.max((duration as f64 * 0.5).round() as i32));

    if task.priority == TaskPriority::High {
        task.priority = TaskPriority::Medium;
    }

    let title = task.title.to_lowercase();
    let suffix = if contains_any(&title, &["workout", "cardio", "training"]) {
        Some("Light version: Gentle walk or stretching instead")
    } else if contains_any(&title, &["meal", "cook", "prep"]) {
        Some("Simplified: Quick healthy option or pre-prepared meal")
    } else if contains_any(&title, &["yoga", "stretching"]) {
        Some("Gentle version: Focus on breathing and light movement")
    } else {
        None
    };
    append_suggestion(task, suffix);
}

fn intensify(task: &mut Task) {
    let duration = task.duration_minutes.unwrap_or(DEFAULT_DURATION);
    task.duration_minutes = Some(MAX_DURATION.min((duration as f64 * 1.25).round() as i32));

    if task.priority == TaskPriority::Medium {
        task.priority = TaskPriority::High;
    }

    let title = task.title.to_lowercase();
    let suffix = if title.contains("walk") {
        Some("Enhanced: Add intervals or incline for extra challenge")
    } else if contains_any(&title, &["workout", "training"]) {
        Some("Intensity boost: Add extra set or increase weight/reps")
    } else if title.contains("yoga") {
        Some("Advanced: Include more challenging poses or hold longer")
    } else {
        None
    };
    append_suggestion(task, suffix);
}

fn append_suggestion(task: &mut Task, suggestion: Option<&str>) {
    if let Some(suggestion) = suggestion {
        let base = task.description.as_deref().unwrap_or("");
        task.description = Some(format!("{base} → {suggestion}"));
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Whether a task counts toward exercise minutes when logged.
pub fn is_exercise(title: &str) -> bool {
    let title = title.to_lowercase();
    contains_any(
        &title,
        &[
            "walk", "workout", "cardio", "training", "yoga", "stretch", "run", "exercise",
            "movement", "activity", "strength",
        ],
    )
}

/// Maps a 0-100 Body Battery score onto 1-10.
pub fn energy_to_ten_scale(energy: i32) -> i32 {
    ((energy as f64 / 10.0).round() as i32).clamp(1, 10)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub optimal_time: TimeOfDay,
    pub suggested_difficulty: TaskPriority,
    pub rest_recommendation: bool,
    pub patterns: Vec<String>,
}

pub const PATTERN_LOW_ENERGY: &str =
    "Your energy has been consistently low. Consider taking a rest day or lighter activities.";
pub const PATTERN_HIGH_ENERGY: &str =
    "Your energy levels are great! This is a good time to push yourself.";
pub const PATTERN_DECLINING: &str = "Your energy is declining. Prioritize recovery and rest.";
pub const PATTERN_MORNING: &str =
    "You tend to complete more tasks in the morning. Schedule important activities early.";

const DECLINE_THRESHOLD: f64 = 5.0;

/// `energy_history` is oldest first, 1-10 scale.
pub fn task_recommendations(completed: &[Task], energy_history: &[i32]) -> Recommendation {
    let mut rec = Recommendation {
        optimal_time: TimeOfDay::Morning,
        suggested_difficulty: TaskPriority::Medium,
        rest_recommendation: false,
        patterns: Vec::new(),
    };

    if !energy_history.is_empty() {
        let avg = energy_history.iter().sum::<i32>() as f64 / energy_history.len() as f64;

        if avg < 5.0 {
            rec.rest_recommendation = true;
            rec.suggested_difficulty = TaskPriority::Low;
            rec.patterns.push(PATTERN_LOW_ENERGY.into());
        } else if avg > 7.0 {
            rec.suggested_difficulty = TaskPriority::High;
            rec.patterns.push(PATTERN_HIGH_ENERGY.into());
        }

        if energy_history.len() >= 3 {
            let (prior, recent) = energy_history.split_at(energy_history.len() - 3);
            let recent_avg = recent.iter().sum::<i32>() as f64 / 3.0;
            let prior_avg = prior.iter().sum::<i32>() as f64 / prior.len().max(1) as f64;

            if recent_avg < prior_avg - DECLINE_THRESHOLD {
                rec.rest_recommendation = true;
                rec.patterns.push(PATTERN_DECLINING.into());
            }
        }
    }

    if !completed.is_empty() {
        let morning = completed
            .iter()
            .filter(|t| t.time_of_day == Some(TimeOfDay::Morning))
            .count();
        if morning as f64 / completed.len() as f64 > 0.6 {
            rec.optimal_time = TimeOfDay::Morning;
            rec.patterns.push(PATTERN_MORNING.into());
        }
    }

    rec
}
