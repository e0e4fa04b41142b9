//! Getting a user back on track after time away.
//!
//! The length of the absence picks one of four bands. Each band decides which
//! overdue tasks to drop, how far to roll the plan back, and what gentle
//! comeback tasks to schedule.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::models::task::{NewTask, Task, TaskPriority, TimeOfDay};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RestartStrategy {
    /// 0-3 days
    Continue,
    /// 4-7 days
    EaseBack,
    /// 8-14 days
    SoftRestart,
    /// 15+ days
    FullRestart,
}

impl RestartStrategy {
    pub fn for_absence(days_absent: i64) -> Self {
        match days_absent {
            d if d <= 3 => Self::Continue,
            4..=7 => Self::EaseBack,
            8..=14 => Self::SoftRestart,
            _ => Self::FullRestart,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanAdjustment {
    ReduceIntensity {
        extend_phase_days: i32,
        focus: String,
    },
    RestartPhase {
        reduce_intensity: bool,
        message: String,
    },
    RegeneratePlan {
        reason: String,
        keep_history: bool,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReturnPlan {
    pub days_absent: i64,
    pub welcome_message: String,
    pub task_ids_to_remove: Vec<Uuid>,
    pub plan_adjustment: Option<PlanAdjustment>,
    pub restart_strategy: RestartStrategy,
    pub motivation: String,
    pub new_phase: i32,
    pub new_completion: f64,
    pub comeback_tasks: Vec<NewTask>,
}

/// Overdue tasks older than this survive a short absence.
const SHORT_ABSENCE_KEEP_DAYS: i64 = 2;

pub fn handle_return(
    days_absent: i64,
    overdue: &[Task],
    current_phase: i32,
    total_phases: usize,
    completion_percentage: f64,
    today: NaiveDate,
) -> ReturnPlan {
    let strategy = RestartStrategy::for_absence(days_absent);
    let (new_phase, new_completion) =
        adjusted_progress(strategy, current_phase, total_phases, completion_percentage);

    let task_ids_to_remove = match strategy {
        RestartStrategy::Continue => overdue
            .iter()
            .filter(|t| {
                t.scheduled_date
                    .is_some_and(|d| (today - d).num_days() > SHORT_ABSENCE_KEEP_DAYS)
            })
            .map(|t| t.id)
            .collect(),
        _ => overdue.iter().map(|t| t.id).collect(),
    };

    let (welcome_message, motivation, plan_adjustment) = match strategy {
        RestartStrategy::Continue => (
            format!(
                "Welcome back! You've been away for {days_absent} day(s). Let's pick up where you left off!"
            ),
            "Short breaks are normal. What matters is getting back on track.",
            None,
        ),
        RestartStrategy::EaseBack => (
            format!(
                "Good to see you again! It's been {days_absent} days. Let's ease back into your routine."
            ),
            "Taking a week off happens. The important thing is you're back now. Start light and rebuild momentum.",
            Some(PlanAdjustment::ReduceIntensity {
                extend_phase_days: 3,
                focus: "Re-establish habit, not intensity".into(),
            }),
        ),
        RestartStrategy::SoftRestart => (
            format!(
                "Welcome back! It's been {days_absent} days. No judgment, life happens. Let's create a gentle restart plan."
            ),
            "Two weeks away means we need to rebuild gradually. Think of this as a phase restart, but you'll progress faster with your experience.",
            Some(PlanAdjustment::RestartPhase {
                reduce_intensity: true,
                message: "Restart current phase with reduced intensity".into(),
            }),
        ),
        RestartStrategy::FullRestart => (
            format!(
                "Welcome back after {days_absent} days! Ready for a fresh start? Let's rebuild your journey together."
            ),
            "A long break means it's time for a fresh beginning. You've learned what works and what doesn't. Use that knowledge for an even better journey this time.",
            Some(PlanAdjustment::RegeneratePlan {
                reason: "Extended absence, fresh start recommended".into(),
                keep_history: true,
                message: "Consider generating a new plan based on updated goals".into(),
            }),
        ),
    };

    ReturnPlan {
        days_absent,
        welcome_message,
        task_ids_to_remove,
        plan_adjustment,
        restart_strategy: strategy,
        motivation: motivation.into(),
        new_phase,
        new_completion,
        comeback_tasks: comeback_tasks(strategy, today),
    }
}

fn adjusted_progress(
    strategy: RestartStrategy,
    current_phase: i32,
    total_phases: usize,
    completion: f64,
) -> (i32, f64) {
    let (phase, completion) = match strategy {
        RestartStrategy::Continue => (current_phase, completion),
        RestartStrategy::EaseBack => (current_phase, (completion - 10.0).max(0.0)),
        RestartStrategy::SoftRestart => ((current_phase - 1).max(0), completion * 0.5),
        RestartStrategy::FullRestart => (0, 0.0),
    };

    let last_phase = (total_phases as i32 - 1).max(0);
    (phase.clamp(0, last_phase), completion.clamp(0.0, 100.0))
}

fn comeback_tasks(strategy: RestartStrategy, today: NaiveDate) -> Vec<NewTask> {
    use TaskPriority::{High, Medium};
    use TimeOfDay::{Anytime, Morning};

    match strategy {
        RestartStrategy::Continue => vec![
            NewTask::new(
                "Welcome Back Walk",
                "15-minute easy walk to restart your routine",
                Medium,
                today,
                Morning,
                15,
            ),
            NewTask::new(
                "Quick Check-In",
                "Reflect on your goals and recommit to your journey",
                Medium,
                today,
                Anytime,
                10,
            ),
        ],
        RestartStrategy::EaseBack => vec![
            NewTask::new(
                "Gentle Movement",
                "10-minute light stretching or easy walk. Just get moving again",
                High,
                today,
                Morning,
                10,
            ),
            NewTask::new(
                "Set Today's Intention",
                "Write down one small health goal for today",
                Medium,
                today,
                Morning,
                5,
            ),
            NewTask::new(
                "Hydration Reset",
                "Drink 4 glasses of water throughout the day",
                High,
                today,
                Anytime,
                5,
            ),
        ],
        RestartStrategy::SoftRestart | RestartStrategy::FullRestart => vec![
            NewTask::new(
                "5-Minute Movement",
                "Just 5 minutes of any movement: walk, stretch, dance. Anything counts!",
                High,
                today,
                Anytime,
                5,
            ),
            NewTask::new(
                "Fresh Start Reflection",
                "Why are you restarting? Write it down. This is your motivation.",
                High,
                today,
                Anytime,
                10,
            ),
            NewTask::new(
                "10-Minute Morning Walk",
                "Build on yesterday with 10 minutes of walking",
                Medium,
                today + Duration::days(1),
                Morning,
                10,
            ),
            NewTask::new(
                "15-Minute Activity",
                "You're building momentum! 15 minutes of your choice",
                Medium,
                today + Duration::days(2),
                Morning,
                15,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn overdue_task(days_ago: i64) -> Task {
        Task {
            id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            title: "Morning Walk".into(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            scheduled_date: Some(today() - Duration::days(days_ago)),
            time_of_day: Some(TimeOfDay::Morning),
            duration_minutes: Some(30),
            completed_at: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(RestartStrategy::for_absence(0), RestartStrategy::Continue);
        assert_eq!(RestartStrategy::for_absence(3), RestartStrategy::Continue);
        assert_eq!(RestartStrategy::for_absence(4), RestartStrategy::EaseBack);
        assert_eq!(RestartStrategy::for_absence(7), RestartStrategy::EaseBack);
        assert_eq!(RestartStrategy::for_absence(8), RestartStrategy::SoftRestart);
        assert_eq!(RestartStrategy::for_absence(14), RestartStrategy::SoftRestart);
        assert_eq!(RestartStrategy::for_absence(15), RestartStrategy::FullRestart);
        assert_eq!(RestartStrategy::for_absence(400), RestartStrategy::FullRestart);
    }

    #[test]
    fn test_short_absence_keeps_recent_overdue() {
        let recent = overdue_task(1);
        let edge = overdue_task(2);
        let stale = overdue_task(3);
        let plan = handle_return(
            2,
            &[recent, edge, stale.clone()],
            1,
            3,
            40.0,
            today(),
        );

        assert_eq!(plan.restart_strategy, RestartStrategy::Continue);
        assert_eq!(plan.task_ids_to_remove, vec![stale.id]);
        assert_eq!(plan.new_phase, 1);
        assert_eq!(plan.new_completion, 40.0);
        assert!(plan.plan_adjustment.is_none());
        assert_eq!(plan.comeback_tasks.len(), 2);
        assert!(plan.comeback_tasks.iter().all(|t| t.scheduled_date == today()));
        assert!(plan.welcome_message.contains("2 day(s)"));
    }

    #[test]
    fn test_ease_back() {
        let tasks = [overdue_task(1), overdue_task(5)];
        let plan = handle_return(5, &tasks, 2, 3, 8.0, today());

        assert_eq!(plan.restart_strategy, RestartStrategy::EaseBack);
        assert_eq!(plan.task_ids_to_remove.len(), 2);
        assert_eq!(plan.new_phase, 2);
        assert_eq!(plan.new_completion, 0.0);
        assert_eq!(
            plan.plan_adjustment,
            Some(PlanAdjustment::ReduceIntensity {
                extend_phase_days: 3,
                focus: "Re-establish habit, not intensity".into(),
            })
        );
        let titles: Vec<_> = plan.comeback_tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Gentle Movement", "Set Today's Intention", "Hydration Reset"]
        );
    }

    #[test]
    fn test_soft_restart_steps_back_one_phase() {
        let plan = handle_return(10, &[overdue_task(9)], 2, 3, 60.0, today());
        assert_eq!(plan.restart_strategy, RestartStrategy::SoftRestart);
        assert_eq!(plan.new_phase, 1);
        assert_eq!(plan.new_completion, 30.0);
        assert_eq!(plan.task_ids_to_remove.len(), 1);
        assert!(matches!(
            plan.plan_adjustment,
            Some(PlanAdjustment::RestartPhase { reduce_intensity: true, .. })
        ));

        let first = handle_return(10, &[], 0, 3, 20.0, today());
        assert_eq!(first.new_phase, 0);
    }

    #[test]
    fn test_full_restart_resets_progress() {
        let plan = handle_return(30, &[overdue_task(20)], 2, 3, 75.0, today());
        assert_eq!(plan.restart_strategy, RestartStrategy::FullRestart);
        assert_eq!(plan.new_phase, 0);
        assert_eq!(plan.new_completion, 0.0);
        assert!(matches!(
            plan.plan_adjustment,
            Some(PlanAdjustment::RegeneratePlan { keep_history: true, .. })
        ));
    }

    #[test]
    fn test_graded_comeback_sequence() {
        let plan = handle_return(20, &[], 0, 3, 0.0, today());
        let schedule: Vec<_> = plan
            .comeback_tasks
            .iter()
            .map(|t| (t.duration_minutes, t.scheduled_date))
            .collect();
        assert_eq!(
            schedule,
            vec![
                (5, today()),
                (10, today()),
                (10, today() + Duration::days(1)),
                (15, today() + Duration::days(2)),
            ]
        );
        assert_eq!(plan.comeback_tasks[1].title, "Fresh Start Reflection");
    }

    #[test]
    fn test_phase_clamped_to_roadmap() {
        let plan = handle_return(1, &[], 5, 3, 50.0, today());
        assert_eq!(plan.new_phase, 2);

        let empty = handle_return(1, &[], 2, 0, 50.0, today());
        assert_eq!(empty.new_phase, 0);
    }

    #[test]
    fn test_adjustment_serializes_tagged() {
        let plan = handle_return(6, &[], 0, 3, 50.0, today());
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["plan_adjustment"]["type"], "reduce_intensity");
        assert_eq!(json["restart_strategy"], "ease_back");
    }
}
