use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::db::{self, tasks::TaskCounts};
use crate::dto::{GeneratedPlanResponse, RoadmapResponse};
use crate::error::{AppError, AppResult};
use crate::models::plan::Plan;
use crate::models::user::HealthProfile;
use crate::services::plan_generator::{
    fallback_week, generate_roadmap, generate_weekly_tasks, PLAN_DESCRIPTION, PLAN_TITLE,
    REGENERATED_DESCRIPTION, REGENERATED_TITLE,
};
use crate::services::recovery::{handle_return, ReturnPlan};
use crate::AppState;

const SUMMARY_ENERGY_DAYS: i64 = 14;

async fn load_profile(state: &AppState, user_id: Uuid) -> AppResult<HealthProfile> {
    let user = db::users::by_id(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;
    Ok(HealthProfile::from(&user))
}

/// Generates a roadmap and its first week, then swaps it in as the user's
/// only active plan in one transaction.
async fn create_active_plan(
    state: &AppState,
    user_id: Uuid,
    profile: &HealthProfile,
    progress_summary: Option<&str>,
    title: &str,
    description: &str,
) -> AppResult<GeneratedPlanResponse> {
    let timeout = state.config.llm_timeout();
    let roadmap = generate_roadmap(&*state.llm, profile, progress_summary, timeout).await;

    let start = Utc::now().date_naive();
    let first_week = match roadmap.phases.first() {
        Some(phase) => generate_weekly_tasks(&*state.llm, profile, phase, 1, start, timeout).await,
        None => fallback_week(start),
    };

    let mut tx = state.db.begin().await?;
    db::plans::deactivate_all(&mut *tx, user_id).await?;
    let plan = db::plans::create(&mut *tx, user_id, title, description, &roadmap).await?;
    let tasks = db::tasks::insert_many(&mut tx, plan.id, &first_week).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        plan_id = %plan.id,
        phases = plan.roadmap.phases.len(),
        tasks = tasks.len(),
        "Plan activated"
    );

    Ok(GeneratedPlanResponse {
        plan,
        tasks_created: tasks.len(),
    })
}

pub async fn generate(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<(StatusCode, Json<GeneratedPlanResponse>)> {
    let profile = load_profile(&state, auth_user.id).await?;
    let created =
        create_active_plan(&state, auth_user.id, &profile, None, PLAN_TITLE, PLAN_DESCRIPTION)
            .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn regenerate(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<GeneratedPlanResponse>> {
    let profile = load_profile(&state, auth_user.id).await?;
    let today = Utc::now().date_naive();

    let current = db::plans::get_active(&state.db, auth_user.id).await?;
    let counts = match &current {
        Some(plan) => db::tasks::counts(&state.db, plan.id).await?,
        None => TaskCounts::default(),
    };
    let streak = db::metrics::streak(&state.db, auth_user.id, today).await?;
    let energy: Vec<i32> =
        db::metrics::get_last_n_days(&state.db, auth_user.id, SUMMARY_ENERGY_DAYS, today)
            .await?
            .iter()
            .filter_map(|m| m.energy_level)
            .collect();

    let summary = progress_summary(current.as_ref(), &counts, streak, &energy);
    let created = create_active_plan(
        &state,
        auth_user.id,
        &profile,
        Some(&summary),
        REGENERATED_TITLE,
        REGENERATED_DESCRIPTION,
    )
    .await?;
    Ok(Json(created))
}

pub async fn current(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Plan>> {
    let plan = db::plans::get_active(&state.db, auth_user.id)
        .await?
        .ok_or_else(AppError::no_active_plan)?;
    Ok(Json(plan))
}

pub async fn roadmap(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<RoadmapResponse>> {
    let plan = db::plans::get_active(&state.db, auth_user.id)
        .await?
        .ok_or_else(AppError::no_active_plan)?;
    Ok(Json(RoadmapResponse::from_plan(&plan)))
}

/// Re-plans around an absence: drops stale tasks, rolls progress back and
/// schedules comeback tasks. The plan row stays locked for the whole
/// transaction and the return is stamped on it, so a repeated call counts
/// zero days away and changes nothing.
pub async fn return_from_absence(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ReturnPlan>> {
    let today = Utc::now().date_naive();

    let mut tx = state.db.begin().await?;
    let plan = db::plans::lock_active(&mut *tx, auth_user.id)
        .await?
        .ok_or_else(AppError::no_active_plan)?;

    let last_metric = db::metrics::latest_date(&mut *tx, auth_user.id).await?;
    let last_completed = db::tasks::last_completed_date(&mut *tx, auth_user.id).await?;
    let days_absent = days_between(last_activity(&plan, last_metric, last_completed), today);

    let overdue = db::tasks::overdue(&mut *tx, plan.id, today).await?;
    let result = settle_repeat(
        handle_return(
            days_absent,
            &overdue,
            plan.current_phase,
            plan.roadmap.phases.len(),
            plan.completion_percentage,
            today,
        ),
        &plan,
        today,
    );

    db::tasks::delete_many(&mut *tx, &result.task_ids_to_remove).await?;
    db::plans::record_return(
        &mut *tx,
        plan.id,
        result.new_phase,
        result.new_completion,
        today,
    )
    .await?;
    db::tasks::insert_many(&mut tx, plan.id, &result.comeback_tasks).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %auth_user.id,
        days_absent,
        strategy = ?result.restart_strategy,
        removed = result.task_ids_to_remove.len(),
        added = result.comeback_tasks.len(),
        "Applied return plan"
    );

    Ok(Json(result))
}

/// Latest of the last daily record, the last completed task and the last
/// recorded return. A plan with none of these counts from its creation.
fn last_activity(
    plan: &Plan,
    last_metric: Option<NaiveDate>,
    last_completed: Option<NaiveDate>,
) -> NaiveDate {
    [last_metric, last_completed, plan.last_return_on]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or_else(|| plan.created_at.date_naive())
}

/// A return already applied today is reported again without touching tasks.
fn settle_repeat(mut result: ReturnPlan, plan: &Plan, today: NaiveDate) -> ReturnPlan {
    if plan.last_return_on == Some(today) {
        result.task_ids_to_remove.clear();
        result.comeback_tasks.clear();
    }
    result
}

fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days().max(0)
}

/// Plain-text recap fed to the regeneration prompt.
pub fn progress_summary(
    plan: Option<&Plan>,
    counts: &TaskCounts,
    streak: i64,
    energy: &[i32],
) -> String {
    let mut lines = Vec::new();

    match plan {
        Some(plan) => lines.push(format!(
            "Previous plan: \"{}\", phase {} of {}, {:.0}% complete",
            plan.title,
            plan.current_phase + 1,
            plan.roadmap.phases.len(),
            plan.completion_percentage
        )),
        None => lines.push("No previous active plan".to_string()),
    }

    lines.push(format!(
        "Tasks: {} completed, {} pending, {} total",
        counts.completed, counts.pending, counts.total
    ));
    lines.push(format!("Current streak: {} days", streak));

    if !energy.is_empty() {
        let avg = energy.iter().sum::<i32>() as f64 / energy.len() as f64;
        lines.push(format!("Average energy (last {} days): {:.0}/100", SUMMARY_ENERGY_DAYS, avg));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::{Phase, Roadmap, Timeline};
    use sqlx::types::Json as DbJson;

    fn plan() -> Plan {
        let phase = |name: &str| Phase {
            name: name.into(),
            duration: "2 weeks".into(),
            goals: vec![],
            milestones: vec![],
        };
        Plan {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Journey".into(),
            description: None,
            roadmap: DbJson(Roadmap {
                phases: vec![phase("Foundation"), phase("Progress")],
                timeline: Timeline::default(),
            }),
            current_phase: 1,
            completion_percentage: 42.4,
            is_active: true,
            last_return_on: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_progress_summary() {
        let counts = TaskCounts {
            total: 20,
            completed: 12,
            pending: 6,
        };
        let summary = progress_summary(Some(&plan()), &counts, 4, &[60, 70]);
        assert!(summary.contains("phase 2 of 2, 42% complete"));
        assert!(summary.contains("12 completed, 6 pending, 20 total"));
        assert!(summary.contains("streak: 4 days"));
        assert!(summary.contains("65/100"));

        let empty = progress_summary(None, &TaskCounts::default(), 0, &[]);
        assert!(empty.starts_with("No previous active plan"));
        assert!(!empty.contains("Average energy"));
    }

    #[test]
    fn test_last_activity_prefers_latest_signal() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 6, day).unwrap();
        let mut p = plan();
        p.created_at = d(1).and_hms_opt(9, 0, 0).unwrap().and_utc();

        assert_eq!(last_activity(&p, None, None), d(1));
        assert_eq!(last_activity(&p, Some(d(5)), Some(d(3))), d(5));
        p.last_return_on = Some(d(12));
        assert_eq!(last_activity(&p, Some(d(5)), Some(d(3))), d(12));
    }

    #[test]
    fn test_second_return_on_same_day_changes_nothing() {
        use crate::models::task::{Task, TaskPriority, TaskStatus};
        use crate::services::recovery::RestartStrategy;

        let d = |day| NaiveDate::from_ymd_opt(2026, 6, day).unwrap();
        let today = d(15);
        let mut p = plan();
        p.current_phase = 1;
        p.completion_percentage = 60.0;
        let overdue = vec![Task {
            id: Uuid::new_v4(),
            plan_id: p.id,
            title: "Morning Walk".into(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            scheduled_date: Some(d(6)),
            time_of_day: None,
            duration_minutes: Some(20),
            completed_at: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }];

        let apply = |p: &Plan, last_metric: Option<NaiveDate>| {
            let days = days_between(last_activity(p, last_metric, None), today);
            settle_repeat(
                handle_return(
                    days,
                    &overdue,
                    p.current_phase,
                    p.roadmap.phases.len(),
                    p.completion_percentage,
                    today,
                ),
                p,
                today,
            )
        };

        let first = apply(&p, Some(d(5)));
        assert_eq!(first.restart_strategy, RestartStrategy::SoftRestart);
        assert_eq!(first.new_phase, 0);
        assert_eq!(first.new_completion, 30.0);
        assert_eq!(first.comeback_tasks.len(), 4);

        // What record_return leaves on the plan row
        p.current_phase = first.new_phase;
        p.completion_percentage = first.new_completion;
        p.last_return_on = Some(today);

        let second = apply(&p, Some(d(5)));
        assert_eq!(second.days_absent, 0);
        assert_eq!(second.restart_strategy, RestartStrategy::Continue);
        assert_eq!(second.new_phase, 0);
        assert_eq!(second.new_completion, 30.0);
        assert!(second.task_ids_to_remove.is_empty());
        assert!(second.comeback_tasks.is_empty());
    }

    #[test]
    fn test_days_between_never_negative() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 2, day).unwrap();
        assert_eq!(days_between(d(1), d(10)), 9);
        assert_eq!(days_between(d(10), d(1)), 0);
    }
}
