use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::db::{self, tasks::TaskChanges};
use crate::dto::{AdaptRequest, HistoryQuery, TaskLogRequest, TaskUpdateRequest};
use crate::error::{AppError, AppResult};
use crate::models::plan::Plan;
use crate::models::task::Task;
use crate::services::task_adapter::{
    adapt_tasks, energy_to_ten_scale, is_exercise, task_recommendations, AdaptedTask,
    Recommendation,
};
use crate::AppState;

const RECOMMENDATION_TASKS: i64 = 30;
const RECOMMENDATION_ENERGY_DAYS: i64 = 7;

async fn active_plan(state: &AppState, user_id: Uuid) -> AppResult<Plan> {
    db::plans::get_active(&state.db, user_id)
        .await?
        .ok_or_else(AppError::no_active_plan)
}

/// Loads a task and checks that its plan belongs to `user_id`.
async fn owned_task(state: &AppState, user_id: Uuid, task_id: Uuid) -> AppResult<Task> {
    let task = db::tasks::by_id(&state.db, task_id)
        .await?
        .ok_or(AppError::NotFound("Task not found".into()))?;

    match db::plans::owner(&state.db, task.plan_id).await? {
        Some(owner) if owner == user_id => Ok(task),
        _ => {
            tracing::warn!(user_id = %user_id, task_id = %task_id, "Access to another user's task");
            Err(AppError::Forbidden("Cannot access a task from another user's plan".into()))
        }
    }
}

pub async fn today(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Task>>> {
    let plan = active_plan(&state, auth_user.id).await?;
    let tasks = db::tasks::by_date(&state.db, plan.id, Utc::now().date_naive()).await?;
    Ok(Json(tasks))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    body.validate()?;
    owned_task(&state, auth_user.id, task_id).await?;

    let changes = TaskChanges::from(body);
    let task = db::tasks::update(&state.db, task_id, &changes, Utc::now().date_naive()).await?;
    Ok(Json(task))
}

/// Marks the task completed and counts it (plus exercise minutes for
/// movement tasks) against today's record. The status guard on the update
/// makes a repeated or concurrent log count once.
pub async fn log_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<TaskLogRequest>,
) -> AppResult<Json<Task>> {
    body.validate()?;
    owned_task(&state, auth_user.id, task_id).await?;
    let today = Utc::now().date_naive();

    let mut tx = state.db.begin().await?;
    let logged = db::tasks::log_completion(&mut *tx, task_id, body.notes.as_deref(), today).await?;

    let task = match logged {
        Some(task) => {
            let exercise_minutes = completion_credit(&task);
            db::metrics::increment_tasks_completed(&mut *tx, auth_user.id, today, exercise_minutes)
                .await?;
            tracing::info!(user_id = %auth_user.id, task_id = %task_id, exercise_minutes, "Task logged");
            task
        }
        None => {
            tracing::debug!(user_id = %auth_user.id, task_id = %task_id, "Task already completed");
            db::tasks::by_id(&mut *tx, task_id)
                .await?
                .ok_or(AppError::NotFound("Task not found".into()))?
        }
    };
    tx.commit().await?;

    Ok(Json(task))
}

/// Exercise minutes a completed task adds to the daily record.
fn completion_credit(task: &Task) -> i32 {
    if is_exercise(&task.title) {
        task.duration_minutes.unwrap_or(0)
    } else {
        0
    }
}

pub async fn history(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<Task>>> {
    query.validate()?;
    let plan = active_plan(&state, auth_user.id).await?;

    let tasks = db::tasks::history(&state.db, plan.id, query.limit(), query.offset()).await?;
    Ok(Json(tasks))
}

pub async fn adapt(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<AdaptRequest>,
) -> AppResult<Json<Vec<AdaptedTask>>> {
    body.validate()?;
    let plan = active_plan(&state, auth_user.id).await?;

    let tasks = db::tasks::by_date(&state.db, plan.id, Utc::now().date_naive()).await?;
    Ok(Json(adapt_tasks(&tasks, body.energy_level)))
}

pub async fn recommendations(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Recommendation>> {
    let plan = active_plan(&state, auth_user.id).await?;
    let today = Utc::now().date_naive();

    let completed = db::tasks::recent_completed(&state.db, plan.id, RECOMMENDATION_TASKS).await?;
    let energy: Vec<i32> = db::metrics::get_last_n_days(
        &state.db,
        auth_user.id,
        RECOMMENDATION_ENERGY_DAYS,
        today,
    )
    .await?
    .iter()
    .filter_map(|m| m.energy_level)
    .map(energy_to_ten_scale)
    .collect();

    Ok(Json(task_recommendations(&completed, &energy)))
}
