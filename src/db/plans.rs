use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::plan::{Plan, Roadmap};

pub async fn get_active(db: impl PgExecutor<'_>, user_id: Uuid) -> AppResult<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>(
        r#"
        SELECT * FROM plans
        WHERE user_id = $1 AND is_active = true
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(plan)
}

/// The user a plan belongs to, if the plan exists.
pub async fn owner(db: impl PgExecutor<'_>, plan_id: Uuid) -> AppResult<Option<Uuid>> {
    let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM plans WHERE id = $1")
        .bind(plan_id)
        .fetch_optional(db)
        .await?;

    Ok(owner)
}

pub async fn count_for_user(db: impl PgExecutor<'_>, user_id: Uuid) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM plans WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await?;

    Ok(count)
}

/// Must run in the same transaction as the `create` that follows it.
pub async fn deactivate_all(db: impl PgExecutor<'_>, user_id: Uuid) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE plans SET is_active = false, updated_at = NOW()
        WHERE user_id = $1 AND is_active = true
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn create(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    title: &str,
    description: &str,
    roadmap: &Roadmap,
) -> AppResult<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        r#"
        INSERT INTO plans (id, user_id, title, description, roadmap, current_phase,
                           completion_percentage, is_active)
        VALUES ($1, $2, $3, $4, $5, 0, 0, true)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(Json(roadmap))
    .fetch_one(db)
    .await?;

    Ok(plan)
}

/// Active plan with its row locked until the transaction ends.
pub async fn lock_active(db: impl PgExecutor<'_>, user_id: Uuid) -> AppResult<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>(
        r#"
        SELECT * FROM plans
        WHERE user_id = $1 AND is_active = true
        ORDER BY created_at DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(plan)
}

/// Writes the rolled-back progress and stamps the day of the return.
pub async fn record_return(
    db: impl PgExecutor<'_>,
    plan_id: Uuid,
    current_phase: i32,
    completion_percentage: f64,
    returned_on: NaiveDate,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE plans
        SET current_phase = $2, completion_percentage = $3, last_return_on = $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(plan_id)
    .bind(current_phase.max(0))
    .bind(completion_percentage.clamp(0.0, 100.0))
    .bind(returned_on)
    .execute(db)
    .await?;

    Ok(())
}
