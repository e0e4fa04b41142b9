use chrono::NaiveDate;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::task::{NewTask, Task, TaskPriority, TaskStatus, TimeOfDay};

/// Partial update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub scheduled_date: Option<NaiveDate>,
    pub time_of_day: Option<TimeOfDay>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

/// What a status change does to `completed_at`: `None` leaves it alone,
/// `Some(value)` overwrites it.
pub fn completion_stamp(status: Option<TaskStatus>, today: NaiveDate) -> Option<Option<NaiveDate>> {
    match status {
        None => None,
        Some(TaskStatus::Completed) => Some(Some(today)),
        Some(_) => Some(None),
    }
}

pub async fn by_id(db: impl PgExecutor<'_>, task_id: Uuid) -> AppResult<Option<Task>> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(db)
        .await?;

    Ok(task)
}

pub async fn by_date(
    db: impl PgExecutor<'_>,
    plan_id: Uuid,
    date: NaiveDate,
) -> AppResult<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE plan_id = $1 AND scheduled_date = $2
        ORDER BY time_of_day NULLS LAST, created_at
        "#,
    )
    .bind(plan_id)
    .bind(date)
    .fetch_all(db)
    .await?;

    Ok(tasks)
}

/// Completed, cancelled, and skipped tasks, most recently finished first.
pub async fn history(
    db: impl PgExecutor<'_>,
    plan_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE plan_id = $1 AND status IN ('completed', 'cancelled', 'skipped')
        ORDER BY completed_at DESC NULLS LAST, updated_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(plan_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(tasks)
}

pub async fn recent_completed(
    db: impl PgExecutor<'_>,
    plan_id: Uuid,
    limit: i64,
) -> AppResult<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE plan_id = $1 AND status = 'completed'
        ORDER BY completed_at DESC NULLS LAST, updated_at DESC
        LIMIT $2
        "#,
    )
    .bind(plan_id)
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(tasks)
}

/// Pending or in-progress tasks scheduled before `today`.
pub async fn overdue(
    db: impl PgExecutor<'_>,
    plan_id: Uuid,
    today: NaiveDate,
) -> AppResult<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE plan_id = $1
          AND status IN ('pending', 'in_progress')
          AND scheduled_date < $2
        ORDER BY scheduled_date
        "#,
    )
    .bind(plan_id)
    .bind(today)
    .fetch_all(db)
    .await?;

    Ok(tasks)
}

/// Most recent day on which any of the user's tasks was completed.
pub async fn last_completed_date(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
) -> AppResult<Option<NaiveDate>> {
    let date = sqlx::query_scalar::<_, Option<NaiveDate>>(
        r#"
        SELECT MAX(t.completed_at)
        FROM tasks t
        JOIN plans p ON p.id = t.plan_id
        WHERE p.user_id = $1 AND t.status = 'completed'
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(date)
}

#[derive(Debug, Clone, Copy, Default, sqlx::FromRow, serde::Serialize)]
pub struct TaskCounts {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}

pub async fn counts(db: impl PgExecutor<'_>, plan_id: Uuid) -> AppResult<TaskCounts> {
    let counts = sqlx::query_as::<_, TaskCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'completed') AS completed,
            COUNT(*) FILTER (WHERE status IN ('pending', 'in_progress')) AS pending
        FROM tasks
        WHERE plan_id = $1
        "#,
    )
    .bind(plan_id)
    .fetch_one(db)
    .await?;

    Ok(counts)
}

pub async fn insert_many(
    conn: &mut PgConnection,
    plan_id: Uuid,
    tasks: &[NewTask],
) -> AppResult<Vec<Task>> {
    let mut created = Vec::with_capacity(tasks.len());
    for task in tasks {
        let row = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (id, plan_id, title, description, status, priority,
                               scheduled_date, time_of_day, duration_minutes)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(plan_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority)
        .bind(task.scheduled_date)
        .bind(task.time_of_day)
        .bind(task.duration_minutes.max(1))
        .fetch_one(&mut *conn)
        .await?;
        created.push(row);
    }

    Ok(created)
}

pub async fn update(
    db: impl PgExecutor<'_>,
    task_id: Uuid,
    changes: &TaskChanges,
    today: NaiveDate,
) -> AppResult<Task> {
    let stamp = completion_stamp(changes.status, today);

    let task = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks SET
            title            = COALESCE($2, title),
            description      = COALESCE($3, description),
            status           = COALESCE($4, status),
            priority         = COALESCE($5, priority),
            scheduled_date   = COALESCE($6, scheduled_date),
            time_of_day      = COALESCE($7, time_of_day),
            duration_minutes = COALESCE($8, duration_minutes),
            notes            = COALESCE($9, notes),
            completed_at     = CASE WHEN $10 THEN $11 ELSE completed_at END,
            updated_at       = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.status)
    .bind(changes.priority)
    .bind(changes.scheduled_date)
    .bind(changes.time_of_day)
    .bind(changes.duration_minutes)
    .bind(&changes.notes)
    .bind(stamp.is_some())
    .bind(stamp.flatten())
    .fetch_one(db)
    .await?;

    Ok(task)
}

// Matches no row once the task is completed, including when a concurrent log
// commits first.
const LOG_COMPLETION: &str = r#"
    UPDATE tasks SET
        status       = 'completed',
        completed_at = $2,
        notes        = COALESCE($3, notes),
        updated_at   = NOW()
    WHERE id = $1 AND status <> 'completed'
    RETURNING *
"#;

/// Completes a task that is not completed yet. `None` means the task was
/// already completed, so the caller must not count it again.
pub async fn log_completion(
    db: impl PgExecutor<'_>,
    task_id: Uuid,
    notes: Option<&str>,
    today: NaiveDate,
) -> AppResult<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(LOG_COMPLETION)
        .bind(task_id)
        .bind(today)
        .bind(notes)
        .fetch_optional(db)
        .await?;

    Ok(task)
}

pub async fn delete_many(db: impl PgExecutor<'_>, task_ids: &[Uuid]) -> AppResult<u64> {
    if task_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM tasks WHERE id = ANY($1)")
        .bind(task_ids)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}
