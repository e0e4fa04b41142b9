use chrono::{Duration, NaiveDate};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::daily_metric::DailyMetric;

/// Longest streak reported; older history is not scanned.
pub const STREAK_CAP: i64 = 365;

/// Field values for a create-or-update. `None` leaves the stored value as is.
#[derive(Debug, Clone, Default)]
pub struct MetricValues {
    pub energy_level: Option<i32>,
    pub hours_slept: Option<f64>,
    pub sleep_quality: Option<i32>,
    pub mood: Option<i32>,
    pub stress_level: Option<i32>,
    pub weight: Option<f64>,
    pub tasks_completed: Option<i32>,
    pub exercise_minutes: Option<i32>,
    pub notes: Option<String>,
}

pub async fn get_by_date(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    date: NaiveDate,
) -> AppResult<Option<DailyMetric>> {
    let metric = sqlx::query_as::<_, DailyMetric>(
        "SELECT * FROM daily_metrics WHERE user_id = $1 AND date = $2",
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(db)
    .await?;

    Ok(metric)
}

/// Inclusive on both ends, oldest first.
pub async fn get_range(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<DailyMetric>> {
    let metrics = sqlx::query_as::<_, DailyMetric>(
        r#"
        SELECT * FROM daily_metrics
        WHERE user_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await?;

    Ok(metrics)
}

/// The `days`-long window ending at `today`.
pub async fn get_last_n_days(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    days: i64,
    today: NaiveDate,
) -> AppResult<Vec<DailyMetric>> {
    let start = window_start(today, days);
    get_range(db, user_id, start, today).await
}

pub fn window_start(today: NaiveDate, days: i64) -> NaiveDate {
    today - Duration::days(days.max(1) - 1)
}

pub async fn upsert(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    date: NaiveDate,
    values: &MetricValues,
) -> AppResult<DailyMetric> {
    let metric = sqlx::query_as::<_, DailyMetric>(
        r#"
        INSERT INTO daily_metrics (
            id, user_id, date, energy_level, hours_slept, sleep_quality,
            mood, stress_level, weight, tasks_completed, exercise_minutes, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, 0), COALESCE($11, 0), $12)
        ON CONFLICT (user_id, date) DO UPDATE SET
            energy_level     = COALESCE($4, daily_metrics.energy_level),
            hours_slept      = COALESCE($5, daily_metrics.hours_slept),
            sleep_quality    = COALESCE($6, daily_metrics.sleep_quality),
            mood             = COALESCE($7, daily_metrics.mood),
            stress_level     = COALESCE($8, daily_metrics.stress_level),
            weight           = COALESCE($9, daily_metrics.weight),
            tasks_completed  = COALESCE($10, daily_metrics.tasks_completed),
            exercise_minutes = COALESCE($11, daily_metrics.exercise_minutes),
            notes            = COALESCE($12, daily_metrics.notes),
            updated_at       = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(date)
    .bind(values.energy_level)
    .bind(values.hours_slept)
    .bind(values.sleep_quality)
    .bind(values.mood)
    .bind(values.stress_level)
    .bind(values.weight)
    .bind(values.tasks_completed)
    .bind(values.exercise_minutes)
    .bind(&values.notes)
    .fetch_one(db)
    .await?;

    Ok(metric)
}

/// Update an existing record. Returns `None` when there is nothing logged for
/// that date.
pub async fn update(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    date: NaiveDate,
    values: &MetricValues,
) -> AppResult<Option<DailyMetric>> {
    let metric = sqlx::query_as::<_, DailyMetric>(
        r#"
        UPDATE daily_metrics SET
            energy_level     = COALESCE($3, energy_level),
            hours_slept      = COALESCE($4, hours_slept),
            sleep_quality    = COALESCE($5, sleep_quality),
            mood             = COALESCE($6, mood),
            stress_level     = COALESCE($7, stress_level),
            weight           = COALESCE($8, weight),
            tasks_completed  = COALESCE($9, tasks_completed),
            exercise_minutes = COALESCE($10, exercise_minutes),
            notes            = COALESCE($11, notes),
            updated_at       = NOW()
        WHERE user_id = $1 AND date = $2
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(date)
    .bind(values.energy_level)
    .bind(values.hours_slept)
    .bind(values.sleep_quality)
    .bind(values.mood)
    .bind(values.stress_level)
    .bind(values.weight)
    .bind(values.tasks_completed)
    .bind(values.exercise_minutes)
    .bind(&values.notes)
    .fetch_optional(db)
    .await?;

    Ok(metric)
}

/// Count one completed task (plus any exercise minutes) against `date`,
/// creating the record if needed.
pub async fn increment_tasks_completed(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    date: NaiveDate,
    exercise_minutes: i32,
) -> AppResult<DailyMetric> {
    let metric = sqlx::query_as::<_, DailyMetric>(
        r#"
        INSERT INTO daily_metrics (id, user_id, date, tasks_completed, exercise_minutes)
        VALUES ($1, $2, $3, 1, $4)
        ON CONFLICT (user_id, date) DO UPDATE SET
            tasks_completed  = daily_metrics.tasks_completed + 1,
            exercise_minutes = daily_metrics.exercise_minutes + $4,
            updated_at       = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(date)
    .bind(exercise_minutes)
    .fetch_one(db)
    .await?;

    Ok(metric)
}

/// Date of the user's most recent daily record.
pub async fn latest_date(db: impl PgExecutor<'_>, user_id: Uuid) -> AppResult<Option<NaiveDate>> {
    let date = sqlx::query_scalar::<_, Option<NaiveDate>>(
        "SELECT MAX(date) FROM daily_metrics WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(date)
}

/// Consecutive days ending at `today` with at least one task completed.
pub async fn streak(db: &PgPool, user_id: Uuid, today: NaiveDate) -> AppResult<i64> {
    let start = window_start(today, STREAK_CAP);
    let dates = sqlx::query_scalar::<_, NaiveDate>(
        r#"
        SELECT date FROM daily_metrics
        WHERE user_id = $1 AND date BETWEEN $2 AND $3 AND tasks_completed > 0
        ORDER BY date DESC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(today)
    .fetch_all(db)
    .await?;

    Ok(count_streak(&dates, today))
}

/// `active_dates` must be sorted newest first.
pub fn count_streak(active_dates: &[NaiveDate], today: NaiveDate) -> i64 {
    let mut expected = today;
    let mut streak = 0;
    for &date in active_dates {
        if date != expected || streak >= STREAK_CAP {
            break;
        }
        streak += 1;
        expected = date - Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, day).unwrap()
    }

    #[test]
    fn test_streak_counts_back_from_today() {
        assert_eq!(count_streak(&[d(20), d(19), d(18), d(16)], d(20)), 3);
    }

    #[test]
    fn test_streak_is_zero_without_today() {
        assert_eq!(count_streak(&[d(19), d(18)], d(20)), 0);
        assert_eq!(count_streak(&[], d(20)), 0);
    }

    #[test]
    fn test_window_start_includes_today() {
        assert_eq!(window_start(d(20), 7), d(14));
        assert_eq!(window_start(d(20), 1), d(20));
    }
}
