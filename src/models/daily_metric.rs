use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per (user, date). Energy is the 0-100 Body Battery value.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DailyMetric {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub energy_level: Option<i32>,
    pub hours_slept: Option<f64>,
    pub sleep_quality: Option<i32>,
    pub mood: Option<i32>,
    pub stress_level: Option<i32>,
    pub weight: Option<f64>,
    pub tasks_completed: i32,
    pub exercise_minutes: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
