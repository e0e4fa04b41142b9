use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeeklyReview {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_number: i32,
    pub wins: Vec<String>,
    pub challenges: Vec<String>,
    pub lessons: Vec<String>,
    pub energy_average: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
