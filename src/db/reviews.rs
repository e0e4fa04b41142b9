use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::weekly_review::WeeklyReview;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewReview {
    pub week_number: i32,
    pub wins: Vec<String>,
    pub challenges: Vec<String>,
    pub lessons: Vec<String>,
    pub energy_average: f64,
    pub notes: Option<String>,
}

pub async fn create(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    review: &NewReview,
) -> AppResult<WeeklyReview> {
    let review = sqlx::query_as::<_, WeeklyReview>(
        r#"
        INSERT INTO weekly_reviews (id, user_id, week_number, wins, challenges, lessons,
                                    energy_average, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(review.week_number)
    .bind(&review.wins)
    .bind(&review.challenges)
    .bind(&review.lessons)
    .bind(review.energy_average)
    .bind(&review.notes)
    .fetch_one(db)
    .await?;

    Ok(review)
}
