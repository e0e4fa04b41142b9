use chrono::NaiveDate;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::biometric::{Biometric, BiometricType};
use crate::models::user::{ActivityLevel, Gender, User};

/// Fields written at registration besides the credentials.
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub current_weight: Option<f64>,
    pub goal_weight: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub goals: Vec<String>,
}

/// Partial profile update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub date_of_birth: Option<NaiveDate>,
    pub current_weight: Option<f64>,
    pub goal_weight: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub goals: Option<Vec<String>>,
    pub password_hash: Option<String>,
}

pub async fn by_id(db: impl PgExecutor<'_>, user_id: Uuid) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

pub async fn by_email(db: impl PgExecutor<'_>, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(db)
        .await?;

    Ok(user)
}

pub async fn email_exists(db: impl PgExecutor<'_>, email: &str) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER($1)",
    )
    .bind(email)
    .fetch_one(db)
    .await?;

    Ok(count > 0)
}

pub async fn create(
    db: impl PgExecutor<'_>,
    email: &str,
    password_hash: &str,
    profile: &NewProfile,
) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, age, gender, height_cm,
                           current_weight, goal_weight, activity_level, goals)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(&profile.full_name)
    .bind(profile.age)
    .bind(profile.gender)
    .bind(profile.height_cm)
    .bind(profile.current_weight)
    .bind(profile.goal_weight)
    .bind(profile.activity_level)
    .bind(&profile.goals)
    .fetch_one(db)
    .await?;

    Ok(user)
}

pub async fn update(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    changes: &ProfileChanges,
) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            full_name      = COALESCE($2, full_name),
            age            = COALESCE($3, age),
            gender         = COALESCE($4, gender),
            height_cm      = COALESCE($5, height_cm),
            date_of_birth  = COALESCE($6, date_of_birth),
            current_weight = COALESCE($7, current_weight),
            goal_weight    = COALESCE($8, goal_weight),
            activity_level = COALESCE($9, activity_level),
            goals          = COALESCE($10, goals),
            password_hash  = COALESCE($11, password_hash),
            updated_at     = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&changes.full_name)
    .bind(changes.age)
    .bind(changes.gender)
    .bind(changes.height_cm)
    .bind(changes.date_of_birth)
    .bind(changes.current_weight)
    .bind(changes.goal_weight)
    .bind(changes.activity_level)
    .bind(&changes.goals)
    .bind(&changes.password_hash)
    .fetch_optional(db)
    .await?;

    Ok(user)
}

pub async fn insert_biometric(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    metric_type: BiometricType,
    value: f64,
    unit: Option<&str>,
    measurement_date: NaiveDate,
    notes: Option<&str>,
) -> AppResult<Biometric> {
    let biometric = sqlx::query_as::<_, Biometric>(
        r#"
        INSERT INTO biometrics (id, user_id, metric_type, value, unit, measurement_date, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(metric_type)
    .bind(value)
    .bind(unit)
    .bind(measurement_date)
    .bind(notes)
    .fetch_one(db)
    .await?;

    Ok(biometric)
}

pub async fn biometrics_count(db: impl PgExecutor<'_>, user_id: Uuid) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM biometrics WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await?;

    Ok(count)
}

/// Newest measurement of each type the user has recorded.
pub async fn latest_biometrics(db: impl PgExecutor<'_>, user_id: Uuid) -> AppResult<Vec<Biometric>> {
    let rows = sqlx::query_as::<_, Biometric>(
        r#"
        SELECT DISTINCT ON (metric_type) *
        FROM biometrics
        WHERE user_id = $1
        ORDER BY metric_type, measurement_date DESC, created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

/// Measurements of one type on or after `since`, oldest first.
pub async fn biometrics_since(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    metric_type: BiometricType,
    since: NaiveDate,
) -> AppResult<Vec<Biometric>> {
    let rows = sqlx::query_as::<_, Biometric>(
        r#"
        SELECT * FROM biometrics
        WHERE user_id = $1 AND metric_type = $2 AND measurement_date >= $3
        ORDER BY measurement_date ASC, created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(metric_type)
    .bind(since)
    .fetch_all(db)
    .await?;

    Ok(rows)
}
