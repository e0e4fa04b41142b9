use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use validator::Validate;

use crate::auth::{middleware::AuthUser, password::hash_password};
use crate::db::{self, users::ProfileChanges};
use crate::dto::{BiometricCreateRequest, UpdateProfileRequest, UserStatsResponse, WeightProgress};
use crate::error::{AppError, AppResult};
use crate::models::biometric::{Biometric, BiometricType};
use crate::models::user::{User, UserProfile};
use crate::AppState;

const WEIGHT_WINDOW_DAYS: i64 = 30;

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = db::users::by_id(&state.db, auth_user.id)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    body.validate()?;

    let password_hash = match body.password.as_deref() {
        Some(p) => Some(hash_password(p)?),
        None => None,
    };
    let changes = ProfileChanges {
        full_name: body.full_name,
        age: body.age,
        gender: body.gender,
        height_cm: body.height_cm,
        date_of_birth: body.date_of_birth,
        current_weight: body.current_weight,
        goal_weight: body.goal_weight,
        activity_level: body.activity_level,
        goals: body.goals,
        password_hash,
    };

    let user = db::users::update(&state.db, auth_user.id, &changes)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(user.into()))
}

pub async fn add_biometric(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<BiometricCreateRequest>,
) -> AppResult<(StatusCode, Json<Biometric>)> {
    body.validate()?;

    let date = body
        .measurement_date
        .unwrap_or_else(|| Utc::now().date_naive());
    let biometric = db::users::insert_biometric(
        &state.db,
        auth_user.id,
        body.metric_type,
        body.value,
        body.unit.as_deref(),
        date,
        body.notes.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(biometric)))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserStatsResponse>> {
    let user = db::users::by_id(&state.db, auth_user.id)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    let biometrics_count = db::users::biometrics_count(&state.db, user.id).await?;

    let mut latest_biometrics = serde_json::Map::new();
    for b in db::users::latest_biometrics(&state.db, user.id).await? {
        latest_biometrics.insert(
            b.metric_type.as_str().to_string(),
            json!({
                "value": b.value,
                "unit": b.unit,
                "measurement_date": b.measurement_date,
            }),
        );
    }

    let since = Utc::now().date_naive() - Duration::days(WEIGHT_WINDOW_DAYS);
    let weights: Vec<(NaiveDate, f64)> =
        db::users::biometrics_since(&state.db, user.id, BiometricType::Weight, since)
            .await?
            .into_iter()
            .map(|b| (b.measurement_date, b.value))
            .collect();

    let plans_count = db::plans::count_for_user(&state.db, user.id).await?;
    let active_plan = db::plans::get_active(&state.db, user.id).await?.is_some();

    Ok(Json(UserStatsResponse {
        profile_completion: profile_completion(&user),
        biometrics_count,
        latest_biometrics,
        weight_progress: weight_progress(&weights),
        plans_count,
        active_plan,
    }))
}

/// Share of the eight optional profile fields that are filled in, 0-100.
pub fn profile_completion(user: &User) -> f64 {
    let filled = [
        user.full_name.is_some(),
        user.age.is_some(),
        user.gender.is_some(),
        user.height_cm.is_some(),
        user.current_weight.is_some(),
        user.goal_weight.is_some(),
        user.activity_level.is_some(),
        !user.goals.is_empty(),
    ];
    let count = filled.iter().filter(|f| **f).count() as f64;
    round2(count / filled.len() as f64 * 100.0)
}

/// Change from the first to the last measurement. Needs at least two.
pub fn weight_progress(measurements: &[(NaiveDate, f64)]) -> Option<WeightProgress> {
    let (first, last) = match measurements {
        [first, .., last] => (first, last),
        _ => return None,
    };

    let change = last.1 - first.1;
    let percentage = if first.1 != 0.0 {
        round2(change / first.1 * 100.0)
    } else {
        0.0
    };

    Some(WeightProgress {
        change: round2(change),
        unit: "kg",
        start_date: first.0,
        end_date: last.0,
        percentage,
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{ActivityLevel, Gender};
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            password_hash: String::new(),
            full_name: None,
            age: None,
            gender: None,
            height_cm: None,
            date_of_birth: None,
            current_weight: None,
            goal_weight: None,
            activity_level: None,
            goals: vec![],
            is_active: true,
            is_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_completion() {
        let mut u = user();
        assert_eq!(profile_completion(&u), 0.0);

        u.full_name = Some("Sam".into());
        u.age = Some(30);
        u.gender = Some(Gender::Other);
        u.activity_level = Some(ActivityLevel::Light);
        assert_eq!(profile_completion(&u), 50.0);

        u.height_cm = Some(170.0);
        u.current_weight = Some(70.0);
        u.goal_weight = Some(65.0);
        u.goals = vec!["sleep better".into()];
        assert_eq!(profile_completion(&u), 100.0);
    }

    #[test]
    fn test_weight_progress_needs_two_points() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        assert!(weight_progress(&[]).is_none());
        assert!(weight_progress(&[(d(1), 80.0)]).is_none());

        let p = weight_progress(&[(d(1), 80.0), (d(10), 79.0), (d(20), 78.0)]).unwrap();
        assert_eq!(p.change, -2.0);
        assert_eq!(p.percentage, -2.5);
        assert_eq!(p.start_date, d(1));
        assert_eq!(p.end_date, d(20));
    }
}
