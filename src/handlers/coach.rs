use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::db;
use crate::dto::{ChatRequest, KnowledgeQuery};
use crate::error::{AppError, AppResult};
use crate::models::daily_metric::DailyMetric;
use crate::models::user::HealthProfile;
use crate::services::coach::{self, ChatReply, DailyInsight, KnowledgeArticle, Source};
use crate::AppState;

const INSIGHT_ACTIVITY_DAYS: i64 = 7;

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    #[serde(flatten)]
    pub insight: DailyInsight,
    pub source: Source,
}

async fn load_profile(state: &AppState, user_id: Uuid) -> AppResult<HealthProfile> {
    let user = db::users::by_id(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;
    Ok(HealthProfile::from(&user))
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    body.validate()?;
    let profile = load_profile(&state, auth_user.id).await?;

    let reply = coach::chat(
        &*state.llm,
        &profile,
        &body.message,
        body.context.as_deref(),
        &body.history,
        state.config.llm_timeout(),
    )
    .await;

    tracing::debug!(user_id = %auth_user.id, source = ?reply.source, "Coach reply");
    Ok(Json(reply))
}

pub async fn insight(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<InsightResponse>> {
    let profile = load_profile(&state, auth_user.id).await?;
    let metrics = db::metrics::get_last_n_days(
        &state.db,
        auth_user.id,
        INSIGHT_ACTIVITY_DAYS,
        Utc::now().date_naive(),
    )
    .await?;

    let (insight, source) = coach::daily_insight(
        &*state.llm,
        &profile,
        &recent_activity(&metrics),
        state.config.insight_timeout(),
    )
    .await;

    Ok(Json(InsightResponse { insight, source }))
}

pub async fn knowledge(Query(query): Query<KnowledgeQuery>) -> AppResult<Json<Vec<KnowledgeArticle>>> {
    query.validate()?;

    let results = coach::search_knowledge(
        query.query.as_deref().unwrap_or(""),
        query.category.as_deref(),
        query.limit(),
    );
    Ok(Json(results))
}

/// A few lines describing the last week, for the insight prompt.
pub fn recent_activity(metrics: &[DailyMetric]) -> String {
    if metrics.is_empty() {
        return "No activity logged in the last week.".into();
    }

    let days = metrics.len();
    let tasks: i32 = metrics.iter().map(|m| m.tasks_completed).sum();
    let exercise: i32 = metrics.iter().map(|m| m.exercise_minutes).sum();
    let mut lines = vec![
        format!("Days logged: {days}"),
        format!("Tasks completed: {tasks}"),
        format!("Exercise minutes: {exercise}"),
    ];

    let energy: Vec<i32> = metrics.iter().filter_map(|m| m.energy_level).collect();
    if !energy.is_empty() {
        let avg = energy.iter().sum::<i32>() as f64 / energy.len() as f64;
        lines.push(format!("Average energy: {avg:.0}/100"));
    }
    let sleep: Vec<f64> = metrics.iter().filter_map(|m| m.hours_slept).collect();
    if !sleep.is_empty() {
        let avg = sleep.iter().sum::<f64>() / sleep.len() as f64;
        lines.push(format!("Average sleep: {avg:.1}h"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn metric(day: u32, energy: Option<i32>, sleep: Option<f64>) -> DailyMetric {
        DailyMetric {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            energy_level: energy,
            hours_slept: sleep,
            sleep_quality: None,
            mood: None,
            stress_level: None,
            weight: None,
            tasks_completed: 2,
            exercise_minutes: 15,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_recent_activity_summary() {
        assert_eq!(recent_activity(&[]), "No activity logged in the last week.");

        let text = recent_activity(&[metric(1, Some(60), Some(7.0)), metric(2, None, Some(8.0))]);
        assert!(text.contains("Days logged: 2"));
        assert!(text.contains("Tasks completed: 4"));
        assert!(text.contains("Exercise minutes: 30"));
        assert!(text.contains("Average energy: 60/100"));
        assert!(text.contains("Average sleep: 7.5h"));
    }
}
