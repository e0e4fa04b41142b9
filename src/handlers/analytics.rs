use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{Duration, NaiveDate, Utc};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::db;
use crate::dto::{
    BodyBatteryResponse, DailyMetricCreateRequest, DailyMetricUpdateRequest, DaysQuery,
    EnergyHistoryEntry, HabitDay, StreakResponse,
};
use crate::error::{AppError, AppResult};
use crate::models::daily_metric::DailyMetric;
use crate::services::body_battery::{
    energy_advice, energy_trend, predict_next, resolve_current_energy, sleep_energy_correlation,
    EnergyStatus, SleepEnergyCorrelation,
};
use crate::AppState;

const TREND_WINDOW_DAYS: i64 = 7;
const CORRELATION_WINDOW_DAYS: i64 = 30;
const ASSUMED_SLEEP_HOURS: f64 = 8.0;

pub async fn log_metrics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<DailyMetricCreateRequest>,
) -> AppResult<(StatusCode, Json<DailyMetric>)> {
    body.validate()?;

    let date = body.date.unwrap_or_else(|| Utc::now().date_naive());
    let metric = db::metrics::upsert(&state.db, auth_user.id, date, &body.into_values()).await?;

    tracing::debug!(user_id = %auth_user.id, %date, "Daily metrics logged");
    Ok((StatusCode::CREATED, Json(metric)))
}

pub async fn today_metrics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<DailyMetric>> {
    let today = Utc::now().date_naive();
    let metric = db::metrics::get_by_date(&state.db, auth_user.id, today)
        .await?
        .ok_or(AppError::NotFound("No metrics logged for today".into()))?;

    Ok(Json(metric))
}

pub async fn metrics_by_date(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<DailyMetric>> {
    let metric = db::metrics::get_by_date(&state.db, auth_user.id, date)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No metrics found for {}", date)))?;

    Ok(Json(metric))
}

pub async fn update_metrics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(date): Path<NaiveDate>,
    Json(body): Json<DailyMetricUpdateRequest>,
) -> AppResult<Json<DailyMetric>> {
    body.validate()?;

    let metric = db::metrics::update(&state.db, auth_user.id, date, &body.into_values())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No metrics found for {}", date)))?;

    Ok(Json(metric))
}

pub async fn body_battery(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<BodyBatteryResponse>> {
    let today = Utc::now().date_naive();
    let window =
        db::metrics::get_last_n_days(&state.db, auth_user.id, TREND_WINDOW_DAYS, today).await?;

    let today_metric = window.iter().find(|m| m.date == today);
    let yesterday_metric = window.iter().find(|m| m.date == today - Duration::days(1));

    let tasks_total = match db::plans::get_active(&state.db, auth_user.id).await? {
        Some(plan) => db::tasks::by_date(&state.db, plan.id, today).await?.len() as i32,
        None => 0,
    };

    let current = resolve_current_energy(today_metric, yesterday_metric, tasks_total);
    let trend = energy_trend(&window.iter().map(|m| m.energy_level).collect::<Vec<_>>());
    let status = EnergyStatus::from_energy(current);

    Ok(Json(BodyBatteryResponse {
        current_energy: current,
        status: status.label(),
        status_description: status.description(),
        trend,
        predicted_tomorrow: predict_next(current, ASSUMED_SLEEP_HOURS),
        advice: energy_advice(current, trend, today_metric),
        last_updated: today,
    }))
}

pub async fn energy_history(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<DaysQuery>,
) -> AppResult<Json<Vec<EnergyHistoryEntry>>> {
    let days = query.resolve(7, 90).map_err(AppError::Validation)?;
    let today = Utc::now().date_naive();
    let metrics = db::metrics::get_last_n_days(&state.db, auth_user.id, days, today).await?;

    Ok(Json(fill_history(
        &metrics,
        db::metrics::window_start(today, days),
        today,
    )))
}

pub async fn habit_grid(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<DaysQuery>,
) -> AppResult<Json<Vec<HabitDay>>> {
    let days = query.resolve(90, 365).map_err(AppError::Validation)?;
    let today = Utc::now().date_naive();
    let metrics = db::metrics::get_last_n_days(&state.db, auth_user.id, days, today).await?;

    let grid = metrics
        .iter()
        .map(|m| HabitDay {
            date: m.date,
            tasks_completed: m.tasks_completed,
            completion_level: completion_level(m.tasks_completed),
        })
        .collect();

    Ok(Json(grid))
}

pub async fn streak(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<StreakResponse>> {
    let streak = db::metrics::streak(&state.db, auth_user.id, Utc::now().date_naive()).await?;

    Ok(Json(StreakResponse {
        current_streak: streak,
        message: streak_message(streak),
    }))
}

pub async fn sleep_energy(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<SleepEnergyCorrelation>> {
    let today = Utc::now().date_naive();
    let metrics =
        db::metrics::get_last_n_days(&state.db, auth_user.id, CORRELATION_WINDOW_DAYS, today)
            .await?;

    let pairs: Vec<(f64, i32)> = metrics
        .iter()
        .filter_map(|m| Some((m.hours_slept?, m.energy_level?)))
        .collect();

    Ok(Json(sleep_energy_correlation(&pairs)))
}

/// One entry per day from `start` through `end`; days with no record get
/// nulls and zero tasks.
pub fn fill_history(
    metrics: &[DailyMetric],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<EnergyHistoryEntry> {
    let by_date: HashMap<NaiveDate, &DailyMetric> = metrics.iter().map(|m| (m.date, m)).collect();

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| {
            let m = by_date.get(&date);
            EnergyHistoryEntry {
                date,
                energy_level: m.and_then(|m| m.energy_level),
                tasks_completed: m.map(|m| m.tasks_completed).unwrap_or(0),
                hours_slept: m.and_then(|m| m.hours_slept),
            }
        })
        .collect()
}

/// Contribution-grid intensity for a day's completed task count.
pub fn completion_level(tasks_completed: i32) -> u8 {
    match tasks_completed {
        i32::MIN..=0 => 0,
        1 => 1,
        2..=3 => 2,
        4..=5 => 3,
        _ => 4,
    }
}

pub fn streak_message(streak: i64) -> String {
    match streak {
        0 => "Start your streak today! Complete your first task.".into(),
        1 => "Great start! Keep the momentum going.".into(),
        s if s < 7 => format!("{s} days strong! You're building a habit."),
        s if s < 30 => format!("Amazing! {s} day streak. You're on fire!"),
        s if s < 100 => format!("Incredible! {s} days in a row. You're unstoppable!"),
        s => format!("Legendary! {s} day streak. You're a true champion!"),
    }
}
