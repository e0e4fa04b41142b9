//! Body Battery energy model.
//!
//! Turns a day's sleep, exercise, stress, and task completion into a 0-100
//! energy score carried over from the previous day, and derives the status
//! label, trend, next-day prediction, and advice shown on the dashboard.
//!
//! Scale:
//! - 0-20: Exhausted (rest needed)
//! - 21-40: Low (light activities only)
//! - 41-60: Moderate (normal activities)
//! - 61-80: Good (ready for challenges)
//! - 81-100: Excellent (peak performance)
//!
//! Everything here is pure. Input ranges are validated at the request layer.

use serde::{Deserialize, Serialize};

use crate::models::daily_metric::DailyMetric;

pub const MIN_ENERGY: i32 = 0;
pub const MAX_ENERGY: i32 = 100;
/// Starting point when there is no previous day to carry over from.
pub const DEFAULT_ENERGY: i32 = 50;

const TREND_MIN_POINTS: usize = 3;
const TREND_THRESHOLD: f64 = 5.0;
const CORRELATION_MIN_POINTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyInputs {
    pub previous_energy: i32,
    pub hours_slept: Option<f64>,
    pub sleep_quality: Option<i32>,
    pub exercise_minutes: i32,
    pub stress_level: Option<i32>,
    pub tasks_completed: i32,
    pub tasks_total: i32,
}

impl Default for EnergyInputs {
    fn default() -> Self {
        Self {
            previous_energy: DEFAULT_ENERGY,
            hours_slept: None,
            sleep_quality: None,
            exercise_minutes: 0,
            stress_level: None,
            tasks_completed: 0,
            tasks_total: 0,
        }
    }
}

/// Today's energy score. Components are summed onto `previous_energy` and the
/// total is clamped once at the end.
pub fn compute_energy(inputs: &EnergyInputs) -> i32 {
    let delta = sleep_boost(inputs.hours_slept, inputs.sleep_quality)
        + exercise_delta(inputs.exercise_minutes)
        + stress_delta(inputs.stress_level)
        + task_delta(inputs.tasks_completed, inputs.tasks_total);

    (inputs.previous_energy + delta).clamp(MIN_ENERGY, MAX_ENERGY)
}

fn sleep_boost(hours_slept: Option<f64>, sleep_quality: Option<i32>) -> i32 {
    let Some(hours) = hours_slept else {
        return 0;
    };

    let base = if (7.0..=9.0).contains(&hours) {
        50
    } else if hours < 7.0 {
        (hours * 6.0).floor() as i32
    } else {
        45
    };

    match sleep_quality {
        // Integer division truncates, matching boost * (quality / 10)
        Some(quality) => base * quality / 10,
        None => base,
    }
}

fn exercise_delta(minutes: i32) -> i32 {
    match minutes {
        m if m <= 0 => 0,
        1..=30 => 5,
        31..=60 => 0,
        // Long sessions cost energy the same day
        _ => -10,
    }
}

fn stress_delta(stress_level: Option<i32>) -> i32 {
    match stress_level {
        Some(s) if s >= 8 => -30,
        Some(6..=7) => -15,
        Some(4..=5) => -5,
        _ => 0,
    }
}

fn task_delta(completed: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    let rate = completed as f64 / total as f64;
    if rate >= 0.8 {
        10
    } else if rate >= 0.5 {
        5
    } else if rate < 0.3 {
        -5
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EnergyStatus {
    Excellent,
    Good,
    Moderate,
    Low,
    Exhausted,
}

impl EnergyStatus {
    pub fn from_energy(energy: i32) -> Self {
        match energy {
            e if e >= 81 => Self::Excellent,
            e if e >= 61 => Self::Good,
            e if e >= 41 => Self::Moderate,
            e if e >= 21 => Self::Low,
            _ => Self::Exhausted,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::Low => "Low",
            Self::Exhausted => "Exhausted",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent - Peak performance!",
            Self::Good => "Good - Ready for challenges",
            Self::Moderate => "Moderate - Normal activities",
            Self::Low => "Low - Light activities recommended",
            Self::Exhausted => "Exhausted - Rest needed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnergyTrend {
    Increasing,
    Stable,
    Decreasing,
}

/// Direction of a window of energy values, oldest first. Missing days are
/// skipped; fewer than three recorded values reads as stable.
pub fn energy_trend(history: &[Option<i32>]) -> EnergyTrend {
    let values: Vec<f64> = history.iter().flatten().map(|&e| e as f64).collect();
    if values.len() < TREND_MIN_POINTS {
        return EnergyTrend::Stable;
    }

    let (first, second) = values.split_at(values.len() / 2);
    let diff = mean(second) - mean(first);

    if diff > TREND_THRESHOLD {
        EnergyTrend::Increasing
    } else if diff < -TREND_THRESHOLD {
        EnergyTrend::Decreasing
    } else {
        EnergyTrend::Stable
    }
}

/// Tomorrow's energy assuming an average night: quality 7, moderate stress,
/// nothing else logged.
pub fn predict_next(current_energy: i32, assumed_sleep_hours: f64) -> i32 {
    compute_energy(&EnergyInputs {
        previous_energy: current_energy,
        hours_slept: Some(assumed_sleep_hours),
        sleep_quality: Some(7),
        exercise_minutes: 0,
        stress_level: Some(5),
        tasks_completed: 0,
        tasks_total: 0,
    })
}

pub const ADVICE_LOW_ENERGY: &str = "Your energy is low. Prioritize rest and recovery today.";
pub const ADVICE_HIGH_ENERGY: &str = "Great energy! Perfect time for challenging workouts.";
pub const ADVICE_DECLINING: &str =
    "Your energy has been declining. Focus on sleep quality and stress management.";
pub const ADVICE_RISING: &str = "Energy trending up! Keep up your current habits.";
pub const ADVICE_SHORT_SLEEP: &str = "Try to get 7-9 hours of sleep tonight.";
pub const ADVICE_OVERSLEEP: &str = "You might be oversleeping. Aim for 7-9 hours.";
pub const ADVICE_HIGH_STRESS: &str =
    "High stress detected. Consider meditation or light stretching.";
pub const ADVICE_MAINTAIN: &str = "Keep maintaining your healthy habits!";

/// Advice fragments in fixed priority order, joined by single spaces.
pub fn energy_advice(
    current_energy: i32,
    trend: EnergyTrend,
    today: Option<&DailyMetric>,
) -> String {
    let mut parts: Vec<&str> = Vec::new();

    if current_energy < 40 {
        parts.push(ADVICE_LOW_ENERGY);
    } else if current_energy > 80 {
        parts.push(ADVICE_HIGH_ENERGY);
    }

    match trend {
        EnergyTrend::Decreasing => parts.push(ADVICE_DECLINING),
        EnergyTrend::Increasing => parts.push(ADVICE_RISING),
        EnergyTrend::Stable => {}
    }

    if let Some(hours) = today.and_then(|m| m.hours_slept) {
        if hours < 7.0 {
            parts.push(ADVICE_SHORT_SLEEP);
        } else if hours > 9.0 {
            parts.push(ADVICE_OVERSLEEP);
        }
    }

    if today.and_then(|m| m.stress_level).is_some_and(|s| s >= 7) {
        parts.push(ADVICE_HIGH_STRESS);
    }

    if parts.is_empty() {
        parts.push(ADVICE_MAINTAIN);
    }

    parts.join(" ")
}

/// Today's energy: the logged value if there is one, otherwise computed from
/// yesterday's score (or the default) and whatever today's record holds.
pub fn resolve_current_energy(
    today: Option<&DailyMetric>,
    yesterday: Option<&DailyMetric>,
    tasks_total: i32,
) -> i32 {
    if let Some(energy) = today.and_then(|m| m.energy_level) {
        return energy;
    }

    let previous_energy = yesterday
        .and_then(|m| m.energy_level)
        .unwrap_or(DEFAULT_ENERGY);

    compute_energy(&EnergyInputs {
        previous_energy,
        hours_slept: today.and_then(|m| m.hours_slept),
        sleep_quality: today.and_then(|m| m.sleep_quality),
        exercise_minutes: today.map(|m| m.exercise_minutes).unwrap_or(0),
        stress_level: today.and_then(|m| m.stress_level),
        tasks_completed: today.map(|m| m.tasks_completed).unwrap_or(0),
        tasks_total,
    })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SleepEnergyCorrelation {
    pub correlation: Option<f64>,
    pub insight: String,
    pub data_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_sleep: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_energy: Option<f64>,
}

pub const INSIGHT_NOT_ENOUGH_DATA: &str =
    "Not enough data. Log sleep and energy for at least 5 days.";

/// Pearson correlation between hours slept and energy over paired days.
pub fn sleep_energy_correlation(pairs: &[(f64, i32)]) -> SleepEnergyCorrelation {
    let n = pairs.len();
    if n < CORRELATION_MIN_POINTS {
        return SleepEnergyCorrelation {
            correlation: None,
            insight: INSIGHT_NOT_ENOUGH_DATA.into(),
            data_points: n,
            average_sleep: None,
            average_energy: None,
        };
    }

    let sleep: Vec<f64> = pairs.iter().map(|&(s, _)| s).collect();
    let energy: Vec<f64> = pairs.iter().map(|&(_, e)| e as f64).collect();
    let mean_sleep = mean(&sleep);
    let mean_energy = mean(&energy);

    let numerator: f64 = sleep
        .iter()
        .zip(&energy)
        .map(|(s, e)| (s - mean_sleep) * (e - mean_energy))
        .sum();
    let spread_sleep = sleep.iter().map(|s| (s - mean_sleep).powi(2)).sum::<f64>().sqrt();
    let spread_energy = energy.iter().map(|e| (e - mean_energy).powi(2)).sum::<f64>().sqrt();

    let r = if spread_sleep == 0.0 || spread_energy == 0.0 {
        0.0
    } else {
        numerator / (spread_sleep * spread_energy)
    };

    let insight = if r > 0.5 {
        "Strong positive correlation! More sleep = more energy for you."
    } else if r > 0.2 {
        "Moderate positive correlation. Sleep helps your energy."
    } else if r < -0.2 {
        "Interesting! Your energy might be affected by sleep quality, not just duration."
    } else {
        "Weak correlation. Other factors might be influencing your energy more."
    };

    SleepEnergyCorrelation {
        correlation: Some(round_to(r, 2)),
        insight: insight.into(),
        data_points: n,
        average_sleep: Some(round_to(mean_sleep, 1)),
        average_energy: Some(round_to(mean_energy, 1)),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
