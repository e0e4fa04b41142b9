use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Biometric {
    pub id: Uuid,
    pub user_id: Uuid,
    pub metric_type: BiometricType,
    pub value: f64,
    pub unit: Option<String>,
    pub measurement_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "biometric_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BiometricType {
    Weight,
    BodyFat,
    MuscleMass,
    Bmi,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    HeartRate,
    SleepHours,
    Steps,
    /// Liters
    WaterIntake,
    CaloriesConsumed,
    CaloriesBurned,
}

impl BiometricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::BodyFat => "body_fat",
            Self::MuscleMass => "muscle_mass",
            Self::Bmi => "bmi",
            Self::BloodPressureSystolic => "blood_pressure_systolic",
            Self::BloodPressureDiastolic => "blood_pressure_diastolic",
            Self::HeartRate => "heart_rate",
            Self::SleepHours => "sleep_hours",
            Self::Steps => "steps",
            Self::WaterIntake => "water_intake",
            Self::CaloriesConsumed => "calories_consumed",
            Self::CaloriesBurned => "calories_burned",
        }
    }
}
