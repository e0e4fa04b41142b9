use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub date_of_birth: Option<NaiveDate>,
    pub current_weight: Option<f64>,
    pub goal_weight: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub goals: Vec<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "activity_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// Exercise 1-3 times/week
    Light,
    /// Exercise 4-5 times/week
    Moderate,
    /// Daily exercise or intense exercise 3-4 times/week
    Active,
    /// Intense exercise 6-7 times/week
    VeryActive,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Active => "active",
            Self::VeryActive => "very_active",
        }
    }
}

/// Public view of a user, returned by `/api/auth/me` and `/api/users/me`.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub date_of_birth: Option<NaiveDate>,
    pub current_weight: Option<f64>,
    pub goal_weight: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub goals: Vec<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            age: u.age,
            gender: u.gender,
            height_cm: u.height_cm,
            date_of_birth: u.date_of_birth,
            current_weight: u.current_weight,
            goal_weight: u.goal_weight,
            activity_level: u.activity_level,
            goals: u.goals,
            is_active: u.is_active,
            is_verified: u.is_verified,
            created_at: u.created_at,
        }
    }
}

/// The subset of a profile that plan generation and coaching prompts use.
#[derive(Debug, Clone, Default)]
pub struct HealthProfile {
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub current_weight: Option<f64>,
    pub goal_weight: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub goals: Vec<String>,
}

impl HealthProfile {
    pub fn bmi(&self) -> Option<f64> {
        match (self.height_cm, self.current_weight) {
            (Some(h), Some(w)) if h > 0.0 => {
                let m = h / 100.0;
                Some(w / (m * m))
            }
            _ => None,
        }
    }

    pub fn goals_text(&self) -> String {
        if self.goals.is_empty() {
            "General health improvement".into()
        } else {
            self.goals.join(", ")
        }
    }
}

impl From<&User> for HealthProfile {
    fn from(u: &User) -> Self {
        Self {
            age: u.age,
            gender: u.gender,
            height_cm: u.height_cm,
            current_weight: u.current_weight,
            goal_weight: u.goal_weight,
            activity_level: u.activity_level,
            goals: u.goals.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub revoked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmi_requires_height_and_weight() {
        let mut profile = HealthProfile {
            height_cm: Some(180.0),
            ..Default::default()
        };
        assert!(profile.bmi().is_none());

        profile.current_weight = Some(81.0);
        let bmi = profile.bmi().unwrap();
        assert!((bmi - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_goals_text_default() {
        assert_eq!(HealthProfile::default().goals_text(), "General health improvement");
    }
}
