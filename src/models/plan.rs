use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub roadmap: Json<Roadmap>,
    /// 0-indexed into `roadmap.phases`
    pub current_phase: i32,
    pub completion_percentage: f64,
    pub is_active: bool,
    /// Day a return-from-absence adjustment was last applied
    pub last_return_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Roadmap {
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    pub name: String,
    pub duration: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub milestones: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Timeline {
    #[serde(default)]
    pub total_duration: String,
    #[serde(default)]
    pub estimated_completion: String,
}

impl Roadmap {
    pub fn total_milestones(&self) -> usize {
        self.phases.iter().map(|p| p.milestones.len()).sum()
    }

    /// Milestones belonging to phases strictly before `current_phase`.
    pub fn milestones_reached(&self, current_phase: i32) -> usize {
        self.phases
            .iter()
            .take(current_phase.max(0) as usize)
            .map(|p| p.milestones.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(name: &str, milestones: usize) -> Phase {
        Phase {
            name: name.into(),
            duration: "4 weeks".into(),
            goals: vec![],
            milestones: (0..milestones).map(|i| format!("m{i}")).collect(),
        }
    }

    #[test]
    fn test_milestones_reached_counts_completed_phases_only() {
        let roadmap = Roadmap {
            phases: vec![phase("Foundation", 2), phase("Progress", 3), phase("Optimization", 1)],
            timeline: Timeline::default(),
        };
        assert_eq!(roadmap.total_milestones(), 6);
        assert_eq!(roadmap.milestones_reached(0), 0);
        assert_eq!(roadmap.milestones_reached(2), 5);
        assert_eq!(roadmap.milestones_reached(10), 6);
    }

    #[test]
    fn test_roadmap_parses_without_timeline() {
        let roadmap: Roadmap = serde_json::from_str(
            r#"{"phases":[{"name":"Foundation","duration":"4 weeks"}]}"#,
        )
        .unwrap();
        assert_eq!(roadmap.phases.len(), 1);
        assert!(roadmap.phases[0].goals.is_empty());
        assert_eq!(roadmap.timeline, Timeline::default());
    }
}
