use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::db::{self, reviews::NewReview};
use crate::dto::{
    MilestoneResponse, MilestoneStatus, ProgressResponse, RoadmapResponse, WeeklyReviewRequest,
    WeeklyReviewResponse,
};
use crate::error::{AppError, AppResult};
use crate::models::plan::Plan;
use crate::models::weekly_review::WeeklyReview;
use crate::AppState;

const NEXT_STEPS: [&str; 3] = [
    "Review your wins and celebrate progress",
    "Address challenges in next week's plan",
    "Apply lessons learned to improve",
];

async fn active_plan(state: &AppState, user_id: Uuid) -> AppResult<Plan> {
    db::plans::get_active(&state.db, user_id)
        .await?
        .ok_or_else(AppError::no_active_plan)
}

pub async fn roadmap(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<RoadmapResponse>> {
    let plan = active_plan(&state, auth_user.id).await?;

    let mut response = RoadmapResponse::from_plan(&plan);
    response.plan_title = Some(plan.title);
    response.plan_description = plan.description;
    Ok(Json(response))
}

pub async fn milestones(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<MilestoneResponse>>> {
    let plan = active_plan(&state, auth_user.id).await?;
    Ok(Json(flatten_milestones(&plan)))
}

pub async fn progress(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ProgressResponse>> {
    let plan = active_plan(&state, auth_user.id).await?;
    let counts = db::tasks::counts(&state.db, plan.id).await?;
    let streak = db::metrics::streak(&state.db, auth_user.id, Utc::now().date_naive()).await?;

    let roadmap = &plan.roadmap;
    Ok(Json(ProgressResponse {
        overall_completion: plan.completion_percentage,
        current_phase: plan.current_phase,
        total_phases: roadmap.phases.len(),
        tasks_completed: counts.completed,
        tasks_total: counts.total,
        streak_days: streak,
        milestones_reached: roadmap.milestones_reached(plan.current_phase),
        milestones_total: roadmap.total_milestones(),
    }))
}

pub async fn weekly_review(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<WeeklyReviewRequest>,
) -> AppResult<(StatusCode, Json<WeeklyReviewResponse>)> {
    body.validate()?;

    let review = db::reviews::create(&state.db, auth_user.id, &NewReview::from(body)).await?;

    tracing::info!(user_id = %auth_user.id, week = review.week_number, "Weekly review saved");
    Ok((StatusCode::CREATED, Json(review_summary(&review))))
}

/// Every milestone in roadmap order. A milestone counts as achieved once the
/// plan has moved past its phase.
pub fn flatten_milestones(plan: &Plan) -> Vec<MilestoneResponse> {
    plan.roadmap
        .phases
        .iter()
        .enumerate()
        .flat_map(|(idx, phase)| {
            let status = if (idx as i32) < plan.current_phase {
                MilestoneStatus::Achieved
            } else {
                MilestoneStatus::Pending
            };
            phase.milestones.iter().map(move |name| MilestoneResponse {
                name: name.clone(),
                phase: idx,
                phase_name: phase.name.clone(),
                status,
            })
        })
        .collect()
}

pub fn review_summary(review: &WeeklyReview) -> WeeklyReviewResponse {
    let summary = format!(
        "Week {}: {} win(s), {} challenge(s), {} lesson(s). Average energy {:.1}/10.",
        review.week_number,
        review.wins.len(),
        review.challenges.len(),
        review.lessons.len(),
        review.energy_average,
    );

    WeeklyReviewResponse {
        id: review.id,
        week_number: review.week_number,
        wins_count: review.wins.len(),
        challenges_count: review.challenges.len(),
        energy_average: review.energy_average,
        summary,
        next_steps: NEXT_STEPS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::{Phase, Roadmap, Timeline};
    use sqlx::types::Json as DbJson;

    fn plan(current_phase: i32) -> Plan {
        let phase = |name: &str, milestones: &[&str]| Phase {
            name: name.into(),
            duration: "2 weeks".into(),
            goals: vec![],
            milestones: milestones.iter().map(|m| m.to_string()).collect(),
        };
        Plan {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Journey".into(),
            description: None,
            roadmap: DbJson(Roadmap {
                phases: vec![
                    phase("Foundation", &["Track 14 days", "First weigh-in"]),
                    phase("Progress", &["10% toward goal"]),
                ],
                timeline: Timeline::default(),
            }),
            current_phase,
            completion_percentage: 0.0,
            is_active: true,
            last_return_on: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_milestones_achieved_before_current_phase() {
        let milestones = flatten_milestones(&plan(1));
        assert_eq!(milestones.len(), 3);
        assert_eq!(milestones[0].status, MilestoneStatus::Achieved);
        assert_eq!(milestones[1].phase_name, "Foundation");
        assert_eq!(milestones[2].status, MilestoneStatus::Pending);
        assert_eq!(milestones[2].phase, 1);

        assert!(flatten_milestones(&plan(0))
            .iter()
            .all(|m| m.status == MilestoneStatus::Pending));
    }

    #[test]
    fn test_review_summary() {
        let review = WeeklyReview {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            week_number: 5,
            wins: vec!["Slept 8h".into(), "Walked daily".into()],
            challenges: vec!["Late dinners".into()],
            lessons: vec![],
            energy_average: 6.5,
            notes: None,
            created_at: Utc::now(),
        };
        let summary = review_summary(&review);
        assert_eq!(summary.wins_count, 2);
        assert_eq!(summary.challenges_count, 1);
        assert_eq!(
            summary.summary,
            "Week 5: 2 win(s), 1 challenge(s), 0 lesson(s). Average energy 6.5/10."
        );
        assert_eq!(summary.next_steps.len(), 3);
    }
}
