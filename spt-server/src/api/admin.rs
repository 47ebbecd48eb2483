//! Admin views
//!
//! Every route here sits behind [`require_admin`]: the request must carry
//! `Authorization: Bearer <admin_token>`. Without a configured token the whole
//! surface answers 403.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use spt_common::metrics::{self, PlatformSummary, Ranking};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Authorization middleware for admin routes
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::Forbidden(
            "Admin access is disabled (no admin token configured)".to_string(),
        ));
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match provided {
        Some(token) if token == expected => {}
        Some(_) => {
            warn!(path = %request.uri().path(), "Rejected admin request: wrong token");
            return Err(ApiError::Unauthorized("Invalid admin token".to_string()));
        }
        None => return Err(ApiError::Unauthorized("Admin token required".to_string())),
    }

    Ok(next.run(request).await)
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub course: String,
    pub cgpa: f64,
    pub overall_productivity: u8,
    pub join_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub total_users: usize,
    pub users: Vec<UserSummary>,
}

/// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<UsersResponse>> {
    let store = state.store.read().await?;
    let users: Vec<UserSummary> = store
        .students
        .into_iter()
        .map(|s| UserSummary {
            id: s.student_id,
            name: s.personal_info.name,
            email: s.personal_info.email,
            course: s.personal_info.course,
            cgpa: s.academic_info.cgpa,
            overall_productivity: s.overall_productivity,
            join_date: s.personal_info.join_date,
        })
        .collect();

    Ok(Json(UsersResponse {
        success: true,
        total_users: users.len(),
        users,
    }))
}

#[derive(Debug, Serialize)]
pub struct RankingsResponse {
    pub success: bool,
    pub total_users: usize,
    pub rankings: Vec<Ranking>,
}

/// GET /api/admin/rankings
///
/// Computed from the current document on every call; ranks are never stored.
pub async fn rankings(State(state): State<AppState>) -> ApiResult<Json<RankingsResponse>> {
    let store = state.store.read().await?;
    let rankings = metrics::rank_students(&store.students);

    Ok(Json(RankingsResponse {
        success: true,
        total_users: rankings.len(),
        rankings,
    }))
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub success: bool,
    pub total_students: usize,
    pub total_courses: usize,
    pub total_activities: usize,
    pub total_events: usize,
    pub average_productivity: f64,
    pub coding_stats: Vec<PlatformSummary>,
}

/// GET /api/admin/statistics
pub async fn statistics(State(state): State<AppState>) -> ApiResult<Json<StatisticsResponse>> {
    let store = state.store.read().await?;

    Ok(Json(StatisticsResponse {
        success: true,
        total_students: store.students.len(),
        total_courses: store.courses.len(),
        total_activities: store.activities.len(),
        total_events: store.events.len(),
        average_productivity: metrics::average_overall_productivity(&store.students),
        coding_stats: metrics::platform_summaries(&store.coding_progress),
    }))
}
