//! Student dashboard and forecasts

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use spt_common::identity::Identity;
use spt_common::metrics::{self, CourseForecast, ProductivityForecast};
use spt_common::models::StudentRecords;
use spt_common::time;

use super::load_or_create;
use crate::error::ApiResult;
use crate::generator::ProfileOverrides;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub message: String,
    pub data: StudentRecords,
}

/// GET /api/dashboard/:email
///
/// Unknown identities get a generated record set.
pub async fn dashboard(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<DashboardResponse>> {
    let identity = Identity::parse(&email)?;
    let data = load_or_create(&state, &identity, ProfileOverrides::default()).await?;

    Ok(Json(DashboardResponse {
        success: true,
        message: "Dashboard data".to_string(),
        data,
    }))
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub message: String,
    pub student_id: String,
    pub overall_productivity: u8,
    pub productivity: ProductivityForecast,
    pub courses: Vec<CourseForecast>,
}

/// GET /api/students/:email/prediction
pub async fn prediction(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<PredictionResponse>> {
    let identity = Identity::parse(&email)?;
    let store = state.store.read().await?;
    let student = store.require_student(&identity)?;

    let scores: Vec<u8> = store
        .productivity_series(&student.student_id)
        .iter()
        .map(|entry| entry.productivity_score)
        .collect();
    let courses: Vec<_> = store
        .courses
        .iter()
        .filter(|c| c.student_id == student.student_id)
        .cloned()
        .collect();

    Ok(Json(PredictionResponse {
        success: true,
        message: "Performance prediction".to_string(),
        student_id: student.student_id.clone(),
        overall_productivity: student.overall_productivity,
        productivity: metrics::predict_productivity(&scores),
        courses: metrics::predict_course_completion(&courses, time::now()),
    }))
}
