//! Login and registration
//!
//! Identity only: passwords are accepted and ignored. Both endpoints create
//! the student on first contact.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use spt_common::events::{LiveChannel, LiveEvent};
use spt_common::identity::Identity;
use spt_common::models::{
    AcademicInfo, CodingProgress, CourseEnrollment, EventRecord, MobileUsageEntry, PersonalInfo,
    ProductivityEntry,
};
use spt_common::time;
use tracing::{debug, info, warn};

use super::load_or_create;
use crate::error::{ApiJson, ApiResult};
use crate::generator::ProfileOverrides;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Snapshot returned on login
#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub personal: PersonalInfo,
    pub academic: AcademicInfo,
    /// Most recent day
    pub productivity: Option<ProductivityEntry>,
    pub coding: Vec<CodingProgress>,
    pub courses: Vec<CourseEnrollment>,
    /// Most recent day
    pub mobile: Option<MobileUsageEntry>,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: LoginUser,
}

/// POST /api/auth/login
///
/// Publishes the full record set to the identity's live room.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let identity = Identity::parse(&request.email)?;
    debug!(identity = %identity, "Login attempt");

    let records = load_or_create(&state, &identity, ProfileOverrides::default()).await?;

    let initial = LiveEvent::Initial {
        records: Box::new(records.clone()),
        timestamp: time::now(),
    };
    if let Err(e) = state.live.publish(&identity, initial) {
        warn!(identity = %identity, "Live publish failed: {}", e);
    }

    info!(identity = %identity, "Login successful");
    let user = LoginUser {
        productivity: records.latest_productivity().cloned(),
        mobile: records.latest_mobile_usage().cloned(),
        personal: records.student.personal_info,
        academic: records.student.academic_info,
        coding: records.coding,
        courses: records.courses,
        events: records.events,
    };

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        user,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Course domain
    #[serde(default)]
    pub course: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub name: String,
    pub email: String,
    pub role: String,
    pub course: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: RegisteredUser,
}

/// POST /api/auth/register
///
/// Name and course only apply when the identity is new; an existing student
/// is returned unchanged.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    let identity = Identity::parse(&request.email)?;
    let overrides = ProfileOverrides {
        name: request.name,
        course: request.course,
    };

    let records = load_or_create(&state, &identity, overrides).await?;
    let personal = records.student.personal_info;

    Ok(Json(RegisterResponse {
        success: true,
        message: "Registration successful".to_string(),
        user: RegisteredUser {
            name: personal.name,
            email: personal.email,
            role: "student".to_string(),
            course: personal.course,
        },
    }))
}
