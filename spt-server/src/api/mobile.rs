//! Mobile-usage tracking
//!
//! Two write paths feed the same daily entries. The batch path appends a full
//! day reported by the client; the tick path folds single app sessions into
//! today's entry. Both recompute the student's overall productivity.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use spt_common::identity::Identity;
use spt_common::metrics::{self, UsageReport, UsageTick, TRAILING_DAYS};
use spt_common::models::{MobileUsageEntry, UsageCategory};
use spt_common::time;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{ApiJson, ApiResult};
use crate::AppState;

/// Per-bucket app minutes as sent by clients
#[derive(Debug, Default, Deserialize)]
pub struct AppsUsed {
    #[serde(default)]
    pub productive: BTreeMap<String, u32>,
    #[serde(default)]
    pub social: BTreeMap<String, u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRequest {
    pub email: String,
    #[serde(default)]
    pub screen_time: f64,
    #[serde(default)]
    pub productive_time: Option<f64>,
    #[serde(default)]
    pub apps_used: AppsUsed,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub success: bool,
    pub message: String,
    pub entry: MobileUsageEntry,
    pub overall_productivity: u8,
}

/// POST /api/mobile-usage
///
/// Unknown identities are rejected with 404.
pub async fn record_usage(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UsageRequest>,
) -> ApiResult<Json<UsageResponse>> {
    let identity = Identity::parse(&request.email)?;
    let report = UsageReport {
        screen_time: request.screen_time,
        productive_time: request.productive_time,
        productive_apps: request.apps_used.productive,
        social_apps: request.apps_used.social,
    };

    let (entry, overall_productivity) = state
        .store
        .transaction(move |store| {
            let student_id = store.require_student(&identity)?.student_id.clone();
            let entry = metrics::build_reported_usage(&student_id, time::today(), report)?;
            store.mobile_usage.push(entry.clone());
            let overall = store.refresh_overall_productivity(&student_id);
            Ok((entry, overall))
        })
        .await?;

    debug!(
        student_id = %entry.student_id,
        score = entry.productivity_score,
        "Mobile usage recorded"
    );
    Ok(Json(UsageResponse {
        success: true,
        message: "Mobile usage updated".to_string(),
        entry,
        overall_productivity,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTickRequest {
    pub email: String,
    pub app_name: String,
    pub minutes: f64,
    pub category: UsageCategory,
}

#[derive(Debug, Serialize)]
pub struct UsageTickResponse {
    pub success: bool,
    pub message: String,
    pub today: MobileUsageEntry,
}

/// POST /api/mobile-usage/event
///
/// Adds one app session to today's entry, creating the entry if needed.
pub async fn record_usage_tick(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UsageTickRequest>,
) -> ApiResult<Json<UsageTickResponse>> {
    let identity = Identity::parse(&request.email)?;
    let tick = UsageTick {
        app_name: request.app_name,
        minutes: request.minutes,
        category: request.category,
    };

    let today = state
        .store
        .transaction(move |store| {
            let student_id = store.require_student(&identity)?.student_id.clone();
            let entry = store.usage_entry_mut(&student_id, time::today());
            metrics::apply_usage_tick(entry, &tick)?;
            let today = entry.clone();
            store.refresh_overall_productivity(&student_id);
            Ok(today)
        })
        .await?;

    Ok(Json(UsageTickResponse {
        success: true,
        message: "Event recorded".to_string(),
        today,
    }))
}

#[derive(Debug, Serialize)]
pub struct RecentUsageResponse {
    pub success: bool,
    /// Newest first
    pub days: Vec<MobileUsageEntry>,
}

/// GET /api/mobile-usage/:email
pub async fn recent_usage(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<RecentUsageResponse>> {
    let identity = Identity::parse(&email)?;
    let store = state.store.read().await?;
    let student = store.require_student(&identity)?;

    Ok(Json(RecentUsageResponse {
        success: true,
        days: store.recent_mobile_usage(&student.student_id, TRAILING_DAYS),
    }))
}
