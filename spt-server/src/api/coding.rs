//! Live coding-profile refresh

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use spt_common::identity::Identity;
use spt_common::models::{CodingProfile, Platform};
use tracing::info;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::fetchers::{self, ProfileStats};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub email: String,
    /// Account name on the platform
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
    pub platform: Platform,
    pub stats: ProfileStats,
    pub profile: CodingProfile,
}

/// POST /api/realtime/:platform
///
/// Looks the username up on the platform and replaces the student's stored
/// profile for it. Lookup failures answer 400 with the fetcher's message.
pub async fn refresh_coding_profile(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let platform: Platform = platform.parse()?;
    let identity = Identity::parse(&request.email)?;
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::Validation("username is required".to_string()));
    }

    // 404 before spending a network round trip
    state.store.read().await?.require_student(&identity)?;

    let fetcher = state.fetcher(platform).ok_or_else(|| {
        ApiError::Validation(format!("Live lookup is not available for {}", platform))
    })?;
    let stats =
        fetchers::fetch_with_timeout(fetcher.as_ref(), &username, state.fetch_timeout).await?;

    let profile = stats.clone().into_profile(platform);
    let stored = profile.clone();
    state
        .store
        .transaction(move |store| {
            let student_id = store.require_student(&identity)?.student_id.clone();
            store.upsert_coding_profile(&student_id, stored);
            Ok(())
        })
        .await?;

    info!(platform = %platform, username = %username, "Coding profile refreshed");
    Ok(Json(RefreshResponse {
        success: true,
        message: format!("{} profile updated", platform),
        platform,
        stats,
        profile,
    }))
}
