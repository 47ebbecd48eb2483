//! Activity log

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use spt_common::identity::Identity;
use spt_common::models::Activity;
use spt_common::time;
use uuid::Uuid;

use crate::error::{ApiJson, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub email: String,
    pub activity: String,
    /// Minutes
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub success: bool,
    pub message: String,
    pub activity: Activity,
}

/// POST /api/track-activity
///
/// Appends to the shared activity log; the identity need not be a known student.
pub async fn track_activity(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ActivityRequest>,
) -> ApiResult<Json<ActivityResponse>> {
    let identity = Identity::parse(&request.email)?;
    let activity = Activity {
        id: Uuid::new_v4(),
        email: identity.as_str().to_string(),
        activity: request.activity,
        duration: request.duration,
        category: request.category,
        timestamp: time::now(),
    };

    let record = activity.clone();
    state
        .store
        .transaction(move |store| {
            store.activities.push(record);
            Ok(())
        })
        .await?;

    Ok(Json(ActivityResponse {
        success: true,
        message: "Activity tracked".to_string(),
        activity,
    }))
}
