//! HTTP API handlers
//!
//! Handlers share one shape: resolve the identity, load the store, create the
//! student on first contact where the endpoint allows it, mutate, recompute
//! derived metrics, save, publish when live-relevant, answer with the
//! `{ success, message, ... }` envelope.

pub mod activity;
pub mod admin;
pub mod auth;
pub mod buildinfo;
pub mod chat;
pub mod coding;
pub mod dashboard;
pub mod health;
pub mod live;
pub mod mobile;

pub use activity::track_activity;
pub use admin::{list_users, rankings, require_admin, statistics};
pub use auth::{login, register};
pub use buildinfo::get_build_info;
pub use chat::{chat_fixed, chat_message};
pub use coding::refresh_coding_profile;
pub use dashboard::{dashboard, prediction};
pub use health::{banner, health_routes};
pub use live::{live_stream, track_live_event};
pub use mobile::{recent_usage, record_usage, record_usage_tick};

use spt_common::identity::Identity;
use spt_common::models::StudentRecords;
use spt_common::Error;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiResult;
use crate::generator::ProfileOverrides;
use crate::AppState;

/// Records for `identity`, generating a full record set on first contact
///
/// The existence check is repeated under the writer lock, so two first
/// requests racing for one identity create a single student.
pub(crate) async fn load_or_create(
    state: &AppState,
    identity: &Identity,
    overrides: ProfileOverrides,
) -> ApiResult<StudentRecords> {
    let snapshot = state.store.read().await?;
    if let Some(records) = snapshot.records_for(identity) {
        return Ok(records);
    }

    let generator = Arc::clone(&state.generator);
    let identity = identity.clone();
    let records = state
        .store
        .transaction(move |store| {
            if store.find_student(&identity).is_none() {
                let profile = generator.generate(&identity, &overrides);
                info!(
                    identity = %identity,
                    student_id = %profile.student.student_id,
                    "Generated records for new identity"
                );
                store.insert_profile(profile)?;
            }
            store.ensure_event_catalog(|| generator.event_catalog());
            store
                .records_for(&identity)
                .ok_or_else(|| Error::Internal(format!("student vanished: {}", identity)))
        })
        .await?;

    Ok(records)
}
