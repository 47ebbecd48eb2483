//! spt-server library - Student Productivity Tracker service
//!
//! HTTP surface over the student record store: dashboards, usage tracking,
//! coding-profile refresh, the chat assistant, admin views and the live
//! update stream.

use axum::Router;
use spt_common::events::LiveHub;
use spt_common::models::Platform;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod assistant;
pub mod error;
pub mod fetchers;
pub mod generator;
pub mod store;

use assistant::Assistant;
use fetchers::ProfileFetcher;
use generator::ProfileGenerator;
use store::StoreHandle;

pub use error::{ApiError, ApiResult};

/// Default upper bound on a coding-profile lookup
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    /// Record set source for identities seen for the first time
    pub generator: Arc<dyn ProfileGenerator>,
    pub live: LiveHub,
    pub fetchers: Arc<HashMap<Platform, Arc<dyn ProfileFetcher>>>,
    /// `None` refuses every admin request
    pub admin_token: Option<String>,
    pub fetch_timeout: Duration,
    pub assistant: Assistant,
}

impl AppState {
    /// Create new application state with no fetchers and no admin token
    pub fn new(store: StoreHandle, generator: Arc<dyn ProfileGenerator>, live: LiveHub) -> Self {
        Self {
            store,
            generator,
            live,
            fetchers: Arc::new(HashMap::new()),
            admin_token: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            assistant: Assistant::default(),
        }
    }

    /// Register the fetcher serving its platform, replacing any previous one
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ProfileFetcher>) -> Self {
        Arc::make_mut(&mut self.fetchers).insert(fetcher.platform(), fetcher);
        self
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_assistant(mut self, assistant: Assistant) -> Self {
        self.assistant = assistant;
        self
    }

    pub fn fetcher(&self, platform: Platform) -> Option<Arc<dyn ProfileFetcher>> {
        self.fetchers.get(&platform).cloned()
    }
}

/// Build application router
///
/// Admin routes sit behind the bearer-token check; everything else is public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let admin = Router::new()
        .route("/api/admin/users", get(api::list_users))
        .route("/api/admin/rankings", get(api::rankings))
        .route("/api/admin/statistics", get(api::statistics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_admin,
        ));

    let public = Router::new()
        .route("/", get(api::banner))
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/auth/login", post(api::login))
        .route("/api/auth/register", post(api::register))
        .route("/api/dashboard/:email", get(api::dashboard))
        .route("/api/students/:email/prediction", get(api::prediction))
        .route("/api/mobile-usage", post(api::record_usage))
        .route("/api/mobile-usage/event", post(api::record_usage_tick))
        .route("/api/mobile-usage/:email", get(api::recent_usage))
        .route("/api/track-activity", post(api::track_activity))
        .route("/api/live/track", post(api::track_live_event))
        .route("/api/live/:email", get(api::live_stream))
        .route("/api/realtime/:platform", post(api::refresh_coding_profile))
        .route(
            "/api/deepseek/message",
            get(api::chat_fixed).post(api::chat_message),
        )
        .merge(api::health_routes());

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
