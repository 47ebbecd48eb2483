//! LeetCode client
//!
//! Queries the public LeetCode GraphQL endpoint for a user's solved-problem
//! count, global ranking and contest rating.
//!
//! # API Reference
//! - Endpoint: https://leetcode.com/graphql
//! - Query: `matchedUser` (submission stats, profile ranking) and
//!   `userContestRanking` (rating, attended contests)

use futures::future::{BoxFuture, FutureExt};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use spt_common::models::Platform;
use std::time::Duration;
use tracing::debug;

use super::{FetchError, ProfileFetcher, ProfileStats};

/// LeetCode GraphQL endpoint
const LEETCODE_GRAPHQL_URL: &str = "https://leetcode.com/graphql";

const USER_AGENT: &str = concat!("spt-server/", env!("CARGO_PKG_VERSION"));

const PROFILE_QUERY: &str = r#"
query getUserProfile($username: String!) {
  matchedUser(username: $username) {
    submitStats {
      acSubmissionNum {
        difficulty
        count
      }
    }
    profile {
      ranking
    }
  }
  userContestRanking(username: $username) {
    attendedContestsCount
    rating
  }
}
"#;

pub struct LeetCodeClient {
    /// HTTP client for API requests
    http_client: Client,
    endpoint: String,
}

impl LeetCodeClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let http_client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: LEETCODE_GRAPHQL_URL.to_string(),
        })
    }

    /// Point the client at another GraphQL endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn query_profile(&self, username: &str) -> Result<ProfileStats, FetchError> {
        debug!(username = %username, "Querying LeetCode profile");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&json!({
                "query": PROFILE_QUERY,
                "variables": { "username": username },
            }))
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("LeetCode request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(format!(
                "LeetCode returned error {}: {}",
                status, body
            )));
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(format!("Failed to parse LeetCode response: {}", e)))?;

        let stats = profile_stats(username, body)?;
        debug!(
            username = %username,
            problems_solved = stats.problems_solved,
            ranking = ?stats.global_rank,
            "LeetCode query complete"
        );
        Ok(stats)
    }
}

impl ProfileFetcher for LeetCodeClient {
    fn platform(&self) -> Platform {
        Platform::LeetCode
    }

    fn fetch<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<ProfileStats, FetchError>> {
        self.query_profile(username).boxed()
    }
}

// ============================================================================
// GraphQL response shape
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ProfileData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileData {
    matched_user: Option<MatchedUser>,
    user_contest_ranking: Option<ContestRanking>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUser {
    submit_stats: SubmitStats,
    profile: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    ac_submission_num: Vec<SubmissionCount>,
}

#[derive(Debug, Deserialize)]
struct SubmissionCount {
    difficulty: String,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    ranking: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContestRanking {
    attended_contests_count: Option<u32>,
    rating: Option<f64>,
}

fn profile_stats(username: &str, body: GraphQlResponse) -> Result<ProfileStats, FetchError> {
    let data = body
        .data
        .ok_or_else(|| FetchError::Parse("response has no data".to_string()))?;
    let user = data
        .matched_user
        .ok_or_else(|| FetchError::NotFound(format!("LeetCode user {}", username)))?;

    let solved = user
        .submit_stats
        .ac_submission_num
        .iter()
        .find(|item| item.difficulty == "All")
        .map(|item| item.count)
        .ok_or_else(|| FetchError::Parse("missing solved count".to_string()))?;

    Ok(ProfileStats {
        problems_solved: solved,
        rating: data.user_contest_ranking.as_ref().and_then(|r| r.rating),
        stars: None,
        global_rank: user.profile.and_then(|p| p.ranking),
        contests_attended: data
            .user_contest_ranking
            .as_ref()
            .and_then(|r| r.attended_contests_count),
    })
}
