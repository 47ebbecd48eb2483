//! Coding-profile fetchers
//!
//! A fetcher looks up a user's public statistics on one platform. Failures are
//! never retried; the handler reports them to the caller as a bad request.

mod leetcode;

pub use leetcode::LeetCodeClient;

use futures::future::BoxFuture;
use spt_common::models::{
    CodeChefProfile, CodingProfile, HackerRankProfile, LeetCodeProfile, Platform, StarRating,
};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Statistics returned by a platform lookup
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub problems_solved: u32,
    /// Contest rating, when the platform reports one
    pub rating: Option<f64>,
    /// Star rank (CodeChef)
    pub stars: Option<f64>,
    pub global_rank: Option<u64>,
    pub contests_attended: Option<u32>,
}

impl ProfileStats {
    /// Full replacement record for `platform`; fields the lookup does not
    /// provide are left empty
    pub fn into_profile(self, platform: Platform) -> CodingProfile {
        match platform {
            Platform::LeetCode => CodingProfile::LeetCode(LeetCodeProfile {
                problems_solved: self.problems_solved,
                easy: None,
                medium: None,
                hard: None,
                current_streak: None,
                global_rank: self.global_rank.unwrap_or(0),
                contest_rating: self.rating,
            }),
            Platform::CodeChef => CodingProfile::CodeChef(CodeChefProfile {
                problems_solved: self.problems_solved,
                rating: StarRating::clamped(
                    self.stars.unwrap_or(0.0).round().clamp(0.0, u8::MAX as f64) as u8,
                ),
                contest_rating: self.rating,
                contests_joined: self.contests_attended,
                global_rank: self.global_rank.unwrap_or(0),
            }),
            Platform::HackerRank => CodingProfile::HackerRank(HackerRankProfile {
                problems_solved: self.problems_solved,
                badges: 0,
                skills: Vec::new(),
            }),
        }
    }
}

/// Fetch failure
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Platform API error: {0}")]
    Api(String),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Looks up public statistics for a username on one platform
pub trait ProfileFetcher: Send + Sync {
    fn platform(&self) -> Platform;

    fn fetch<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<ProfileStats, FetchError>>;
}

/// Run a fetch bounded by `limit`
pub async fn fetch_with_timeout(
    fetcher: &dyn ProfileFetcher,
    username: &str,
    limit: Duration,
) -> Result<ProfileStats, FetchError> {
    debug!(platform = %fetcher.platform(), username = %username, "Fetching coding profile");
    match tokio::time::timeout(limit, fetcher.fetch(username)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct Slow;

    impl ProfileFetcher for Slow {
        fn platform(&self) -> Platform {
            Platform::CodeChef
        }

        fn fetch<'a>(&'a self, _username: &'a str) -> BoxFuture<'a, Result<ProfileStats, FetchError>> {
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(ProfileStats::default())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let err = fetch_with_timeout(&Slow, "chef", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[test]
    fn codechef_stars_are_clamped() {
        let stats = ProfileStats {
            problems_solved: 40,
            stars: Some(9.4),
            global_rank: Some(1200),
            ..Default::default()
        };
        match stats.into_profile(Platform::CodeChef) {
            CodingProfile::CodeChef(profile) => {
                assert_eq!(profile.rating.stars(), 7);
                assert_eq!(profile.global_rank, 1200);
            }
            other => panic!("unexpected profile: {:?}", other),
        }

        let unrated = ProfileStats::default().into_profile(Platform::CodeChef);
        match unrated {
            CodingProfile::CodeChef(profile) => assert_eq!(profile.rating.stars(), 1),
            other => panic!("unexpected profile: {:?}", other),
        }
    }

    #[test]
    fn leetcode_profile_drops_difficulty_breakdown() {
        let stats = ProfileStats {
            problems_solved: 321,
            rating: Some(1650.5),
            global_rank: None,
            ..Default::default()
        };
        match stats.into_profile(Platform::LeetCode) {
            CodingProfile::LeetCode(profile) => {
                assert_eq!(profile.problems_solved, 321);
                assert_eq!(profile.global_rank, 0);
                assert!(profile.easy.is_none());
                assert_eq!(profile.contest_rating, Some(1650.5));
            }
            other => panic!("unexpected profile: {:?}", other),
        }
    }
}
