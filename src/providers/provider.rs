use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::scoring::{RawStats, SocialPost};

/// Recent-games averages plus a label saying where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub stats: RawStats,
    /// e.g. "nba_stats:2024-25"
    pub source: String,
}

/// Trait that every team-statistics provider must implement.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Averages over the team's most recent games on or before `as_of`
    /// (today when `None`).
    async fn fetch_recent_stats(&self, team: &str, as_of: Option<NaiveDate>) -> Result<StatsReport>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Trait that every social-media provider must implement.
#[async_trait]
pub trait SocialProvider: Send + Sync {
    /// Recent posts and comments about `team`, newest first. A team the
    /// provider has no community for yields an empty list, not an error.
    async fn fetch_posts(&self, team: &str, limit: usize) -> Result<Vec<SocialPost>>;

    fn name(&self) -> &str;
}
