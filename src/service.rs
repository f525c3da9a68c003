//! Request orchestration around the pure scoring pipeline: cache lookup,
//! concurrent data gathering for both teams, scoring, then cache and history
//! writes. Provider failures degrade to empty inputs; they never fail a
//! comparison.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::Database;
use crate::providers::{SocialProvider, StatsProvider, StatsReport};
use crate::scoring::{Comparison, Pipeline, RawStats, ScoringConfig, SocialPost, TeamInput};

/// Stats source label used when the provider could not deliver.
pub const STATS_UNAVAILABLE: &str = "unavailable";

/// A validated comparison request. Team names are already normalized and the
/// sport is canonical.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonQuery {
    pub team1: String,
    pub team2: String,
    pub sport: String,
    pub game_date: Option<NaiveDate>,
    pub team1_injuries: Vec<String>,
    pub team2_injuries: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub comparison: Comparison,
    /// Served from the response cache without touching the providers
    pub cached: bool,
    /// History id, when the comparison was freshly computed and stored
    pub history_id: Option<String>,
}

/// One validated pipeline per supported sport.
pub fn build_pipelines(sigmoid_scale: Option<f64>) -> Result<HashMap<&'static str, Pipeline>> {
    let mut pipelines = HashMap::new();
    for sport in ScoringConfig::supported_sports() {
        let mut config = ScoringConfig::for_sport(sport)
            .with_context(|| format!("No scoring profile for {}", sport))?;
        if let Some(k) = sigmoid_scale {
            config = config.with_sigmoid_scale(k);
        }
        config
            .validate()
            .with_context(|| format!("Invalid scoring configuration for {}", sport))?;
        pipelines.insert(sport, Pipeline::new(Arc::new(config)));
    }
    Ok(pipelines)
}

pub struct ComparisonService {
    pipelines: HashMap<&'static str, Pipeline>,
    stats: Arc<dyn StatsProvider>,
    social: Arc<dyn SocialProvider>,
    db: Database,
    cache_ttl: Duration,
    fetch_timeout: Duration,
    posts_per_team: usize,
}

impl ComparisonService {
    pub fn new(
        pipelines: HashMap<&'static str, Pipeline>,
        stats: Arc<dyn StatsProvider>,
        social: Arc<dyn SocialProvider>,
        db: Database,
        cache_ttl: Duration,
        fetch_timeout: Duration,
        posts_per_team: usize,
    ) -> Self {
        ComparisonService {
            pipelines,
            stats,
            social,
            db,
            cache_ttl,
            fetch_timeout,
            posts_per_team,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub async fn compare(&self, query: &ComparisonQuery) -> Result<ComparisonOutcome> {
        let pipeline = self
            .pipelines
            .get(query.sport.as_str())
            .with_context(|| format!("Unsupported sport: {}", query.sport))?;

        let key = cache_key(query);
        if let Some(comparison) = self.cached(&key) {
            info!("⚡ Cache hit: {} vs {}", query.team1, query.team2);
            return Ok(ComparisonOutcome {
                comparison,
                cached: true,
                history_id: None,
            });
        }
        info!("Cache miss: {} vs {}, fetching data", query.team1, query.team2);

        let (team1, team2) = tokio::join!(
            self.gather(&query.team1, &query.team1_injuries, query.game_date),
            self.gather(&query.team2, &query.team2_injuries, query.game_date),
        );
        let comparison = pipeline.compare(&team1, &team2);

        match serde_json::to_string(&comparison) {
            Ok(payload) => {
                if let Err(e) = self.db.cache_put(&key, &payload, self.cache_ttl) {
                    warn!("Failed to cache comparison: {:#}", e);
                }
            }
            Err(e) => warn!("Failed to serialize comparison for cache: {}", e),
        }
        let history_id = match self.db.insert_history(&query.sport, &comparison) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to record comparison history: {:#}", e);
                None
            }
        };

        info!(
            "🏀 {} vs {} → {} ({:.1}%, {})",
            query.team1,
            query.team2,
            comparison.matchup.predicted_winner,
            comparison
                .matchup
                .team1_win_probability
                .max(comparison.matchup.team2_win_probability)
                * 100.0,
            comparison.matchup.confidence_label.as_str()
        );
        Ok(ComparisonOutcome {
            comparison,
            cached: false,
            history_id,
        })
    }

    /// A readable, unexpired cache entry. Read failures count as misses.
    fn cached(&self, key: &str) -> Option<Comparison> {
        let payload = match self.db.cache_get(key) {
            Ok(p) => p?,
            Err(e) => {
                warn!("Cache lookup failed: {:#}", e);
                return None;
            }
        };
        match serde_json::from_str(&payload) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Discarding unreadable cache entry: {}", e);
                None
            }
        }
    }

    /// Current averages for one team under the fetch timeout, sanitized.
    /// `None` when the provider fails or times out.
    pub async fn team_stats(&self, team: &str) -> Option<StatsReport> {
        let report = with_timeout(
            self.fetch_timeout,
            self.stats.name(),
            self.stats.fetch_recent_stats(team, None),
        )
        .await?;
        Some(StatsReport {
            stats: report.stats.sanitized(),
            source: report.source,
        })
    }

    /// Fetch stats and posts for one team concurrently, each under the fetch
    /// timeout, and sanitize what comes back.
    async fn gather(&self, team: &str, injuries: &[String], as_of: Option<NaiveDate>) -> TeamInput {
        let (stats, posts) = tokio::join!(
            with_timeout(
                self.fetch_timeout,
                self.stats.name(),
                self.stats.fetch_recent_stats(team, as_of)
            ),
            with_timeout(
                self.fetch_timeout,
                self.social.name(),
                self.social.fetch_posts(team, self.posts_per_team)
            ),
        );

        let report = stats.unwrap_or_else(|| StatsReport {
            stats: RawStats::default(),
            source: STATS_UNAVAILABLE.to_string(),
        });
        let posts: Vec<SocialPost> = posts.unwrap_or_default();

        TeamInput {
            name: team.to_string(),
            stats: report.stats.sanitized(),
            posts,
            injuries: injuries.to_vec(),
            stats_source: report.source,
        }
    }
}

/// Run a provider call under `limit`; errors and timeouts are logged and
/// become `None`.
async fn with_timeout<T>(
    limit: Duration,
    provider: &str,
    fut: impl Future<Output = Result<T>>,
) -> Option<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(v)) => Some(v),
        Ok(Err(e)) => {
            warn!("{} unavailable, degrading: {:#}", provider, e);
            None
        }
        Err(_) => {
            warn!("{} timed out after {:?}, degrading", provider, limit);
            None
        }
    }
}

/// Cache key over everything that can change the result. Team order is kept
/// because swapping teams swaps the output sides.
pub fn cache_key(query: &ComparisonQuery) -> String {
    fn lower(notes: &[String]) -> Vec<String> {
        notes.iter().map(|n| n.trim().to_lowercase()).collect()
    }
    let key = json!({
        "team1": query.team1.to_lowercase(),
        "team2": query.team2.to_lowercase(),
        "sport": query.sport.to_lowercase(),
        "game_date": query.game_date.map(|d| d.to_string()),
        "team1_injuries": lower(&query.team1_injuries),
        "team2_injuries": lower(&query.team2_injuries),
    });
    format!("compare:{}", key)
}
