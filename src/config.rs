use clap::Parser;
use std::time::Duration;

/// Team matchup comparison service: stats + fan sentiment → win probability
#[derive(Parser, Debug, Clone)]
#[command(name = "ballpulse", version, about)]
pub struct Config {
    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// SQLite database path (response cache + comparison history)
    #[arg(long, env = "DATABASE_PATH", default_value = "ballpulse.db")]
    pub database_path: String,

    /// How long a computed comparison is served from cache, in seconds
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "3600")]
    pub cache_ttl_secs: u64,

    /// NBA stats API base URL
    #[arg(long, env = "STATS_API_URL", default_value = "https://stats.nba.com/stats")]
    pub stats_api_url: String,

    /// Reddit base URL
    #[arg(long, env = "REDDIT_BASE_URL", default_value = "https://www.reddit.com")]
    pub reddit_base_url: String,

    /// User-Agent sent to Reddit (required by their API rules)
    #[arg(long, env = "REDDIT_USER_AGENT", default_value = "ballpulse/0.1 (team matchup sentiment)")]
    pub reddit_user_agent: String,

    /// Subreddit posts fetched per team
    #[arg(long, env = "POSTS_PER_TEAM", default_value = "25")]
    pub posts_per_team: usize,

    /// Number of most recent games averaged into team stats
    #[arg(long, env = "RECENT_GAMES", default_value = "10")]
    pub recent_games: usize,

    /// Time budget for each provider call, retries included, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "10")]
    pub fetch_timeout_secs: u64,

    /// Per-client rate limiting on the HTTP API
    #[arg(long, env = "RATE_LIMIT", default_value_t = true, action = clap::ArgAction::Set)]
    pub rate_limit: bool,

    /// Override the sigmoid scale k in P(team1) = sigmoid(k * (score1 - score2))
    #[arg(long, env = "SIGMOID_SCALE")]
    pub sigmoid_scale: Option<f64>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache_ttl_secs == 0 {
            anyhow::bail!("cache_ttl_secs must be positive");
        }
        if !(1..=100).contains(&self.posts_per_team) {
            anyhow::bail!("posts_per_team must be between 1 and 100");
        }
        if !(1..=82).contains(&self.recent_games) {
            anyhow::bail!("recent_games must be between 1 and 82");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be positive");
        }
        if let Some(k) = self.sigmoid_scale {
            if !k.is_finite() || k <= 0.0 {
                anyhow::bail!("sigmoid_scale must be a positive number");
            }
        }
        for (name, url) in [
            ("stats_api_url", &self.stats_api_url),
            ("reddit_base_url", &self.reddit_base_url),
        ] {
            url::Url::parse(url)
                .map_err(|e| anyhow::anyhow!("{} is not a valid URL ({}): {}", name, e, url))?;
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
