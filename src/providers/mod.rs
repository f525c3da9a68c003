pub mod nba_stats;
pub mod provider;
pub mod reddit;

pub use nba_stats::NbaStatsClient;
pub use provider::{SocialProvider, StatsProvider, StatsReport};
pub use reddit::RedditClient;
