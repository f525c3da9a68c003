pub mod config;
pub mod matchup;
pub mod models;
pub mod pipeline;
pub mod proscons;
pub mod sentiment;
pub mod team;

pub use config::ScoringConfig;
pub use models::{Comparison, RawStats, SocialPost};
pub use pipeline::{Pipeline, TeamInput};
