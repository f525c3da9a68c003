//! Pipeline entry point: two already-fetched team inputs in, one
//! [`Comparison`] out. No I/O happens here.

use std::sync::Arc;

use tracing::debug;

use super::config::ScoringConfig;
use super::matchup::MatchupPredictor;
use super::models::{Comparison, RawStats, SentimentSummary, SocialPost, Sources, TeamProfile};
use super::proscons::ProsConsGenerator;
use super::sentiment::{self, SentimentAnalyzer};
use super::team::{self, TeamScorer};

/// Everything gathered for one side of a comparison.
#[derive(Debug, Clone, Default)]
pub struct TeamInput {
    pub name: String,
    /// Must already be sanitized (see [`RawStats::sanitized`]).
    pub stats: RawStats,
    pub posts: Vec<SocialPost>,
    pub injuries: Vec<String>,
    /// Label of where the stats came from, e.g. "nba_stats:2024-25".
    pub stats_source: String,
}

pub struct Pipeline {
    analyzer: SentimentAnalyzer,
    scorer: TeamScorer,
    pros_cons: ProsConsGenerator,
    predictor: MatchupPredictor,
}

impl Pipeline {
    pub fn new(config: Arc<ScoringConfig>) -> Self {
        Self {
            analyzer: SentimentAnalyzer::new(Arc::clone(&config)),
            scorer: TeamScorer::new(Arc::clone(&config)),
            pros_cons: ProsConsGenerator::new(Arc::clone(&config)),
            predictor: MatchupPredictor::new(config),
        }
    }

    pub fn compare(&self, team1: &TeamInput, team2: &TeamInput) -> Comparison {
        let sentiment1 = self.analyzer.analyze(&team1.posts);
        let sentiment2 = self.analyzer.analyze(&team2.posts);
        self.compare_with_sentiment(team1, sentiment1, team2, sentiment2)
    }

    /// Same as [`Pipeline::compare`] with the sentiment step already done.
    pub fn compare_with_sentiment(
        &self,
        team1: &TeamInput,
        sentiment1: SentimentSummary,
        team2: &TeamInput,
        sentiment2: SentimentSummary,
    ) -> Comparison {
        let profile1 = self.profile_team(team1, sentiment1);
        let profile2 = self.profile_team(team2, sentiment2);
        let matchup = self.predictor.predict(&profile1.score, &profile2.score);

        debug!(
            "{} {:.3} vs {} {:.3} → {} (p1={:.3})",
            profile1.name,
            profile1.score.total,
            profile2.name,
            profile2.score.total,
            matchup.predicted_winner,
            matchup.win_probability
        );

        Comparison {
            sources: self.collect_sources(team1, team2),
            team1: profile1,
            team2: profile2,
            matchup,
        }
    }

    fn profile_team(&self, input: &TeamInput, sentiment: SentimentSummary) -> TeamProfile {
        let normalized = self.scorer.normalize(&input.stats);
        let score = self
            .scorer
            .score(&input.name, &normalized, &sentiment, &input.injuries);
        let pc = self.pros_cons.generate(&normalized, &sentiment);

        TeamProfile {
            name: input.name.clone(),
            pros: pc.pros,
            cons: pc.cons,
            stats_summary: team::describe_stats(&input.stats),
            sentiment_summary: sentiment::describe(&sentiment),
            score,
            sentiment,
        }
    }

    /// Only posts that were actually scored are cited.
    fn collect_sources(&self, team1: &TeamInput, team2: &TeamInput) -> Sources {
        let mut sources = Sources::default();
        for input in [team1, team2] {
            for post in self.analyzer.sample(&input.posts) {
                if !post.url.is_empty() && !sources.reddit.contains(&post.url) {
                    sources.reddit.push(post.url.clone());
                }
            }
            if !input.stats_source.is_empty() && !sources.stats.contains(&input.stats_source) {
                sources.stats.push(input.stats_source.clone());
            }
        }
        sources
    }
}
