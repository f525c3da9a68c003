use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::config::StatField;

/// Per-game averages for one team over the recent-games window.
/// Any field may be absent when the provider could not supply it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStats {
    pub games_played: Option<u32>,
    /// Field-goal percentage as a fraction (0.465, not 46.5)
    pub fg_pct: Option<f64>,
    pub points_avg: Option<f64>,
    pub rebounds_avg: Option<f64>,
    pub assists_avg: Option<f64>,
    pub turnovers_avg: Option<f64>,
    /// Average point differential (plus/minus) per game
    pub point_diff: Option<f64>,
}

impl RawStats {
    pub fn get(&self, field: StatField) -> Option<f64> {
        match field {
            StatField::FgPct => self.fg_pct,
            StatField::PointsAvg => self.points_avg,
            StatField::ReboundsAvg => self.rebounds_avg,
            StatField::AssistsAvg => self.assists_avg,
            StatField::TurnoversAvg => self.turnovers_avg,
            StatField::PointDiff => self.point_diff,
        }
    }

    fn slot(&mut self, field: StatField) -> &mut Option<f64> {
        match field {
            StatField::FgPct => &mut self.fg_pct,
            StatField::PointsAvg => &mut self.points_avg,
            StatField::ReboundsAvg => &mut self.rebounds_avg,
            StatField::AssistsAvg => &mut self.assists_avg,
            StatField::TurnoversAvg => &mut self.turnovers_avg,
            StatField::PointDiff => &mut self.point_diff,
        }
    }

    pub fn is_empty(&self) -> bool {
        StatField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// Drop values the scorer must never see: non-finite numbers, negative
    /// per-game counts and percentages outside [0, 1].
    pub fn sanitized(mut self) -> Self {
        for field in StatField::ALL {
            let slot = self.slot(field);
            let Some(v) = *slot else { continue };
            let ok = v.is_finite()
                && match field {
                    StatField::FgPct => (0.0..=1.0).contains(&v),
                    StatField::PointDiff => true,
                    _ => v >= 0.0,
                };
            if !ok {
                warn!("Discarding out-of-domain {:?} value {}", field, v);
                *slot = None;
            }
        }
        self
    }
}

/// One piece of social-media text (post title, body or comment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub text: String,
    /// Community the text came from, e.g. the subreddit name
    pub source: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Share of snippets in each polarity bucket. All zero when there was no input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub frequency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub compound: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Mean compound score in [-1, 1]; 0 when there was no input
    pub compound: f64,
    pub distribution: SentimentDistribution,
    pub keywords: Vec<Keyword>,
    pub quotes: Vec<Quote>,
    /// Number of snippets scored
    pub sample_size: usize,
}

/// Scalar strength of one team with the parts it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    pub team: String,
    pub stats_component: f64,
    pub sentiment_component: f64,
    pub injury_penalty: f64,
    /// stats_component + sentiment_component - injury_penalty
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    #[serde(rename = "Low confidence")]
    Low,
    #[serde(rename = "Moderate confidence")]
    Moderate,
    #[serde(rename = "High confidence")]
    High,
}

impl ConfidenceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::Low => "Low confidence",
            ConfidenceLabel::Moderate => "Moderate confidence",
            ConfidenceLabel::High => "High confidence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub predicted_winner: String,
    /// Probability that team1 wins (same as `team1_win_probability`)
    pub win_probability: f64,
    pub team1_win_probability: f64,
    pub team2_win_probability: f64,
    pub score_breakdown: String,
    pub confidence_label: ConfidenceLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub name: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub stats_summary: String,
    pub sentiment_summary: String,
    pub score: TeamScore,
    pub sentiment: SentimentSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sources {
    pub reddit: Vec<String>,
    pub stats: Vec<String>,
}

/// Full response body of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub team1: TeamProfile,
    pub team2: TeamProfile,
    pub matchup: Matchup,
    pub sources: Sources,
}
