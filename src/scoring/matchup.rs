//! Head-to-head prediction from two team scores.
//!
//! `P(team1 wins) = sigmoid(k * (score1 - score2))` and
//! `P(team2 wins) = 1 - P(team1 wins)`, so the two always sum to one and stay
//! strictly inside (0, 1) for finite scores.
//!
//! Level scores give exactly 0.5; the tie goes to team1. The winner is picked
//! from the scores themselves, not from the rounded probability.

use std::sync::Arc;

use super::config::ScoringConfig;
use super::models::{ConfidenceLabel, Matchup, TeamScore};

/// Logistic function, evaluated so neither branch overflows.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

pub struct MatchupPredictor {
    config: Arc<ScoringConfig>,
}

impl MatchupPredictor {
    pub fn new(config: Arc<ScoringConfig>) -> Self {
        Self { config }
    }

    /// Probability that team1 beats team2.
    pub fn win_probability(&self, score1: f64, score2: f64) -> f64 {
        sigmoid(self.config.matchup.sigmoid_scale * (score1 - score2))
    }

    pub fn confidence_label(&self, win_probability: f64) -> ConfidenceLabel {
        let distance = (win_probability - 0.5).abs();
        let m = &self.config.matchup;
        if distance > m.high_cutoff {
            ConfidenceLabel::High
        } else if distance > m.moderate_cutoff {
            ConfidenceLabel::Moderate
        } else {
            ConfidenceLabel::Low
        }
    }

    /// Illustrative final score, winner first. Presentation only: nothing
    /// here feeds back into the probability.
    pub fn score_breakdown(&self, team1: &TeamScore, team2: &TeamScore, team1_wins: bool) -> String {
        let m = &self.config.matchup;
        let swing = (team1.total - team2.total) * m.points_per_score;
        let points1 = (m.base_points + swing).round().max(0.0) as i64;
        let points2 = (m.base_points - swing).round().max(0.0) as i64;

        let (winner, mut winner_pts, loser, loser_pts) = if team1_wins {
            (&team1.team, points1, &team2.team, points2)
        } else {
            (&team2.team, points2, &team1.team, points1)
        };
        if winner_pts <= loser_pts {
            winner_pts = loser_pts + 1;
        }
        format!(
            "Predicted final score: {} {}-{} {}",
            winner, winner_pts, loser_pts, loser
        )
    }

    pub fn predict(&self, team1: &TeamScore, team2: &TeamScore) -> Matchup {
        let p1 = self.win_probability(team1.total, team2.total);
        let team1_wins = team1.total >= team2.total;
        let predicted_winner = if team1_wins { &team1.team } else { &team2.team };

        Matchup {
            predicted_winner: predicted_winner.clone(),
            win_probability: p1,
            team1_win_probability: p1,
            team2_win_probability: 1.0 - p1,
            score_breakdown: self.score_breakdown(team1, team2, team1_wins),
            confidence_label: self.confidence_label(p1),
        }
    }
}
