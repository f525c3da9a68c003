use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::Comparison;

/// A stored comparison, as returned by `GET /api/matchups/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub sport: String,
    pub comparison: Comparison,
}

/// One row of the history listing, without the full payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub team1: String,
    pub team2: String,
    pub sport: String,
    pub predicted_winner: String,
    /// Probability that team1 wins
    pub win_probability: f64,
    pub confidence_label: String,
}
