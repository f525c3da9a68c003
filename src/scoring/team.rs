//! Team scoring: raw statistics, sentiment and injury notes → one scalar.
//!
//! ```text
//!   total = stats_scale * Σ weight_i * norm_i      (stats component)
//!         + sentiment_weight * compound             (sentiment component)
//!         - Σ injury_penalty * severity(note)       (injury penalty)
//! ```
//!
//! `norm_i` is the statistic rescaled into [0, 1] against its reference range
//! (inverted for lower-is-better stats) and 0.5 when the stat is missing.
//! The total is not clamped; the matchup sigmoid keeps probabilities bounded.

use std::sync::Arc;

use super::config::{ScoringConfig, StatField, NEUTRAL_MIDPOINT};
use super::models::{RawStats, SentimentSummary, TeamScore};

/// One statistic after normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedStat {
    pub field: StatField,
    /// Value the provider reported, if any
    pub raw: Option<f64>,
    /// In [0, 1], higher is better
    pub value: f64,
}

/// Rescale `v` into [0, 1] against `min..max`.
pub fn normalize_value(v: f64, min: f64, max: f64, lower_is_better: bool) -> f64 {
    if max <= min {
        return NEUTRAL_MIDPOINT;
    }
    let n = ((v - min) / (max - min)).clamp(0.0, 1.0);
    if lower_is_better {
        1.0 - n
    } else {
        n
    }
}

/// True when `needle` occurs in `haystack` bounded by non-alphanumeric chars.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

pub struct TeamScorer {
    config: Arc<ScoringConfig>,
}

impl TeamScorer {
    pub fn new(config: Arc<ScoringConfig>) -> Self {
        Self { config }
    }

    /// Normalize every configured statistic, in configuration order.
    pub fn normalize(&self, stats: &RawStats) -> Vec<NormalizedStat> {
        self.config
            .stats
            .iter()
            .map(|p| {
                let raw = stats.get(p.field);
                let value = raw
                    .map(|v| normalize_value(v, p.min, p.max, p.lower_is_better))
                    .unwrap_or(NEUTRAL_MIDPOINT);
                NormalizedStat {
                    field: p.field,
                    raw,
                    value,
                }
            })
            .collect()
    }

    pub fn stats_component(&self, normalized: &[NormalizedStat]) -> f64 {
        let weighted: f64 = normalized
            .iter()
            .filter_map(|n| self.config.profile(n.field).map(|p| p.weight * n.value))
            .sum();
        self.config.stats_scale * weighted
    }

    pub fn sentiment_component(&self, sentiment: &SentimentSummary) -> f64 {
        self.config.sentiment_weight * sentiment.compound
    }

    /// Severity of the most serious keyword in one note; 0 when none match.
    pub fn injury_severity(&self, note: &str) -> f64 {
        let lower = note.to_lowercase();
        self.config
            .injury_severities
            .iter()
            .filter(|(kw, _)| contains_word(&lower, kw))
            .map(|(_, sev)| *sev)
            .fold(0.0, f64::max)
    }

    pub fn injury_penalty(&self, notes: &[String]) -> f64 {
        notes
            .iter()
            .map(|n| self.config.injury_penalty * self.injury_severity(n))
            .sum()
    }

    pub fn score(
        &self,
        team: &str,
        normalized: &[NormalizedStat],
        sentiment: &SentimentSummary,
        injuries: &[String],
    ) -> TeamScore {
        let stats_component = self.stats_component(normalized);
        let sentiment_component = self.sentiment_component(sentiment);
        let injury_penalty = self.injury_penalty(injuries);
        TeamScore {
            team: team.to_string(),
            stats_component,
            sentiment_component,
            injury_penalty,
            total: stats_component + sentiment_component - injury_penalty,
        }
    }
}

/// Human-readable `stats_summary` text for the response.
pub fn describe_stats(stats: &RawStats) -> String {
    if stats.is_empty() {
        return "Recent statistics unavailable; using a neutral baseline.".to_string();
    }

    let mut parts = Vec::new();
    if let Some(v) = stats.points_avg {
        parts.push(format!("{:.1} PPG", v));
    }
    if let Some(v) = stats.fg_pct {
        parts.push(format!("{:.1}% FG", v * 100.0));
    }
    if let Some(v) = stats.rebounds_avg {
        parts.push(format!("{:.1} RPG", v));
    }
    if let Some(v) = stats.assists_avg {
        parts.push(format!("{:.1} APG", v));
    }
    if let Some(v) = stats.turnovers_avg {
        parts.push(format!("{:.1} TOV", v));
    }
    if let Some(v) = stats.point_diff {
        parts.push(format!("{:+.1} point differential", v));
    }

    match stats.games_played {
        Some(n) => format!("Last {} games: {}.", n, parts.join(", ")),
        None => format!("Recent games: {}.", parts.join(", ")),
    }
}
