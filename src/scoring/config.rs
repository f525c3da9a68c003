//! Scoring configuration.
//!
//! Every tuning constant the pipeline uses lives in one immutable
//! [`ScoringConfig`]. A config is built per sport, validated once at startup
//! and then shared read-only by all components, so alternate configurations
//! can be swapped in for tests without touching the algorithms.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value a missing statistic normalizes to.
pub const NEUTRAL_MIDPOINT: f64 = 0.5;

/// Sports with a shipped scoring profile, as (canonical name, aliases).
const SPORT_ALIASES: &[(&str, &[&str])] = &[("basketball", &["basketball", "nba"])];

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("stat weights must sum to 1.0, got {0:.6}")]
    WeightsDoNotSumToOne(f64),
    #[error("reference range for {field:?} is empty or inverted ({min}..{max})")]
    InvalidRange { field: StatField, min: f64, max: f64 },
    #[error("weight for {field:?} must be finite and non-negative, got {weight}")]
    InvalidWeight { field: StatField, weight: f64 },
    #[error("{name} must be finite and positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),
    #[error("{list} fallbacks cannot fill the minimum of {needed} (only {available})")]
    FallbacksTooShort {
        list: &'static str,
        needed: usize,
        available: usize,
    },
}

/// Team statistics tracked by the scorer, in the order statements are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    FgPct,
    PointsAvg,
    ReboundsAvg,
    AssistsAvg,
    TurnoversAvg,
    PointDiff,
}

impl StatField {
    pub const ALL: [StatField; 6] = [
        StatField::FgPct,
        StatField::PointsAvg,
        StatField::ReboundsAvg,
        StatField::AssistsAvg,
        StatField::TurnoversAvg,
        StatField::PointDiff,
    ];
}

/// How one statistic is normalized, weighted and described.
#[derive(Debug, Clone, PartialEq)]
pub struct StatProfile {
    pub field: StatField,
    /// Expected minimum over the recent-games window.
    pub min: f64,
    /// Expected maximum over the recent-games window.
    pub max: f64,
    /// Turnovers and the like: a low raw value normalizes high.
    pub lower_is_better: bool,
    pub weight: f64,
    /// Statement emitted when the normalized value clears the upper threshold.
    pub pro: &'static str,
    /// Statement emitted when the normalized value falls below the lower threshold.
    pub con: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentConfig {
    /// A snippet is positive above this compound score and negative below its negation.
    pub polarity_threshold: f64,
    pub max_keywords: usize,
    pub max_quotes: usize,
    /// Quotes are truncated to this many characters.
    pub quote_chars: usize,
    /// Snippets beyond this count are ignored.
    pub max_snippets: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProsConsConfig {
    pub upper_threshold: f64,
    pub lower_threshold: f64,
    /// |compound| needed before sentiment produces a statement.
    pub sentiment_threshold: f64,
    pub min_statements: usize,
    pub max_statements: usize,
    pub sentiment_pro: &'static str,
    pub sentiment_con: &'static str,
    pub fallback_pros: Vec<&'static str>,
    pub fallback_cons: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchupConfig {
    /// `k` in `sigmoid(k * (score1 - score2))`.
    pub sigmoid_scale: f64,
    /// |p - 0.5| above this is at least moderate confidence.
    pub moderate_cutoff: f64,
    /// |p - 0.5| above this is high confidence.
    pub high_cutoff: f64,
    /// Predicted points for both teams when scores are level.
    pub base_points: f64,
    /// Predicted points each side gains/loses per unit of score difference.
    pub points_per_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub sport: String,
    pub stats: Vec<StatProfile>,
    /// Stats component = scale * weighted sum of normalized stats.
    pub stats_scale: f64,
    pub sentiment_weight: f64,
    /// Subtracted per injury note, multiplied by the note's keyword severity.
    pub injury_penalty: f64,
    /// Whole-word keywords and their severity in [0, 1].
    pub injury_severities: Vec<(&'static str, f64)>,
    pub sentiment: SentimentConfig,
    pub pros_cons: ProsConsConfig,
    pub matchup: MatchupConfig,
}

impl ScoringConfig {
    /// Map a user-supplied sport name onto a shipped profile.
    pub fn canonical_sport(sport: &str) -> Option<&'static str> {
        let wanted = sport.trim().to_lowercase();
        SPORT_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.contains(&wanted.as_str()))
            .map(|(name, _)| *name)
    }

    /// Names of every sport with a profile.
    pub fn supported_sports() -> impl Iterator<Item = &'static str> {
        SPORT_ALIASES.iter().map(|(name, _)| *name)
    }

    pub fn for_sport(sport: &str) -> Option<Self> {
        match Self::canonical_sport(sport)? {
            "basketball" => Some(Self::basketball()),
            _ => None,
        }
    }

    /// NBA profile. Ranges cover what a team averages over a 10-game window.
    ///
    /// | stat      | range       | weight |
    /// |-----------|-------------|--------|
    /// | FG%       | 0.35 – 0.55 | 0.25   |
    /// | points    | 100 – 125   | 0.10   |
    /// | rebounds  | 35 – 50     | 0.15   |
    /// | assists   | 20 – 32     | 0.10   |
    /// | turnovers | 12 – 18 (inverted) | 0.15 |
    /// | +/-       | -10 – +10   | 0.25   |
    pub fn basketball() -> Self {
        ScoringConfig {
            sport: "basketball".into(),
            stats: vec![
                StatProfile {
                    field: StatField::FgPct,
                    min: 0.35,
                    max: 0.55,
                    lower_is_better: false,
                    weight: 0.25,
                    pro: "Efficient shooting from the field",
                    con: "Below-average shooting efficiency",
                },
                StatProfile {
                    field: StatField::PointsAvg,
                    min: 100.0,
                    max: 125.0,
                    lower_is_better: false,
                    weight: 0.10,
                    pro: "High-powered scoring offense",
                    con: "Struggles to generate offense",
                },
                StatProfile {
                    field: StatField::ReboundsAvg,
                    min: 35.0,
                    max: 50.0,
                    lower_is_better: false,
                    weight: 0.15,
                    pro: "Dominant rebounding presence",
                    con: "Gets outworked on the glass",
                },
                StatProfile {
                    field: StatField::AssistsAvg,
                    min: 20.0,
                    max: 32.0,
                    lower_is_better: false,
                    weight: 0.10,
                    pro: "Unselfish ball movement",
                    con: "Stagnant half-court offense",
                },
                StatProfile {
                    field: StatField::TurnoversAvg,
                    min: 12.0,
                    max: 18.0,
                    lower_is_better: true,
                    weight: 0.15,
                    pro: "Excellent ball security",
                    con: "Turnover-prone in key situations",
                },
                StatProfile {
                    field: StatField::PointDiff,
                    min: -10.0,
                    max: 10.0,
                    lower_is_better: false,
                    weight: 0.25,
                    pro: "Strong positive point differential",
                    con: "Negative point differential points to defensive issues",
                },
            ],
            stats_scale: 10.0,
            sentiment_weight: 1.0,
            injury_penalty: 0.5,
            injury_severities: vec![
                ("out", 1.0),
                ("surgery", 1.0),
                ("fracture", 1.0),
                ("torn", 1.0),
                ("season-ending", 1.0),
                ("doubtful", 0.75),
                ("injured", 0.75),
                ("questionable", 0.5),
                ("day-to-day", 0.25),
                ("probable", 0.1),
            ],
            sentiment: SentimentConfig {
                polarity_threshold: 0.05,
                max_keywords: 5,
                max_quotes: 3,
                quote_chars: 200,
                max_snippets: 50,
            },
            pros_cons: ProsConsConfig {
                upper_threshold: 0.65,
                lower_threshold: 0.35,
                sentiment_threshold: 0.10,
                min_statements: 3,
                max_statements: 5,
                sentiment_pro: "Positive fan and community sentiment",
                sentiment_con: "Fan and community sentiment shows concerns",
                fallback_pros: vec![
                    "Experienced roster with playoff potential",
                    "Strong team chemistry and coaching",
                    "Competitive in key matchups",
                ],
                fallback_cons: vec![
                    "Consistency issues in recent performances",
                    "Room for improvement in key areas",
                    "Challenges in closing out games",
                ],
            },
            matchup: MatchupConfig {
                sigmoid_scale: 0.5,
                moderate_cutoff: 0.15,
                high_cutoff: 0.30,
                base_points: 110.0,
                points_per_score: 2.0,
            },
        }
    }

    pub fn with_sigmoid_scale(mut self, k: f64) -> Self {
        self.matchup.sigmoid_scale = k;
        self
    }

    pub fn profile(&self, field: StatField) -> Option<&StatProfile> {
        self.stats.iter().find(|p| p.field == field)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        let mut weight_sum = 0.0;
        for p in &self.stats {
            if !(p.min.is_finite() && p.max.is_finite()) || p.min >= p.max {
                return Err(ScoringError::InvalidRange {
                    field: p.field,
                    min: p.min,
                    max: p.max,
                });
            }
            if !p.weight.is_finite() || p.weight < 0.0 {
                return Err(ScoringError::InvalidWeight {
                    field: p.field,
                    weight: p.weight,
                });
            }
            weight_sum += p.weight;
        }
        if (weight_sum - 1.0).abs() > 1e-9 {
            return Err(ScoringError::WeightsDoNotSumToOne(weight_sum));
        }

        for (name, value) in [
            ("stats_scale", self.stats_scale),
            ("sigmoid_scale", self.matchup.sigmoid_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScoringError::NonPositive { name, value });
            }
        }
        for (name, value) in [
            ("sentiment_weight", self.sentiment_weight),
            ("injury_penalty", self.injury_penalty),
            ("points_per_score", self.matchup.points_per_score),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoringError::NonPositive { name, value });
            }
        }
        if let Some((kw, sev)) = self
            .injury_severities
            .iter()
            .find(|(_, sev)| !(0.0..=1.0).contains(sev))
        {
            return Err(ScoringError::InvalidThresholds(format!(
                "injury severity for '{}' must be within [0, 1], got {}",
                kw, sev
            )));
        }

        if !(0.0..1.0).contains(&self.sentiment.polarity_threshold) {
            return Err(ScoringError::InvalidThresholds(format!(
                "sentiment polarity threshold {} outside [0, 1)",
                self.sentiment.polarity_threshold
            )));
        }

        let pc = &self.pros_cons;
        if !(0.0 <= pc.lower_threshold
            && pc.lower_threshold <= pc.upper_threshold
            && pc.upper_threshold <= 1.0)
        {
            return Err(ScoringError::InvalidThresholds(format!(
                "pros/cons thresholds must satisfy 0 <= lower ({}) <= upper ({}) <= 1",
                pc.lower_threshold, pc.upper_threshold
            )));
        }
        if pc.min_statements > pc.max_statements {
            return Err(ScoringError::InvalidThresholds(format!(
                "min_statements {} exceeds max_statements {}",
                pc.min_statements, pc.max_statements
            )));
        }
        for (list, fallbacks) in [("pros", &pc.fallback_pros), ("cons", &pc.fallback_cons)] {
            if fallbacks.len() < pc.min_statements {
                return Err(ScoringError::FallbacksTooShort {
                    list,
                    needed: pc.min_statements,
                    available: fallbacks.len(),
                });
            }
        }

        let m = &self.matchup;
        if !(0.0 < m.moderate_cutoff && m.moderate_cutoff < m.high_cutoff && m.high_cutoff < 0.5) {
            return Err(ScoringError::InvalidThresholds(format!(
                "confidence cutoffs must satisfy 0 < moderate ({}) < high ({}) < 0.5",
                m.moderate_cutoff, m.high_cutoff
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basketball_profile_is_valid() {
        assert_eq!(ScoringConfig::basketball().validate(), Ok(()));
    }

    #[test]
    fn sport_aliases_resolve() {
        assert_eq!(ScoringConfig::canonical_sport("NBA"), Some("basketball"));
        assert_eq!(ScoringConfig::canonical_sport(" basketball "), Some("basketball"));
        assert_eq!(ScoringConfig::canonical_sport("curling"), None);
        assert!(ScoringConfig::for_sport("hockey").is_none());
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        let mut cfg = ScoringConfig::basketball();
        cfg.stats[0].weight = 0.5;
        assert!(matches!(
            cfg.validate(),
            Err(ScoringError::WeightsDoNotSumToOne(_))
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut cfg = ScoringConfig::basketball();
        cfg.stats[1].min = 130.0;
        assert!(matches!(
            cfg.validate(),
            Err(ScoringError::InvalidRange {
                field: StatField::PointsAvg,
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_positive_sigmoid_scale() {
        let cfg = ScoringConfig::basketball().with_sigmoid_scale(0.0);
        assert!(matches!(
            cfg.validate(),
            Err(ScoringError::NonPositive {
                name: "sigmoid_scale",
                ..
            })
        ));
    }

    #[test]
    fn rejects_minimum_that_fallbacks_cannot_fill() {
        let mut cfg = ScoringConfig::basketball();
        cfg.pros_cons.min_statements = 4;
        assert!(matches!(
            cfg.validate(),
            Err(ScoringError::FallbacksTooShort { list: "pros", .. })
        ));
    }

    #[test]
    fn rejects_misordered_confidence_cutoffs() {
        let mut cfg = ScoringConfig::basketball();
        cfg.matchup.moderate_cutoff = 0.35;
        assert!(matches!(
            cfg.validate(),
            Err(ScoringError::InvalidThresholds(_))
        ));
    }
}
