use std::sync::Arc;

use super::config::ScoringConfig;
use super::models::SentimentSummary;
use super::team::NormalizedStat;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProsCons {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Turns normalized stats and sentiment into short strengths/weaknesses.
///
/// Order is fixed: stat statements in configuration order, then the sentiment
/// statement, then generic fallbacks until the minimum is met.
pub struct ProsConsGenerator {
    config: Arc<ScoringConfig>,
}

impl ProsConsGenerator {
    pub fn new(config: Arc<ScoringConfig>) -> Self {
        Self { config }
    }

    pub fn generate(&self, normalized: &[NormalizedStat], sentiment: &SentimentSummary) -> ProsCons {
        let pc = &self.config.pros_cons;
        let mut pros = Vec::new();
        let mut cons = Vec::new();

        for stat in normalized {
            // No statement about data we don't have.
            if stat.raw.is_none() {
                continue;
            }
            let Some(profile) = self.config.profile(stat.field) else {
                continue;
            };
            if stat.value > pc.upper_threshold {
                pros.push(profile.pro);
            } else if stat.value < pc.lower_threshold {
                cons.push(profile.con);
            }
        }

        if sentiment.sample_size > 0 {
            if sentiment.compound > pc.sentiment_threshold {
                pros.push(pc.sentiment_pro);
            } else if sentiment.compound < -pc.sentiment_threshold {
                cons.push(pc.sentiment_con);
            }
        }

        ProsCons {
            pros: finalize(pros, &pc.fallback_pros, pc.min_statements, pc.max_statements),
            cons: finalize(cons, &pc.fallback_cons, pc.min_statements, pc.max_statements),
        }
    }
}

/// Dedupe, cap at `max`, then top up from `fallbacks` to reach `min`.
fn finalize(statements: Vec<&str>, fallbacks: &[&str], min: usize, max: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(max);
    for s in statements {
        if out.len() >= max {
            break;
        }
        if !out.iter().any(|o| o == s) {
            out.push(s.to_string());
        }
    }
    for f in fallbacks {
        if out.len() >= min {
            break;
        }
        if !out.iter().any(|o| o == f) {
            out.push(f.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::models::RawStats;
    use crate::scoring::team::TeamScorer;

    fn setup(config: ScoringConfig) -> (TeamScorer, ProsConsGenerator) {
        let config = Arc::new(config);
        (
            TeamScorer::new(Arc::clone(&config)),
            ProsConsGenerator::new(config),
        )
    }

    fn sentiment(compound: f64, sample_size: usize) -> SentimentSummary {
        SentimentSummary {
            compound,
            sample_size,
            ..Default::default()
        }
    }

    #[test]
    fn strong_team_gets_stat_pros_in_fixed_order() {
        let (scorer, gen) = setup(ScoringConfig::basketball());
        let stats = RawStats {
            fg_pct: Some(0.50),
            rebounds_avg: Some(48.0),
            turnovers_avg: Some(12.5),
            point_diff: Some(8.0),
            ..Default::default()
        };
        let out = gen.generate(&scorer.normalize(&stats), &sentiment(0.4, 10));
        assert_eq!(
            out.pros,
            vec![
                "Efficient shooting from the field",
                "Dominant rebounding presence",
                "Excellent ball security",
                "Strong positive point differential",
                "Positive fan and community sentiment",
            ]
        );
        // No stat or sentiment cons → all fallbacks.
        assert_eq!(
            out.cons,
            vec![
                "Consistency issues in recent performances",
                "Room for improvement in key areas",
                "Challenges in closing out games",
            ]
        );
    }

    #[test]
    fn weak_team_gets_cons_and_sentiment_con_last() {
        let (scorer, gen) = setup(ScoringConfig::basketball());
        let stats = RawStats {
            fg_pct: Some(0.40),
            turnovers_avg: Some(17.0),
            ..Default::default()
        };
        let out = gen.generate(&scorer.normalize(&stats), &sentiment(-0.5, 5));
        assert_eq!(
            out.cons,
            vec![
                "Below-average shooting efficiency",
                "Turnover-prone in key situations",
                "Fan and community sentiment shows concerns",
            ]
        );
        assert_eq!(out.pros.len(), 3);
    }

    #[test]
    fn middling_values_produce_no_statement() {
        let (scorer, gen) = setup(ScoringConfig::basketball());
        let stats = RawStats {
            fg_pct: Some(0.45),
            points_avg: Some(112.5),
            ..Default::default()
        };
        let mut config = ScoringConfig::basketball();
        config.pros_cons.min_statements = 0;
        let (_, bare) = setup(config);
        let out = bare.generate(&scorer.normalize(&stats), &sentiment(0.05, 3));
        assert!(out.pros.is_empty());
        assert!(out.cons.is_empty());
        // With the default minimum the lists are filled instead.
        let out = gen.generate(&scorer.normalize(&stats), &sentiment(0.05, 3));
        assert_eq!(out.pros.len(), 3);
        assert_eq!(out.cons.len(), 3);
    }

    #[test]
    fn no_input_at_all_still_yields_fallbacks() {
        let (scorer, gen) = setup(ScoringConfig::basketball());
        let out = gen.generate(&scorer.normalize(&RawStats::default()), &SentimentSummary::default());
        assert!(!out.pros.is_empty());
        assert!(!out.cons.is_empty());
    }

    #[test]
    fn output_is_capped_at_maximum() {
        let mut config = ScoringConfig::basketball();
        config.pros_cons.max_statements = 2;
        config.pros_cons.min_statements = 1;
        let (scorer, gen) = setup(config);
        let stats = RawStats {
            fg_pct: Some(0.55),
            points_avg: Some(125.0),
            rebounds_avg: Some(50.0),
            ..Default::default()
        };
        let out = gen.generate(&scorer.normalize(&stats), &sentiment(0.9, 4));
        assert_eq!(
            out.pros,
            vec!["Efficient shooting from the field", "High-powered scoring offense"]
        );
    }

    #[test]
    fn finalize_dedupes_and_skips_duplicate_fallbacks() {
        let out = finalize(vec!["a", "a", "b"], &["b", "c", "d"], 3, 5);
        assert_eq!(out, vec!["a", "b", "c"]);
    }
}
