//! Lexicon-based sentiment over social-media snippets.
//!
//! Each snippet is scored independently with VADER (Valence Aware Dictionary
//! and sEntiment Reasoner), which is tuned for short informal text like
//! Reddit titles and comments. Scores are then folded into a
//! [`SentimentSummary`]: mean compound, polarity distribution, frequent
//! keywords and the most charged quotes.

use std::collections::HashMap;
use std::sync::Arc;

use vader_sentiment::SentimentIntensityAnalyzer;

use super::config::{ScoringConfig, SentimentConfig};
use super::models::{Keyword, Quote, SentimentDistribution, SentimentSummary, SocialPost};

/// Words never reported as keywords.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "should", "could", "may", "might", "must", "can", "this",
    "that", "these", "those", "i", "you", "he", "she", "it", "we", "they", "me", "him", "her",
    "us", "them", "what", "which", "who", "whom", "whose", "where", "when", "why", "how", "all",
    "each", "every", "both", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
    "only", "own", "same", "so", "than", "too", "very", "just", "now",
];

/// Keyword tokens shorter than this are ignored.
const MIN_KEYWORD_CHARS: usize = 3;

pub struct SentimentAnalyzer {
    config: Arc<ScoringConfig>,
    vader: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new(config: Arc<ScoringConfig>) -> Self {
        Self {
            config,
            vader: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Compound polarity of one snippet in [-1, 1]. Blank text is neutral.
    pub fn polarity(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let scores = self.vader.polarity_scores(text);
        scores
            .get("compound")
            .copied()
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    }

    /// The posts that make it into the sample: non-blank, in order, capped
    /// at the configured sample size.
    pub fn sample<'a>(&self, posts: &'a [SocialPost]) -> impl Iterator<Item = &'a SocialPost> {
        posts
            .iter()
            .filter(|p| !p.text.trim().is_empty())
            .take(self.config.sentiment.max_snippets)
    }

    /// Score every sampled post and summarize.
    pub fn analyze(&self, posts: &[SocialPost]) -> SentimentSummary {
        let scored: Vec<(&str, f64)> = self
            .sample(posts)
            .map(|p| (p.text.as_str(), self.polarity(&p.text)))
            .collect();
        summarize(&self.config.sentiment, &scored)
    }
}

/// Fold pre-scored snippets into a summary. Pure over its inputs.
pub fn summarize(config: &SentimentConfig, scored: &[(&str, f64)]) -> SentimentSummary {
    if scored.is_empty() {
        return SentimentSummary::default();
    }

    let n = scored.len() as f64;
    let compound = scored.iter().map(|(_, c)| c).sum::<f64>() / n;

    let threshold = config.polarity_threshold;
    let positive = scored.iter().filter(|(_, c)| *c > threshold).count();
    let negative = scored.iter().filter(|(_, c)| *c < -threshold).count();
    let neutral = scored.len() - positive - negative;

    SentimentSummary {
        compound,
        distribution: SentimentDistribution {
            positive: positive as f64 / n,
            neutral: neutral as f64 / n,
            negative: negative as f64 / n,
        },
        keywords: extract_keywords(scored.iter().map(|(t, _)| *t), config.max_keywords),
        quotes: sample_quotes(scored, config.max_quotes, config.quote_chars),
        sample_size: scored.len(),
    }
}

/// Most frequent non-stopword tokens. Ties keep first-occurrence order.
fn extract_keywords<'a>(texts: impl Iterator<Item = &'a str>, max: usize) -> Vec<Keyword> {
    // token -> (count, first position)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut position = 0usize;
    for text in texts {
        let lower = text.to_lowercase();
        let tokens = lower
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .map(|t| t.trim_matches('-'))
            .filter(|t| t.chars().count() >= MIN_KEYWORD_CHARS && !STOPWORDS.contains(t));
        for token in tokens {
            counts
                .entry(token.to_string())
                .and_modify(|(count, _)| *count += 1)
                .or_insert((1, position));
            position += 1;
        }
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(max)
        .map(|(word, frequency, _)| Keyword { word, frequency })
        .collect()
}

/// Snippets with the largest |compound| first; stable, so equal magnitudes
/// stay in input order.
fn sample_quotes(scored: &[(&str, f64)], max: usize, max_chars: usize) -> Vec<Quote> {
    let mut ordered: Vec<&(&str, f64)> = scored.iter().collect();
    ordered.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    ordered
        .into_iter()
        .take(max)
        .map(|(text, compound)| Quote {
            text: text.trim().chars().take(max_chars).collect(),
            compound: *compound,
        })
        .collect()
}

fn overall_label(compound: f64) -> &'static str {
    if compound > 0.5 {
        "very positive"
    } else if compound > 0.1 {
        "positive"
    } else if compound > -0.1 {
        "neutral"
    } else if compound > -0.5 {
        "negative"
    } else {
        "very negative"
    }
}

/// Human-readable `sentiment_summary` text for the response.
pub fn describe(summary: &SentimentSummary) -> String {
    if summary.sample_size == 0 {
        return "No social media data available for sentiment analysis.".to_string();
    }

    let d = &summary.distribution;
    let mut text = format!(
        "Overall sentiment is {} (compound score: {:.2}) across {} posts and comments. \
         Sentiment distribution: {:.0}% positive, {:.0}% neutral, {:.0}% negative.",
        overall_label(summary.compound),
        summary.compound,
        summary.sample_size,
        d.positive * 100.0,
        d.neutral * 100.0,
        d.negative * 100.0,
    );
    if !summary.keywords.is_empty() {
        let words: Vec<&str> = summary.keywords.iter().map(|k| k.word.as_str()).collect();
        text.push_str(&format!(" Key topics: {}.", words.join(", ")));
    }
    if let Some(quote) = summary.quotes.first() {
        let snippet: String = quote.text.chars().take(100).collect();
        text.push_str(&format!(" Most charged take: \"{}\"", snippet));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cfg() -> SentimentConfig {
        ScoringConfig::basketball().sentiment
    }

    fn post(text: &str) -> SocialPost {
        SocialPost {
            text: text.into(),
            source: "lakers".into(),
            url: "https://www.reddit.com/r/lakers/comments/abc/x/".into(),
            created_at: None,
        }
    }

    #[test]
    fn empty_input_is_neutral_and_empty() {
        let s = summarize(&cfg(), &[]);
        assert_eq!(s.compound, 0.0);
        assert_eq!(s.distribution, SentimentDistribution::default());
        assert!(s.keywords.is_empty());
        assert!(s.quotes.is_empty());
        assert_eq!(s.sample_size, 0);
    }

    #[test]
    fn compound_is_mean_and_distribution_sums_to_one() {
        let scored = [("great win", 0.8), ("meh", 0.0), ("awful loss", -0.6), ("ok", 0.04)];
        let s = summarize(&cfg(), &scored);
        assert_relative_eq!(s.compound, 0.06, epsilon = 1e-12);
        assert_relative_eq!(s.distribution.positive, 0.25);
        assert_relative_eq!(s.distribution.neutral, 0.5);
        assert_relative_eq!(s.distribution.negative, 0.25);
        let total = s.distribution.positive + s.distribution.neutral + s.distribution.negative;
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn compound_does_not_depend_on_order() {
        let a = [("a", 0.3), ("b", -0.7), ("c", 0.9)];
        let b = [("c", 0.9), ("a", 0.3), ("b", -0.7)];
        assert_relative_eq!(
            summarize(&cfg(), &a).compound,
            summarize(&cfg(), &b).compound,
            epsilon = 1e-12
        );
    }

    #[test]
    fn quotes_take_most_extreme_first_and_keep_order_on_ties() {
        let scored = [
            ("mild", 0.1),
            ("first strong", -0.9),
            ("second strong", 0.9),
            ("middle", 0.5),
        ];
        let s = summarize(&cfg(), &scored);
        let texts: Vec<&str> = s.quotes.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["first strong", "second strong", "middle"]);
    }

    #[test]
    fn quotes_are_truncated() {
        let long = "x".repeat(500);
        let scored = [(long.as_str(), 0.9)];
        let s = summarize(&cfg(), &scored);
        assert_eq!(s.quotes[0].text.chars().count(), 200);
    }

    #[test]
    fn keywords_rank_by_frequency_then_first_occurrence() {
        let scored = [
            ("Defense was the story, defense wins", 0.2),
            ("LeBron and the bench, bench depth", 0.1),
            ("Defense and LeBron", 0.3),
        ];
        let s = summarize(&cfg(), &scored);
        let words: Vec<(&str, usize)> = s
            .keywords
            .iter()
            .map(|k| (k.word.as_str(), k.frequency))
            .collect();
        assert_eq!(
            words,
            vec![
                ("defense", 3),
                ("lebron", 2),
                ("bench", 2),
                ("story", 1),
                ("wins", 1)
            ]
        );
    }

    #[test]
    fn keywords_skip_stopwords_and_short_tokens() {
        let scored = [("it is so on to a go", 0.0)];
        assert!(summarize(&cfg(), &scored).keywords.is_empty());
    }

    #[test]
    fn polarity_is_bounded_and_directional() {
        let analyzer = SentimentAnalyzer::new(Arc::new(ScoringConfig::basketball()));
        let good = analyzer.polarity("What an amazing, wonderful win! Love this team!");
        let bad = analyzer.polarity("Terrible, awful, embarrassing loss. I hate this.");
        assert!(good > 0.5, "expected strongly positive, got {good}");
        assert!(bad < -0.5, "expected strongly negative, got {bad}");
        assert_eq!(analyzer.polarity("   "), 0.0);
    }

    #[test]
    fn analyze_caps_sample_size() {
        let mut config = ScoringConfig::basketball();
        config.sentiment.max_snippets = 2;
        let analyzer = SentimentAnalyzer::new(Arc::new(config));
        let posts = vec![post("good"), post(""), post("bad"), post("fine")];
        let s = analyzer.analyze(&posts);
        assert_eq!(s.sample_size, 2);
    }

    #[test]
    fn describe_mentions_distribution_and_topics() {
        let scored = [("Defense travels", 0.6), ("defense again", 0.7)];
        let text = describe(&summarize(&cfg(), &scored));
        assert!(text.starts_with("Overall sentiment is very positive"));
        assert!(text.contains("100% positive"));
        assert!(text.contains("Key topics: defense"));
    }

    #[test]
    fn describe_empty_summary() {
        let text = describe(&SentimentSummary::default());
        assert_eq!(text, "No social media data available for sentiment analysis.");
    }
}
