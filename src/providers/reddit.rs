use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::provider::SocialProvider;
use crate::scoring::SocialPost;
use crate::teams;

/// Posts whose comment threads are sampled.
const COMMENT_POSTS: usize = 5;
/// Top-level comments kept per sampled thread.
const COMMENTS_PER_POST: usize = 10;
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
/// Share of the fetch budget after which pending comment threads are dropped.
const COMMENT_CUTOFF: f64 = 0.9;

/// Reddit's public JSON listings, one subreddit per team.
pub struct RedditClient {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
    /// Wall-clock time one `fetch_posts` call may take
    budget: Duration,
}

/// One submission from a `new.json` listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPost {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl RedditClient {
    /// `budget` covers a whole `fetch_posts` call. Each HTTP attempt gets a
    /// slice of it small enough that every retry and backoff still fits.
    pub fn new(base_url: &str, user_agent: &str, budget: Duration) -> Result<Self> {
        // Reddit rejects requests without a descriptive User-Agent
        let http = Client::builder()
            .timeout(request_timeout(budget))
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(RedditClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            budget,
        })
    }

    /// GET with retries on 429, 5xx and transport timeouts. The delay doubles
    /// after every attempt, plus up to half of it again as random jitter.
    async fn get_json(&self, url: &Url) -> Result<serde_json::Value> {
        let mut delay = INITIAL_BACKOFF;
        for attempt in 1..=MAX_ATTEMPTS {
            debug!("GET {} (attempt {}/{})", url, attempt, MAX_ATTEMPTS);
            match self.http.get(url.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp.json().await.context("Failed to parse Reddit response");
                }
                Ok(resp)
                    if resp.status() == StatusCode::TOO_MANY_REQUESTS
                        || resp.status().is_server_error() =>
                {
                    warn!("Reddit returned {} (attempt {}/{})", resp.status(), attempt, MAX_ATTEMPTS);
                }
                Ok(resp) => anyhow::bail!("Reddit error: {}", resp.status()),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!("Reddit request failed: {} (attempt {}/{})", e, attempt, MAX_ATTEMPTS);
                }
                Err(e) => return Err(e).context("Reddit request failed"),
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay + jitter(delay)).await;
                delay *= 2;
            }
        }
        anyhow::bail!("Reddit request gave up after {} attempts: {}", MAX_ATTEMPTS, url)
    }

    async fn fetch_listing(&self, subreddit: &str, limit: usize) -> Result<Vec<ListingPost>> {
        let url = Url::parse_with_params(
            &format!("{}/r/{}/new.json", self.base_url, subreddit),
            &[("limit", limit.to_string())],
        )
        .context("Invalid Reddit URL")?;
        let raw = self.get_json(&url).await?;
        Ok(parse_listing(&raw, &self.base_url))
    }

    async fn fetch_comments(&self, post_id: &str, subreddit: &str) -> Result<Vec<SocialPost>> {
        let url = Url::parse(&format!("{}/comments/{}.json", self.base_url, post_id))
            .context("Invalid Reddit URL")?;
        let raw = self.get_json(&url).await?;
        Ok(parse_comments(&raw, &self.base_url, subreddit, COMMENTS_PER_POST))
    }
}

fn request_timeout(budget: Duration) -> Duration {
    budget / (MAX_ATTEMPTS + 1)
}

fn jitter(delay: Duration) -> Duration {
    let max_ms = delay.as_millis() as u64 / 2;
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

#[async_trait]
impl SocialProvider for RedditClient {
    fn name(&self) -> &str {
        "Reddit"
    }

    async fn fetch_posts(&self, team: &str, limit: usize) -> Result<Vec<SocialPost>> {
        let Some(entry) = teams::lookup(team) else {
            warn!("No subreddit mapping found for team: {}", team);
            return Ok(vec![]);
        };
        let subreddit = entry.subreddit;
        let started = Instant::now();
        let listing = self.fetch_listing(subreddit, limit).await?;

        // Comment threads are fetched concurrently; a failed thread only
        // loses its own comments.
        let remaining = self.budget.mul_f64(COMMENT_CUTOFF).saturating_sub(started.elapsed());
        let threads = join_all(
            listing
                .iter()
                .take(COMMENT_POSTS)
                .map(|p| self.fetch_comments(&p.id, subreddit)),
        );
        let mut comments = Vec::new();
        match tokio::time::timeout(remaining, threads).await {
            Ok(threads) => {
                for (listing_post, thread) in listing.iter().zip(threads) {
                    match thread {
                        Ok(c) => comments.extend(c),
                        Err(e) => warn!("Skipping comments for {}: {:#}", listing_post.id, e),
                    }
                }
            }
            Err(_) => warn!("r/{}: comment threads ran out of time, using submissions only", subreddit),
        }

        let submissions = listing
            .iter()
            .flat_map(|p| submission_posts(p, subreddit))
            .collect();
        let posts = interleave(submissions, comments);

        info!("💬 r/{}: {} posts, {} snippets", subreddit, listing.len(), posts.len());
        Ok(posts)
    }
}

/// Alternate submission and comment snippets so a capped sample sees both.
fn interleave(submissions: Vec<SocialPost>, comments: Vec<SocialPost>) -> Vec<SocialPost> {
    let mut out = Vec::with_capacity(submissions.len() + comments.len());
    let mut submissions = submissions.into_iter();
    let mut comments = comments.into_iter();
    loop {
        match (submissions.next(), comments.next()) {
            (None, None) => break,
            (s, c) => out.extend(s.into_iter().chain(c)),
        }
    }
    out
}

/// Title and self text of one submission, each as its own snippet.
fn submission_posts(post: &ListingPost, subreddit: &str) -> Vec<SocialPost> {
    [&post.title, &post.selftext]
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .map(|text| SocialPost {
            text: text.clone(),
            source: subreddit.to_string(),
            url: post.url.clone(),
            created_at: post.created_at,
        })
        .collect()
}

fn timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.as_f64()? as i64, 0)
}

fn is_removed(body: &str) -> bool {
    matches!(body.trim(), "" | "[deleted]" | "[removed]")
}

/// Parse a subreddit listing (`{"data": {"children": [{"kind": "t3", "data": {...}}]}}`).
pub fn parse_listing(raw: &serde_json::Value, base_url: &str) -> Vec<ListingPost> {
    let children = match raw["data"]["children"].as_array() {
        Some(c) => c,
        None => return vec![],
    };

    children
        .iter()
        .filter(|c| c["kind"].as_str().map_or(true, |k| k == "t3"))
        .filter_map(|c| {
            let d = &c["data"];
            let id = d["id"].as_str()?.to_string();
            let permalink = d["permalink"].as_str().unwrap_or("");
            let selftext = d["selftext"].as_str().unwrap_or("");
            Some(ListingPost {
                id,
                title: d["title"].as_str().unwrap_or("").to_string(),
                selftext: if is_removed(selftext) { String::new() } else { selftext.to_string() },
                url: format!("{}{}", base_url, permalink),
                created_at: timestamp(&d["created_utc"]),
            })
        })
        .collect()
}

/// Parse the comment listing of a thread (`[post_listing, comment_listing]`),
/// keeping up to `max` top-level comments that still have a body.
pub fn parse_comments(raw: &serde_json::Value, base_url: &str, subreddit: &str, max: usize) -> Vec<SocialPost> {
    let children = match raw.get(1).and_then(|l| l["data"]["children"].as_array()) {
        Some(c) => c,
        None => return vec![],
    };

    children
        .iter()
        .filter(|c| c["kind"].as_str() == Some("t1"))
        .filter_map(|c| {
            let d = &c["data"];
            let body = d["body"].as_str()?;
            if is_removed(body) {
                return None;
            }
            Some(SocialPost {
                text: body.to_string(),
                source: subreddit.to_string(),
                url: format!("{}{}", base_url, d["permalink"].as_str().unwrap_or("")),
                created_at: timestamp(&d["created_utc"]),
            })
        })
        .take(max)
        .collect()
}
