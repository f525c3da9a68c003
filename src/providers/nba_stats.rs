use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::provider::{StatsProvider, StatsReport};
use crate::scoring::RawStats;
use crate::teams;

/// Team statistics from the stats.nba.com `teamgamelog` endpoint.
pub struct NbaStatsClient {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
    /// Number of most recent games averaged
    window: usize,
}

impl NbaStatsClient {
    pub fn new(base_url: &str, window: usize, timeout: Duration) -> Result<Self> {
        // stats.nba.com drops requests that don't look like they come from nba.com
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));

        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) ballpulse")
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NbaStatsClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            window,
        })
    }

    async fn fetch_game_log(&self, team_id: u32, season: &str, as_of: Option<NaiveDate>) -> Result<serde_json::Value> {
        let mut params = vec![
            ("TeamID", team_id.to_string()),
            ("Season", season.to_string()),
            ("SeasonType", "Regular Season".to_string()),
        ];
        if let Some(date) = as_of {
            params.push(("DateTo", date.format("%m/%d/%Y").to_string()));
        }
        let url = Url::parse_with_params(&format!("{}/teamgamelog", self.base_url), &params)
            .context("Invalid stats API URL")?;
        debug!("Fetching game log from {}", url);

        let resp = self.http.get(url).send().await
            .context("NBA stats request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("NBA stats error: {}", resp.status());
        }

        resp.json().await.context("Failed to parse NBA stats response")
    }
}

#[async_trait]
impl StatsProvider for NbaStatsClient {
    fn name(&self) -> &str {
        "NBA Stats"
    }

    async fn fetch_recent_stats(&self, team: &str, as_of: Option<NaiveDate>) -> Result<StatsReport> {
        let entry = teams::lookup(team)
            .with_context(|| format!("No NBA team id for '{}'", team))?;
        let start_year = season_start_year(as_of.unwrap_or_else(|| Utc::now().date_naive()));

        // Early in a season the current log can be empty; fall back one season.
        for year in [start_year, start_year - 1] {
            let season = season_label(year);
            let raw = self.fetch_game_log(entry.nba_id, &season, as_of).await?;
            if let Some(stats) = parse_game_log(&raw, self.window)? {
                info!(
                    "📊 {} stats: {} games from {}",
                    entry.name,
                    stats.games_played.unwrap_or(0),
                    season
                );
                return Ok(StatsReport {
                    stats,
                    source: format!("nba_stats:{}", season),
                });
            }
            debug!("No games for {} in {}", entry.name, season);
        }
        anyhow::bail!("No recent games found for {}", entry.name)
    }
}

/// Calendar year the season containing `date` started in. Seasons tip off in
/// October, so January through September belong to the previous year's season.
pub fn season_start_year(date: NaiveDate) -> i32 {
    if date.month() >= 10 {
        date.year()
    } else {
        date.year() - 1
    }
}

/// "2024-25" style label for the season starting in `start_year`.
pub fn season_label(start_year: i32) -> String {
    format!("{}-{:02}", start_year, (start_year + 1).rem_euclid(100))
}

/// Average the first `window` rows of a `teamgamelog` result set (rows come
/// newest first). Returns `None` when the log has no games.
///
/// Columns are located by header name; a missing column leaves its field
/// empty rather than failing.
pub fn parse_game_log(raw: &serde_json::Value, window: usize) -> Result<Option<RawStats>> {
    let set = raw["resultSets"]
        .as_array()
        .and_then(|sets| sets.first())
        .context("Game log has no resultSets")?;
    let headers: Vec<&str> = set["headers"]
        .as_array()
        .context("Game log has no headers")?
        .iter()
        .filter_map(|h| h.as_str())
        .collect();
    let rows = set["rowSet"].as_array().context("Game log has no rowSet")?;
    if rows.is_empty() || window == 0 {
        return Ok(None);
    }
    let recent = &rows[..rows.len().min(window)];

    let column_mean = |name: &str| -> Option<f64> {
        let idx = headers.iter().position(|h| *h == name)?;
        let values: Vec<f64> = recent
            .iter()
            .filter_map(|row| row.get(idx)?.as_f64())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };

    Ok(Some(RawStats {
        games_played: Some(recent.len() as u32),
        fg_pct: column_mean("FG_PCT"),
        points_avg: column_mean("PTS"),
        rebounds_avg: column_mean("REB"),
        assists_avg: column_mean("AST"),
        turnovers_avg: column_mean("TOV"),
        point_diff: column_mean("PLUS_MINUS"),
    }))
}
