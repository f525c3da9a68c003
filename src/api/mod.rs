pub mod rate_limit;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::scoring::{RawStats, ScoringConfig};
use crate::service::{ComparisonQuery, ComparisonService};
use crate::teams::{self, Team};
use rate_limit::RateLimits;

pub const MAX_TEAM_NAME_CHARS: usize = 64;
pub const MAX_INJURY_NOTES: usize = 20;
pub const MAX_INJURY_NOTE_CHARS: usize = 200;
const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

pub struct AppState {
    pub service: ComparisonService,
    pub started_at: Instant,
    /// `None` disables rate limiting
    pub limits: Option<Arc<RateLimits>>,
}

/// Build the Axum router for the HTTP API.
pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/ready", get(ready_handler))
        .route("/health/live", get(live_handler))
        .route("/api/compare", post(compare_handler))
        .route("/api/teams", get(list_teams_handler))
        .route("/api/teams/:name", get(get_team_handler))
        .route("/api/matchups", get(list_matchups_handler).delete(clear_history_handler))
        .route("/api/matchups/:id", get(get_matchup_handler))
        .route("/api/cache", delete(clear_cache_handler))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CompareRequest {
    pub team1: String,
    pub team2: String,
    pub sport: String,
    #[serde(default)]
    pub context: Option<CompareContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompareContext {
    /// YYYY-MM-DD
    pub game_date: Option<String>,
    #[serde(default)]
    pub team1_injuries: Vec<String>,
    #[serde(default)]
    pub team2_injuries: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TeamParams {
    #[serde(default)]
    pub include_stats: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchupsParams {
    pub limit: Option<i64>,
    pub team: Option<String>,
}

/// Check a compare request and turn it into a normalized query.
pub fn validate_request(req: CompareRequest) -> Result<ComparisonQuery, ApiError> {
    let team1 = validate_team("team1", &req.team1)?;
    let team2 = validate_team("team2", &req.team2)?;
    if team1.to_lowercase() == team2.to_lowercase() {
        return Err(ApiError::BadRequest(format!(
            "team1 and team2 must be different teams (both are {})",
            team1
        )));
    }

    let sport = ScoringConfig::canonical_sport(&req.sport).ok_or_else(|| {
        let supported: Vec<&str> = ScoringConfig::supported_sports().collect();
        ApiError::BadRequest(format!(
            "Unsupported sport '{}'. Supported: {}",
            req.sport.trim(),
            supported.join(", ")
        ))
    })?;

    let context = req.context.unwrap_or_default();
    let game_date = match context.game_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ApiError::BadRequest(format!("game_date '{}' is not a YYYY-MM-DD date", raw))
        })?),
    };

    Ok(ComparisonQuery {
        team1,
        team2,
        sport: sport.to_string(),
        game_date,
        team1_injuries: validate_injuries("team1_injuries", context.team1_injuries)?,
        team2_injuries: validate_injuries("team2_injuries", context.team2_injuries)?,
    })
}

fn validate_team(field: &str, raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > MAX_TEAM_NAME_CHARS {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            field, MAX_TEAM_NAME_CHARS
        )));
    }
    Ok(teams::normalize_team_name(trimmed))
}

/// Blank notes are dropped; the rest are trimmed and length-checked.
fn validate_injuries(field: &str, notes: Vec<String>) -> Result<Vec<String>, ApiError> {
    let notes: Vec<String> = notes
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    if notes.len() > MAX_INJURY_NOTES {
        return Err(ApiError::BadRequest(format!(
            "{} accepts at most {} notes",
            field, MAX_INJURY_NOTES
        )));
    }
    if let Some(long) = notes.iter().find(|n| n.chars().count() > MAX_INJURY_NOTE_CHARS) {
        return Err(ApiError::BadRequest(format!(
            "{} note exceeds {} characters: '{}…'",
            field,
            MAX_INJURY_NOTE_CHARS,
            long.chars().take(30).collect::<String>()
        )));
    }
    Ok(notes)
}

fn history_limit(requested: Option<i64>) -> Result<i64, ApiError> {
    let limit = requested.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        )));
    }
    Ok(limit)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /api/compare
async fn compare_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = validate_request(req)?;
    info!("Compare request: {} vs {} ({})", query.team1, query.team2, query.sport);

    let outcome = state.service.compare(&query).await?;
    let cache_status = if outcome.cached { "HIT" } else { "MISS" };
    let mut headers = HeaderMap::new();
    headers.insert("x-cache", HeaderValue::from_static(cache_status));
    if let Some(id) = outcome.history_id.as_deref().and_then(|id| HeaderValue::from_str(id).ok()) {
        headers.insert("x-matchup-id", id);
    }
    Ok((headers, Json(outcome.comparison)))
}

/// GET /api/matchups?limit=20&team=lakers
async fn list_matchups_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MatchupsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = history_limit(params.limit)?;
    let team = params
        .team
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(teams::normalize_team_name);
    let rows = state.service.db().list_history(limit, team.as_deref())?;
    Ok(Json(rows))
}

/// DELETE /api/matchups
async fn clear_history_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.service.db().clear_history()?;
    info!("🧹 Cleared {} history entries", deleted);
    Ok(Json(json!({ "deleted": deleted })))
}

/// GET /api/matchups/:id
async fn get_matchup_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.service.db().get_history(&id)? {
        Some(entry) => Ok(Json(entry)),
        None => Err(ApiError::NotFound(format!("No matchup with id {}", id))),
    }
}

/// GET /api/teams
async fn list_teams_handler() -> impl IntoResponse {
    let all = teams::all();
    Json(json!({ "teams": all, "total": all.len() }))
}

#[derive(Debug, Serialize)]
struct TeamDetail {
    #[serde(flatten)]
    team: &'static Team,
    stats: Option<RawStats>,
    stats_source: Option<String>,
}

/// GET /api/teams/:name?include_stats=true
async fn get_team_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<TeamParams>,
) -> Result<impl IntoResponse, ApiError> {
    let team = teams::lookup(&name).ok_or_else(|| ApiError::NotFound(format!("Team '{}' not found", name)))?;
    let report = if params.include_stats {
        state.service.team_stats(team.name).await
    } else {
        None
    };
    let (stats, stats_source) = match report {
        Some(r) => (Some(r.stats), Some(r.source)),
        None => (None, None),
    };
    Ok(Json(TeamDetail {
        team,
        stats,
        stats_source,
    }))
}

/// DELETE /api/cache
async fn clear_cache_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let cleared = state.service.db().cache_clear()?;
    info!("🧹 Cleared {} cache entries", cleared);
    Ok(Json(json!({ "cleared": cleared })))
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, cache) = match state.service.db().cache_len() {
        Ok(entries) => ("ok", json!({ "status": "ok", "entries": entries })),
        Err(e) => {
            error!("Cache health check failed: {:#}", e);
            ("degraded", json!({ "status": "error", "entries": 0 }))
        }
    };
    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "cache": cache,
    }))
}

/// GET /health/ready: 503 until the database answers.
async fn ready_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.service.db().cache_len() {
        Ok(_) => Json(json!({ "status": "ready" })).into_response(),
        Err(e) => {
            error!("Readiness check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not_ready", "reason": "database unavailable" })),
            )
                .into_response()
        }
    }
}

/// GET /health/live
async fn live_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "alive",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::providers::{SocialProvider, StatsProvider, StatsReport};
    use crate::scoring::SocialPost;
    use crate::service::build_pipelines;
    use async_trait::async_trait;
    use std::time::Duration;

    fn request(team1: &str, team2: &str, sport: &str) -> CompareRequest {
        CompareRequest {
            team1: team1.into(),
            team2: team2.into(),
            sport: sport.into(),
            context: None,
        }
    }

    fn message(err: ApiError) -> String {
        match err {
            ApiError::BadRequest(m) => m,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request_is_normalized() {
        let mut req = request(" lakers ", "BOS", "NBA");
        req.context = Some(CompareContext {
            game_date: Some("2025-01-15".into()),
            team1_injuries: vec!["  Star Player - out ".into(), "   ".into()],
            team2_injuries: vec![],
        });
        let q = validate_request(req).unwrap();
        assert_eq!(q.team1, "Los Angeles Lakers");
        assert_eq!(q.team2, "Boston Celtics");
        assert_eq!(q.sport, "basketball");
        assert_eq!(q.game_date, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(q.team1_injuries, vec!["Star Player - out"]);
        assert!(q.team2_injuries.is_empty());
    }

    #[test]
    fn test_rejects_bad_team_names() {
        assert!(message(validate_request(request("  ", "heat", "nba")).unwrap_err()).contains("team1"));
        let long = "x".repeat(MAX_TEAM_NAME_CHARS + 1);
        assert!(message(validate_request(request("heat", &long, "nba")).unwrap_err()).contains("team2"));
        assert!(message(validate_request(request("dubs", "Golden State Warriors", "nba")).unwrap_err())
            .contains("different"));
    }

    #[test]
    fn test_rejects_unknown_sport() {
        let msg = message(validate_request(request("heat", "knicks", "curling")).unwrap_err());
        assert!(msg.contains("curling") && msg.contains("basketball"));
    }

    #[test]
    fn test_rejects_bad_context() {
        let mut req = request("heat", "knicks", "basketball");
        req.context = Some(CompareContext {
            game_date: Some("15/01/2025".into()),
            ..Default::default()
        });
        assert!(message(validate_request(req).unwrap_err()).contains("game_date"));

        let mut req = request("heat", "knicks", "basketball");
        req.context = Some(CompareContext {
            team2_injuries: vec!["x - out".into(); MAX_INJURY_NOTES + 1],
            ..Default::default()
        });
        assert!(message(validate_request(req).unwrap_err()).contains("team2_injuries"));

        let mut req = request("heat", "knicks", "basketball");
        req.context = Some(CompareContext {
            team1_injuries: vec!["y".repeat(MAX_INJURY_NOTE_CHARS + 1)],
            ..Default::default()
        });
        assert!(validate_request(req).is_err());
    }

    #[test]
    fn test_request_json_defaults() {
        let req: CompareRequest = serde_json::from_value(json!({
            "team1": "lakers", "team2": "celtics", "sport": "basketball",
            "context": {"game_date": null}
        }))
        .unwrap();
        let q = validate_request(req).unwrap();
        assert_eq!(q.game_date, None);
        assert!(q.team1_injuries.is_empty());
    }

    #[test]
    fn test_history_limit_bounds() {
        assert_eq!(history_limit(None).unwrap(), 20);
        assert_eq!(history_limit(Some(100)).unwrap(), 100);
        assert!(history_limit(Some(0)).is_err());
        assert!(history_limit(Some(101)).is_err());
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiError::BadRequest("x".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("x".into()).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    struct Offline;

    #[async_trait]
    impl StatsProvider for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        async fn fetch_recent_stats(&self, _team: &str, _as_of: Option<NaiveDate>) -> anyhow::Result<StatsReport> {
            anyhow::bail!("offline")
        }
    }

    #[async_trait]
    impl SocialProvider for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        async fn fetch_posts(&self, _team: &str, _limit: usize) -> anyhow::Result<Vec<SocialPost>> {
            Ok(vec![])
        }
    }

    fn state() -> Arc<AppState> {
        let service = ComparisonService::new(
            build_pipelines(None).unwrap(),
            Arc::new(Offline),
            Arc::new(Offline),
            Database::open_in_memory().unwrap(),
            Duration::from_secs(3600),
            Duration::from_secs(1),
            10,
        );
        Arc::new(AppState {
            service,
            started_at: Instant::now(),
            limits: None,
        })
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_compare_then_fetch_history_and_clear_cache() {
        let state = state();
        let resp = compare_handler(
            State(state.clone()),
            Ok(Json(request("heat", "knicks", "nba"))),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-cache"], "MISS");
        let id = resp.headers()["x-matchup-id"].to_str().unwrap().to_string();

        let rows = state.service.db().list_history(10, Some("Miami Heat")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        let found = get_matchup_handler(State(state.clone()), Path(rows[0].id.clone()))
            .await
            .into_response();
        assert_eq!(found.status(), StatusCode::OK);

        let missing = get_matchup_handler(State(state.clone()), Path("nope".into()))
            .await
            .into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        assert_eq!(state.service.db().cache_len().unwrap(), 1);
        let cleared = clear_cache_handler(State(state.clone())).await.into_response();
        assert_eq!(cleared.status(), StatusCode::OK);
        assert_eq!(state.service.db().cache_len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_compare_rejects_invalid_request() {
        let resp = compare_handler(State(state()), Ok(Json(request("heat", "heat", "nba"))))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_teams_listing_and_lookup() {
        let all = body_json(list_teams_handler().await.into_response()).await;
        assert_eq!(all["total"], 30);
        assert_eq!(all["teams"].as_array().unwrap().len(), 30);

        let resp = get_team_handler(State(state()), Path("dubs".into()), Query(TeamParams::default()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let team = body_json(resp).await;
        assert_eq!(team["name"], "Golden State Warriors");
        assert_eq!(team["abbreviation"], "GSW");
        assert_eq!(team["subreddit"], "warriors");
        assert!(team["stats"].is_null());

        // Stats provider is offline: the team still resolves, stats stay empty
        let resp = get_team_handler(
            State(state()),
            Path("LAL".into()),
            Query(TeamParams { include_stats: true }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_json(resp).await["stats_source"].is_null());

        let missing = get_team_handler(State(state()), Path("sonics".into()), Query(TeamParams::default()))
            .await
            .into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let state = state();
        compare_handler(State(state.clone()), Ok(Json(request("heat", "knicks", "nba"))))
            .await
            .into_response();
        let resp = clear_history_handler(State(state.clone())).await.into_response();
        assert_eq!(body_json(resp).await["deleted"], 1);
        assert!(state.service.db().list_history(10, None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_liveness_and_readiness() {
        let live = body_json(live_handler(State(state())).await.into_response()).await;
        assert_eq!(live["status"], "alive");
        let ready = ready_handler(State(state())).await;
        assert_eq!(ready.status(), StatusCode::OK);
        assert_eq!(body_json(ready).await["status"], "ready");
    }

    #[tokio::test]
    async fn test_router_enforces_rate_limit_per_client() {
        let limited = AppState {
            service: ComparisonService::new(
                build_pipelines(None).unwrap(),
                Arc::new(Offline),
                Arc::new(Offline),
                Database::open_in_memory().unwrap(),
                Duration::from_secs(3600),
                Duration::from_secs(1),
                10,
            ),
            started_at: Instant::now(),
            limits: Some(Arc::new(RateLimits::new())),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router(limited)).await.unwrap() });

        let http = reqwest::Client::new();
        let url = format!("http://{}/api/matchups", addr);
        let get = |ip: &'static str| http.get(&url).header("x-forwarded-for", ip).send();

        let quota = rate_limit::EndpointGroup::History.per_minute();
        for _ in 0..quota {
            assert_eq!(get("203.0.113.7").await.unwrap().status(), 200);
        }
        let refused = get("203.0.113.7").await.unwrap();
        assert_eq!(refused.status(), 429);
        assert!(refused.headers().contains_key("retry-after"));

        assert_eq!(get("203.0.113.8").await.unwrap().status(), 200);
        let live = http
            .get(format!("http://{}/health/live", addr))
            .header("x-forwarded-for", "203.0.113.7")
            .send()
            .await
            .unwrap();
        assert_eq!(live.status(), 200);
    }
}
