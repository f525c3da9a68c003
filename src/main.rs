use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

mod api;
mod config;
mod db;
mod providers;
mod scoring;
mod service;
mod teams;

use api::rate_limit::RateLimits;
use api::AppState;
use config::Config;
use db::Database;
use providers::{NbaStatsClient, RedditClient};
use service::ComparisonService;

/// How often expired cache rows are swept.
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let pipelines = service::build_pipelines(config.sigmoid_scale)?;
    info!(
        "🏀 Scoring profiles loaded: {}",
        pipelines.keys().copied().collect::<Vec<_>>().join(", ")
    );

    let stats = NbaStatsClient::new(&config.stats_api_url, config.recent_games, config.fetch_timeout())?;
    // The client splits this budget across its retries
    let social = RedditClient::new(
        &config.reddit_base_url,
        &config.reddit_user_agent,
        config.fetch_timeout(),
    )?;
    info!(
        "Providers: stats={} (last {} games), social={} ({} posts/team)",
        config.stats_api_url, config.recent_games, config.reddit_base_url, config.posts_per_team
    );

    let service = ComparisonService::new(
        pipelines,
        Arc::new(stats),
        Arc::new(social),
        db.clone(),
        config.cache_ttl(),
        config.fetch_timeout(),
        config.posts_per_team,
    );

    let limits = config.rate_limit.then(|| Arc::new(RateLimits::new()));
    if limits.is_none() {
        warn!("Rate limiting disabled");
    }

    // Background cache and rate-limit sweep
    let sweep_limits = limits.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match db.purge_expired_cache() {
                Ok(0) => {}
                Ok(n) => info!("Purged {} expired cache entries", n),
                Err(e) => warn!("Cache purge failed: {:#}", e),
            }
            if let Some(limits) = &sweep_limits {
                limits.retain_recent();
            }
        }
    });

    let app = api::router(AppState {
        service,
        started_at: Instant::now(),
        limits,
    });
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen_addr))?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server (blocks until shutdown)
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
