mod cache;
mod catalog;
mod config;
mod error;
mod pipeline;
mod prompt;
mod rate_limit;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use grounding::Grounder;
use mcp_common::openai::{OpenAiClient, OpenAiClientConfig};
use mcp_common::redis::RedisCache;

use cache::SnapshotCache;
use catalog::CatalogSource;
use config::Config;
use pipeline::{Concierge, TurnSettings};
use rate_limit::RateLimiter;
use server::ConciergeServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting concierge MCP server");

    let config = Config::from_env()?;
    info!(
        model = %config.model,
        restaurants = config.limits.restaurants,
        dishes = config.limits.dishes,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    let redis_cache = RedisCache::new(config.redis_url.as_deref());
    if redis_cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without snapshot cache");
    }
    let cache = SnapshotCache::new(redis_cache, config.snapshot_ttl_secs);

    let openai_config = OpenAiClientConfig::from_env();
    info!(
        base_url = %openai_config.base_url,
        timeout_ms = openai_config.default_timeout.as_millis(),
        max_retries = openai_config.max_retries,
        "openai client configured"
    );
    let chat = Arc::new(OpenAiClient::new(openai_config)?);

    let concierge = Arc::new(Concierge::new(
        CatalogSource::from_config(&config)?,
        cache,
        chat,
        Grounder::new(config.grounding()),
        TurnSettings {
            model: config.model.clone(),
            temperature: config.temperature,
            turn_timeout: config.turn_timeout,
            history_limit: config.history_limit,
            limits: config.limits.clone(),
        },
    ));
    let server = ConciergeServer::new(concierge, RateLimiter::new(config.rate_limit_rps));

    if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
