//! JSON-RPC gateway — routes wallet calls between a public node and a
//! private tx-manager, intercepting `eth_sendRawTransaction`,
//! `eth_getTransactionCount`, `eth_call`, and `net_version`.

mod blacklist;
mod config;
mod error;
mod nonce_store;
mod pipeline;
mod policy;
mod protection;
mod state;
mod tx;
mod types;
mod upstream;
mod writer;

use axum::routing::post;
use axum::Router;
use config::Config;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let bind_addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let body_read_timeout = Duration::from_secs(config.body_read_timeout_secs);

    info!(
        default_upstream = %config.default_upstream_url,
        tx_manager = %config.tx_manager_url,
        bind = %bind_addr,
        "starting gateway"
    );

    let state = Arc::new(AppState {
        client: reqwest::Client::new(),
        config,
    });

    let app = Router::new()
        .route("/", post(pipeline::handle))
        .layer(TimeoutLayer::new(body_read_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
