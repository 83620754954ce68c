use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod chains;
mod config;
mod constants;
mod error;
mod integrations;
mod models;
mod services;
#[cfg(test)]
mod test_support;
mod utils;

use config::Config;
use constants::API_VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "staking_dashboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting staking dashboard backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);

    // Registry problems are fatal here
    let app_state = api::AppState::from_config(config.clone()).await?;

    // Start background services
    services::start_background_services(
        &config,
        app_state.prices.clone(),
        app_state.settings.clone(),
    )
    .await;

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Chain registry
        .route("/api/v1/chains", get(api::chains::list_chains))
        .route(
            "/api/v1/chains/{chain}/address/{address}",
            get(api::chains::get_chain_address),
        )
        // Staking
        .route(
            "/api/v1/chains/{chain}/delegations/{address}",
            get(api::staking::get_delegations),
        )
        .route(
            "/api/v1/chains/{chain}/validators",
            get(api::staking::get_validators),
        )
        .route(
            "/api/v1/chains/{chain}/fee",
            get(api::staking::get_fee_estimate),
        )
        // Prices
        .route("/api/v1/prices/{chain}", get(api::prices::get_price))
        // Balances
        .route("/api/v1/balances/{address}", get(api::balances::get_balances))
        .route(
            "/api/v1/balances/{address}/refresh",
            post(api::balances::refresh_balances),
        )
        // Chain settings
        .route(
            "/api/v1/settings/chains",
            get(api::settings::get_chain_settings),
        )
        .route(
            "/api/v1/settings/chains/toggle",
            post(api::settings::toggle_chain),
        )
        .route(
            "/api/v1/settings/chains/toggle-all",
            post(api::settings::toggle_all),
        )
        // Broadcast feedback
        .route("/api/v1/tx/classify", post(api::tx::classify_broadcast))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
