use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod chains;
mod config;
mod constants;
mod crypto;
mod error;
mod models;
mod rpc;
mod services;
mod storage;
mod utils;

use config::Config;
use constants::API_VERSION;
use rpc::EvmRpcClient;
use storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_checker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting wallet checker");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    tracing::info!(
        "RPC timeout {}s, {} attempt(s), backoff base {}ms",
        config.rpc_timeout_secs,
        config.rpc_max_retries,
        config.rpc_backoff_base_ms
    );

    let storage = Storage::from_config(&config).await?;
    let query = Arc::new(EvmRpcClient::new(config.rpc_timeout())?);
    let app_state = api::AppState::new(config.clone(), storage, query)?;

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
        // Chain registry & RPC overrides
        .route("/api/v1/chains", get(api::chains::list_chains))
        .route(
            "/api/v1/rpc/configs",
            get(api::rpc::list_configs).post(api::rpc::create_config),
        )
        .route("/api/v1/rpc/configs/reset", post(api::rpc::reset_configs))
        .route(
            "/api/v1/rpc/configs/{id}",
            put(api::rpc::update_config).delete(api::rpc::delete_config),
        )
        // Saved wallets
        .route("/api/v1/wallets", get(api::wallets::list_wallets))
        .route("/api/v1/wallets/import", post(api::wallets::import_wallets))
        .route("/api/v1/wallets/{index}", delete(api::wallets::delete_wallet))
        // Wallet files
        .route(
            "/api/v1/files",
            get(api::files::list_files).post(api::files::upload_files),
        )
        .route("/api/v1/files/compare", post(api::files::compare_files))
        .route(
            "/api/v1/files/{id}",
            get(api::files::get_file).delete(api::files::delete_file),
        )
        .route("/api/v1/files/{id}/download", get(api::files::download_file))
        .route("/api/v1/files/{id}/select", post(api::files::select_file))
        // Balance / usage checks
        .route("/api/v1/check/start", post(api::check::start_check))
        .route(
            "/api/v1/check/{id}",
            get(api::check::get_check).delete(api::check::delete_check),
        )
        .route("/api/v1/check/{id}/cancel", post(api::check::cancel_check))
        .route("/api/v1/check/{id}/results", get(api::check::get_results))
        .route("/api/v1/check/{id}/statistics", get(api::check::get_statistics))
        .route("/api/v1/check/{id}/export", get(api::check::export_check))
        .route("/api/v1/check/{id}/save", post(api::check::save_check))
        // Targets
        .route("/api/v1/targets/match", post(api::targets::match_targets))
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
