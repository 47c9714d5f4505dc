//! Route definitions and server setup

use super::handlers::{get_cves, health, AppState};
use super::models::{CveResponse, FETCH_FAILED_MESSAGE};
use crate::config::ServerConfig;
use crate::error::Result;
use axum::{
    error_handling::HandleErrorLayer,
    http::{HeaderValue, Method, StatusCode},
    routing::get,
    BoxError, Json, Router,
};
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/api/cve/{keyword}", get(get_cves))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http());

    if config.request_timeout_seconds > 0 {
        router = router.layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(Duration::from_secs(config.request_timeout_seconds)),
        );
    }

    router
}

/// Keeps the JSON error body when the timeout layer cuts a request short.
async fn handle_middleware_error(err: BoxError) -> (StatusCode, Json<CveResponse>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("request timed out");
    } else {
        tracing::error!(error = %err, "unhandled middleware error");
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(CveResponse::error(FETCH_FAILED_MESSAGE)),
    )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .max_age(Duration::from_secs(3600))
}

/// Serves `router` on `listener` until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
