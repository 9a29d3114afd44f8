use crate::web::{handlers, AppState};
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn start_web_server<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // === SCHEDULER ROUTES ===
        .route("/api/scheduler/run", post(handlers::trigger_run))
        .route("/api/scheduler/status", get(handlers::get_scheduler_status))
        .route("/api/scheduler/start", post(handlers::start_scheduler))
        .route("/api/scheduler/stop", post(handlers::stop_scheduler))
        // === BANNER ROUTES ===
        .route("/api/banner/status", get(handlers::get_banner_status))
        .route("/api/banner/config", get(handlers::get_banner_config))
        // === LIVENESS ===
        .route("/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
