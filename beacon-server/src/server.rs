use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
    time::Duration,
};

use anyhow::Context;
use axum::{
    Extension, Router,
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::get,
    serve,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shared::config::server::{Config, DatabaseConfig};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::{
    app_state::AppState,
    db::bootstrap,
    middleware::{
        auth::{PrincipalState, require_principal},
        request_context::{self, RequestIdState},
    },
    routes::{self, openapi::openapi_routes},
    services::{MemoryNotificationStore, PgNotificationStore, SharedNotificationStore},
    telemetry, tracer,
};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn metrics_handle() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn metrics_endpoint(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        handle.render(),
    )
}

/// Opens the connection pool.
///
/// # Errors
/// Returns an error if the database cannot be reached.
pub async fn create_database_pool(db: &DatabaseConfig) -> Result<sqlx::PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&db.url)
        .await?;
    metrics::gauge!("db_pool_max_connections").set(f64::from(db.max_connections));
    Ok(pool)
}

/// Connects to PostgreSQL, bootstraps the schema when enabled and verifies readiness.
///
/// # Errors
/// Returns an error if any of those steps fail.
pub async fn create_pg_store(db: &DatabaseConfig) -> anyhow::Result<SharedNotificationStore> {
    let pool = create_database_pool(db)
        .await
        .context("failed to connect to the notification database")?;
    bootstrap::ensure_liveness(&pool)
        .await
        .context("database liveness check failed")?;

    if db.bootstrap {
        bootstrap::run(&pool).await?;
    }

    bootstrap::ensure_readiness(&pool)
        .await
        .context("notifications table is missing; enable database.bootstrap or create it")?;

    Ok(Arc::new(PgNotificationStore::new(pool)))
}

/// CORS for browser consumers. Credentials are only honoured with an explicit origin list.
pub fn create_cors_layer(config: &Config) -> CorsLayer {
    use http::Method;

    let cors_config = &config.server.cors;
    let cors = CorsLayer::new()
        .allow_methods(AllowMethods::list([Method::GET, Method::POST, Method::OPTIONS]))
        .max_age(Duration::from_secs(cors_config.max_age_seconds));

    if cors_config.allowed_origins.is_empty() {
        return cors
            .allow_origin(AllowOrigin::any())
            .allow_headers(AllowHeaders::any());
    }

    let origins = cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    cors.allow_origin(AllowOrigin::list(origins))
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(cors_config.allow_credentials)
}

/// Builds the full application router: `/api` behind principal resolution, probes, metrics and the
/// OpenAPI document, all wrapped in request-id, tracing and CORS layers.
pub fn create_app_router(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let config = Arc::clone(&state.config);

    let api_router = routes::notifications::create_router_notifications().route_layer(
        middleware::from_fn_with_state(PrincipalState::from_config(&config), require_principal),
    );

    Router::new()
        .nest("/api", api_router)
        .merge(routes::health::create_health_router())
        .route("/metrics", get(metrics_endpoint))
        .merge(openapi_routes())
        .with_state(state)
        .layer(Extension(metrics_handle))
        .layer(create_cors_layer(&config))
        .layer(tracer::create_trace_layer())
        .layer(middleware::from_fn_with_state(
            RequestIdState::from_config(&config),
            request_context::assign_request_id,
        ))
}

/// Resolves on Ctrl-C or when `shutdown` is cancelled elsewhere, then cancels `shutdown` so every
/// open stream ends and graceful shutdown can complete.
pub async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!(error = %err, "failed to listen for Ctrl-C; waiting for explicit shutdown");
                shutdown.cancelled().await;
            }
        }
        () = shutdown.cancelled() => {}
    }
    info!("Shutting down...");
    shutdown.cancel();
}

/// Starts the server on `config.server.port`.
///
/// # Errors
/// Returns an error if the store cannot be initialized or the listener fails.
pub async fn run(config: Config, in_memory: bool) -> anyhow::Result<()> {
    telemetry::init(&config.logging);
    info!(profile = ?config.profile, in_memory, "Starting server...");

    let metrics_handle = metrics_handle();
    let config = Arc::new(config);

    let store: SharedNotificationStore = if in_memory {
        warn!("using the in-memory notification store; rows are lost on restart");
        Arc::new(MemoryNotificationStore::new())
    } else {
        create_pg_store(&config.database).await?
    };

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(store, Arc::clone(&config), &shutdown));
    let app = create_app_router(state, metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}
