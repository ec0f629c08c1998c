//! Shelter API Gateway
//!
//! The HTTP surface of the shelter service.
//! Handles:
//! - Session decoding and role checks (through the services)
//! - Form actions for staff workflows and adoption applications
//! - Public pet listings and likes
//! - Rate limiting
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    extract::{DefaultBodyLimit, FromRef, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use shelter_common::{
    auth::JwtManager,
    cache::{Cache, CacheRevalidator, NoopRevalidator, Revalidate},
    config::AppConfig,
    db::DbPool,
    metrics::{self, LATENCY_BUCKETS, METRICS_PREFIX},
    storage::ImageStore,
    MemoryStore, Repository, Services, ShelterStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Services,
    pub jwt: Arc<JwtManager>,
    pub cache: Option<Arc<Cache>>,
    pub metrics: Option<PrometheusHandle>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl AppState {
    /// Wire services over a store and optional cache
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn ShelterStore>,
        cache: Option<Arc<Cache>>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let revalidator: Arc<dyn Revalidate> = match &cache {
            Some(cache) => Arc::new(CacheRevalidator::new(cache.clone())),
            None => Arc::new(NoopRevalidator),
        };
        let images = ImageStore::new(&config.storage);
        let jwt = Arc::new(JwtManager::new(
            &config.auth.jwt_secret,
            config.auth.jwt_expiration_secs,
        ));

        Self {
            services: Services::new(store, revalidator, cache.clone(), images),
            config,
            jwt,
            cache,
            metrics,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config);
    info!(
        service = %config.observability.service_name,
        env = %std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        "Starting Shelter API Gateway v{}",
        shelter_common::VERSION
    );

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        let handle = install_prometheus(&config)?;
        metrics::register_metrics();
        Some(handle)
    } else {
        None
    };

    let store = connect_store(&config).await?;

    let cache = match Cache::from_config(&config.redis).await {
        Ok(cache) => cache.map(Arc::new),
        Err(e) => {
            warn!(error = %e, "Redis unavailable, serving without view cache");
            None
        }
    };

    let state = AppState::new(config.clone(), store, cache, metrics_handle);

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.observability.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logging {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn install_prometheus(config: &AppConfig) -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .add_global_label("service", config.observability.service_name.clone())
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .install_recorder()?;
    Ok(handle)
}

/// Postgres through the repository, or the in-memory store for `memory://`
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ShelterStore>> {
    if config.uses_memory_store() {
        warn!("Using the in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    info!("Connecting to database...");
    let pool = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        pool.migrate().await?;
    }
    Ok(Arc::new(Repository::new(pool)))
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        // Public listing
        .route("/pets", get(handlers::pets::list_pets))
        .route("/pets/{id}", get(handlers::pets::get_pet))
        .route(
            "/pets/{id}/like",
            post(handlers::likes::like_pet).delete(handlers::likes::unlike_pet),
        )
        .route("/me/likes", get(handlers::likes::my_likes))

        // Animal records
        .route("/animals", post(handlers::animals::create_animal))
        .route(
            "/animals/{id}",
            get(handlers::animals::get_animal).patch(handlers::animals::update_animal),
        )
        .route("/animals/{id}/listing-status", put(handlers::animals::set_listing_status))
        .route("/animals/{id}/images", post(handlers::animals::upload_image))
        .route("/animals/{id}/images/{image_id}", delete(handlers::animals::delete_image))
        .route("/animals/{id}/characteristics", put(handlers::animals::replace_characteristics))
        .route(
            "/animals/{id}/outcome",
            post(handlers::outcomes::create_outcome).get(handlers::outcomes::get_outcome),
        )

        // Tasks
        .route(
            "/animals/{id}/tasks",
            post(handlers::tasks::create_task).get(handlers::tasks::list_animal_tasks),
        )
        .route("/animals/{id}/tasks/{task_id}", delete(handlers::tasks::delete_task))
        .route("/animals/{id}/tasks/{task_id}/status", patch(handlers::tasks::update_task_status))
        .route("/animals/{id}/tasks/{task_id}/restore", post(handlers::tasks::restore_task))
        .route("/tasks", get(handlers::tasks::task_dashboard))
        .route("/tasks/{task_id}/assignee", patch(handlers::tasks::update_task_assignee))

        // Notes
        .route(
            "/animals/{id}/notes",
            post(handlers::notes::create_note).get(handlers::notes::list_notes),
        )
        .route(
            "/animals/{id}/notes/{note_id}",
            patch(handlers::notes::update_note).delete(handlers::notes::delete_note),
        )
        .route("/animals/{id}/notes/{note_id}/restore", post(handlers::notes::restore_note))

        // Assessments
        .route(
            "/animals/{id}/assessments",
            post(handlers::assessments::create_assessment).get(handlers::assessments::list_assessments),
        )
        .route(
            "/assessment-templates",
            post(handlers::assessments::create_template).get(handlers::assessments::list_templates),
        )
        .route("/assessment-templates/{id}", get(handlers::assessments::get_template))

        // Characteristics
        .route(
            "/characteristics",
            get(handlers::characteristics::list_catalog).post(handlers::characteristics::create_characteristic),
        )

        // Adoption applications
        .route(
            "/applications",
            post(handlers::applications::submit_application).get(handlers::applications::list_applications),
        )
        .route("/applications/{id}", get(handlers::applications::get_application))
        .route("/applications/{id}/status", patch(handlers::applications::update_status))
        .route("/applications/{id}/withdraw", post(handlers::applications::withdraw))
        .route("/applications/{id}/reactivate", post(handlers::applications::reactivate))

        // Staff dashboard
        .route("/dashboard/summary", get(handlers::dashboard::summary));

    if config.rate_limit.enabled {
        let limiter = middleware::create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );
        api_routes = api_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Compose the app
    let mut app = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(render_metrics))
        .nest("/v1", api_routes);

    let uploads = config.storage.public_base_url.trim_end_matches('/');
    if uploads.starts_with('/') && uploads.len() > 1 {
        app = app.nest_service(uploads, ServeDir::new(&config.storage.upload_dir));
    }

    app.layer(axum::middleware::from_fn(middleware::track_requests))
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Prometheus scrape endpoint
async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => ([(CONTENT_TYPE, "text/plain; version=0.0.4")], handle.render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
