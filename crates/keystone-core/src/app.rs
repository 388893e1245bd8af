use std::future::Future;
use std::net::SocketAddr;

use axum::extract::{Request, State};
use axum::http::{HeaderName, StatusCode};
use axum::routing::get;
use axum::{Router, middleware};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::alarm::{AlarmError, AlarmHandle};
use crate::auth::AccessGate;
use crate::cache::CacheService;
use crate::config::{Config, ConfigError};
use crate::context::locale_layer;
use crate::controllers::{self, AppState};
use crate::error::{AppError, error_envelope_layer};
use crate::extractors::MaybeUser;
use crate::migrations::Migrator;
use crate::openapi::ApiDoc;
use crate::response::ApiResponse;

pub const API_DOCS_PATH: &str = "/api-docs";
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";
const BODY_LIMIT_BYTES: usize = 1024 * 1024;
const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Alarm(#[from] AlarmError),

    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),
}

/// The Keystone application.
pub struct App {
    state: AppState,
}

impl App {
    /// Load config from the environment and start everything it names.
    pub async fn new() -> Result<Self, StartupError> {
        Self::with_config(Config::from_env()?).await
    }

    /// Start with a given config: cache and alarm channel chosen from it.
    pub async fn with_config(config: Config) -> Result<Self, StartupError> {
        let cache = Self::init_cache(&config).await;
        let alarm = AlarmHandle::from_config(config.telegram.as_ref())?;
        Self::with_parts(config, cache, alarm).await
    }

    /// Start with an explicit cache and alarm handle. Connects the database
    /// and applies pending migrations.
    pub async fn with_parts(
        config: Config,
        cache: CacheService,
        alarm: AlarmHandle,
    ) -> Result<Self, StartupError> {
        let db = crate::db::connect(&config).await?;

        tracing::info!("Running pending database migrations...");
        Migrator::up(&db, None).await?;
        tracing::info!("Migrations complete.");

        Ok(App {
            state: AppState::new(config, db, cache, alarm),
        })
    }

    /// Redis when configured and reachable, in-memory otherwise.
    async fn init_cache(config: &Config) -> CacheService {
        #[cfg(feature = "redis")]
        if let Some(ref redis_url) = config.redis_url {
            match crate::cache::RedisCache::new(redis_url).await {
                Ok(redis_cache) => {
                    tracing::info!("Redis cache connected");
                    return CacheService::new(redis_cache);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Redis connection failed, falling back to in-memory cache");
                }
            }
        }
        #[cfg(not(feature = "redis"))]
        if config.redis_url.is_some() {
            tracing::warn!("REDIS_URL is set but the `redis` feature is off; using in-memory cache");
        }
        tracing::info!("Using in-memory cache");
        CacheService::in_memory()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Build the full router with middleware.
    ///
    /// Layers, outermost first: request id, trace span, locale resolution,
    /// error envelope, body limit, request timeout.
    pub fn router(&self) -> Router {
        let state = self.state.clone();
        let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

        let api = Router::new()
            .route(
                "/health",
                get(health).route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    AccessGate::optional().middleware(),
                )),
            )
            .nest("/api/v1/auth", controllers::auth::routes())
            .nest("/api/v1", controllers::users::routes(&state))
            .with_state(state.clone());

        Router::new()
            .merge(api)
            .merge(Scalar::with_url(API_DOCS_PATH, ApiDoc::openapi()))
            .route(OPENAPI_JSON_PATH, get(|| async { axum::Json(ApiDoc::openapi()) }))
            .fallback(not_found)
            .layer(TimeoutLayer::new(state.config.request_timeout))
            .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
            .layer(middleware::from_fn_with_state(state, error_envelope_layer))
            .layer(middleware::from_fn(locale_layer))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &Request| {
                        let request_id = req
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id,
                        )
                    })
                    .on_response(
                        DefaultOnResponse::new()
                            .level(tracing::Level::INFO)
                            .latency_unit(LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<(), StartupError> {
        let listener = TcpListener::bind(self.config().server_addr()).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr()?;
        let config = self.config();
        tracing::info!(
            app = %config.app_name,
            environment = config.environment.as_str(),
            "server running on http://{addr} (docs at {API_DOCS_PATH})"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down Keystone server...");
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

/// Liveness plus a database round trip. Names the caller when they hold a
/// live session.
async fn health(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<ApiResponse<Health>, AppError> {
    state.db.ping().await?;
    Ok(ApiResponse::ok().with_data(Health {
        status: "ok",
        version: state.config.app_version.clone(),
        user_id: user.as_ref().map(|u| u.id),
        role: user.map(|u| u.role),
    }))
}

async fn not_found() -> AppError {
    AppError::Http(StatusCode::NOT_FOUND)
}
