//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every resource
//! - Wire up middleware in pipeline order
//! - Bind server to listener, shut down on Ctrl-C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use sqlx::SqlitePool;
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::config::AppConfig;
use crate::http::request::make_request_span;
use crate::observability::{metrics::track_metrics, request_log_middleware, RequestLog};
use crate::security::{
    access_window_middleware, authenticate, rate_limit_middleware, role_check_middleware, AccessWindow,
    RateLimiter, RoleGuard,
};

/// Application state injected into handlers.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

/// HTTP server for the messaging API.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and database pool.
    pub fn new(config: AppConfig, db: SqlitePool) -> Self {
        let config = Arc::new(config);
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.rate_limit)));

        let state = AppState {
            db,
            config: config.clone(),
        };

        let router = Self::build_router(&config, state, rate_limiter.clone());
        Self {
            router,
            config,
            rate_limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Requests pass, in order: request id → trace → timeout → metrics →
    /// authentication → request log → access window → rate limit → handler.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState, rate_limiter: Option<Arc<RateLimiter>>) -> Router {
        let mut users = api::users::router();
        if config.roles.enabled {
            let guard = RoleGuard::new(config.roles.allowed_roles.clone());
            users = users.route_layer(from_fn_with_state(guard, role_check_middleware));
        }

        let mut router = Router::new()
            .route("/health", get(api::health::health))
            .merge(api::conversations::router())
            .merge(api::messages::router())
            .merge(users)
            .with_state(state.clone());

        if let Some(limiter) = rate_limiter {
            router = router.layer(from_fn_with_state(limiter, rate_limit_middleware));
        }
        if config.access_window.enabled {
            let window = AccessWindow::from_config(&config.access_window);
            router = router.layer(from_fn_with_state(window, access_window_middleware));
        }
        if config.request_log.enabled {
            let log = Arc::new(RequestLog::new(&config.request_log.path));
            router = router.layer(from_fn_with_state(log, request_log_middleware));
        }

        router
            .layer(from_fn_with_state(state.db, authenticate))
            .layer(from_fn(track_metrics))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for serving or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit = self.config.rate_limit.enabled,
            access_window = self.config.access_window.enabled,
            request_log = self.config.request_log.enabled,
            "HTTP server starting"
        );

        let sweeper = self.rate_limiter.clone().map(spawn_sweeper);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Periodically drop rate-limiter entries for idle clients.
fn spawn_sweeper(limiter: Arc<RateLimiter>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(limiter.window());
        loop {
            ticker.tick().await;
            limiter.sweep(Instant::now());
            tracing::debug!(clients = limiter.tracked_clients(), "Rate limiter swept");
        }
    })
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
