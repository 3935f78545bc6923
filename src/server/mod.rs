//! HTTP server wiring

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::{normalize_error_response, require_admin, SanitizedMakeSpan};
use crate::provider::NylasClient;
use crate::repository::grant::GrantRepositoryImpl;
use crate::repository::DbPool;
use crate::service::{AuthorizationFlow, DispatchService, GrantGate, GrantService, MailboxService};
use crate::state::HasGrants;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// JSON bodies carry base64 attachments
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: DbPool,
    pub grant_service: Arc<GrantService<GrantRepositoryImpl>>,
    pub authorization_flow: Arc<AuthorizationFlow<GrantRepositoryImpl, NylasClient>>,
    pub grant_gate: Arc<GrantGate<GrantRepositoryImpl>>,
    pub dispatch_service: Arc<DispatchService<GrantRepositoryImpl, NylasClient>>,
    pub mailbox_service: Arc<MailboxService<NylasClient>>,
}

impl AppState {
    /// Wire services over an existing pool
    pub fn new(config: Config, db_pool: DbPool) -> Result<Self> {
        let nylas = Arc::new(
            NylasClient::new(config.nylas.clone()).context("Failed to create Nylas client")?,
        );
        let grant_repo = Arc::new(GrantRepositoryImpl::new(db_pool.inner().clone()));

        let grant_service = Arc::new(GrantService::new(grant_repo));
        let authorization_flow = Arc::new(AuthorizationFlow::new(
            nylas.clone(),
            grant_service.clone(),
            config.nylas.clone(),
            config.gate.fallback_user_id.clone(),
        ));
        let grant_gate = Arc::new(GrantGate::new(
            grant_service.clone(),
            config.gate.fallback_user_id.clone(),
            config.link_base(),
        ));
        let dispatch_service = Arc::new(DispatchService::new(
            grant_gate.clone(),
            nylas.clone(),
            config.dispatch.clone(),
        ));
        let mailbox_service = Arc::new(MailboxService::new(nylas, &config.nylas));

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            grant_service,
            authorization_flow,
            grant_gate,
            dispatch_service,
            mailbox_service,
        })
    }
}

impl HasGrants for AppState {
    type Repo = GrantRepositoryImpl;
    type Provider = NylasClient;

    fn config(&self) -> &Config {
        &self.config
    }

    fn grant_service(&self) -> &GrantService<Self::Repo> {
        &self.grant_service
    }

    fn authorization_flow(&self) -> &AuthorizationFlow<Self::Repo, Self::Provider> {
        &self.authorization_flow
    }

    fn grant_gate(&self) -> &GrantGate<Self::Repo> {
        &self.grant_gate
    }

    fn dispatch_service(&self) -> &DispatchService<Self::Repo, Self::Provider> {
        &self.dispatch_service
    }

    fn mailbox_service(&self) -> &MailboxService<Self::Provider> {
        &self.mailbox_service
    }

    async fn check_ready(&self) -> bool {
        self.db_pool.ping().await
    }
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    info!("Connected to database");

    let http_addr = config.http_addr();
    let state = AppState::new(config, DbPool::new(pool))?;
    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router with generic state type
///
/// Generic over the state so integration tests can drive the same routes
/// with in-memory stores and a mocked provider.
pub fn build_router<S: HasGrants>(state: S) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Grant administration, behind the admin bearer key
    let admin_routes = Router::new()
        .route("/api/v1/grants", get(api::grant::list::<S>))
        .route(
            "/api/v1/grants/{user_id}",
            get(api::grant::get::<S>).delete(api::grant::delete::<S>),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_admin::<S>,
        ));

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .route("/api", get(api::health::api_info))
        // Consent round trip
        .route("/nylas/auth", get(api::nylas::auth::<S>))
        .route("/oauth/exchange", get(api::nylas::exchange::<S>))
        // Gated provider operations
        .route("/nylas/send-email", post(api::nylas::send_email::<S>))
        .route("/nylas/sent-emails", get(api::nylas::sent_emails::<S>))
        .route("/api/emails", get(api::nylas::recent_emails::<S>))
        .merge(admin_routes)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(normalize_error_response))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(cors)
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
