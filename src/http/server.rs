//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request id, tracing, timeout, body limit)
//! - Spawn workflows and register them as sessions
//! - Serve until the shutdown signal fires

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::admin;
use crate::config::AppConfig;
use crate::http::{names, students, treasury};
use crate::orchestrator::{
    ActionStatus, ActionTracker, Orchestrator, RegistrationProgress, RegistrationRequest,
    RegistrationWorkflow, SessionRegistry,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub registrations: SessionRegistry<RegistrationProgress>,
    pub actions: SessionRegistry<ActionStatus>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, orchestrator: Orchestrator) -> Self {
        let capacity = config.sessions.max_sessions;
        Self {
            orchestrator,
            registrations: SessionRegistry::new("registration", capacity),
            actions: SessionRegistry::new("action", capacity),
            config,
        }
    }

    /// Run an action in the background and return its id.
    pub fn spawn_action<F, Fut>(&self, tracker: ActionTracker, run: F) -> Uuid
    where
        F: FnOnce(Orchestrator, ActionTracker) -> Fut,
        Fut: Future<Output = ActionStatus> + Send + 'static,
    {
        let action = tracker.action();
        let id = self.actions.insert(tracker.subscribe());
        let task = run(self.orchestrator.clone(), tracker);
        tokio::spawn(async move {
            let status = task.await;
            tracing::info!(
                action_id = %id,
                action = action.label(),
                state = ?status.state,
                "Action finished"
            );
        });
        id
    }

    /// Run a registration in the background and return its session id.
    pub fn spawn_registration(&self, request: RegistrationRequest) -> Uuid {
        let workflow = RegistrationWorkflow::new(
            self.orchestrator.clone(),
            self.config.registration.oracle_wait_secs,
            &request.card_uid,
        );
        let id = self.registrations.insert(workflow.subscribe());
        tokio::spawn(async move {
            let progress = workflow.run(request).await;
            tracing::info!(
                session_id = %id,
                card_uid = %progress.card_uid,
                stage = progress.stage.label(),
                "Registration finished"
            );
        });
        id
    }
}

/// HTTP server for the student service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: Arc<AppConfig>, orchestrator: Orchestrator) -> Self {
        let state = AppState::new(config.clone(), orchestrator);
        let router = Self::build_router(&config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/health", get(health))
            .route("/api/students/{card_uid}", get(students::profile))
            .route("/api/students/{card_uid}/register", post(students::register))
            .route("/api/registrations/{id}", get(students::registration))
            .route(
                "/api/students/{card_uid}/certifications",
                get(students::certifications),
            )
            .route(
                "/api/students/{card_uid}/certifications/claim",
                post(students::claim),
            )
            .route("/api/students/{card_uid}/treasury", get(treasury::balances))
            .route("/api/students/{card_uid}/treasury/swap", post(treasury::swap))
            .route("/api/students/{card_uid}/treasury/send", post(treasury::send))
            .route("/api/actions/{id}", get(treasury::action))
            .route("/api/names/search", get(names::search))
            .route("/api/names/by-address", get(names::by_address))
            .route("/api/admin", get(names::admin_status));

        if config.admin.enabled {
            router = router.merge(admin::setup_admin_router(state.clone()));
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                )))
                .layer(DefaultBodyLimit::disable()),
        )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    signer: String,
    running_registrations: usize,
    running_actions: usize,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let signer = state
        .orchestrator
        .services()
        .ledger
        .signer_address()
        .to_checksum(None);
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        signer,
        running_registrations: state.registrations.running(),
        running_actions: state.actions.running(),
    })
}
