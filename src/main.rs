//! Reviewer Service
//!
//! A REST backend that assigns pull-request reviewers within teams, with SQLite persistence.

mod api;
mod assignment;
mod config;
mod db;
mod errors;
mod logging;
mod models;
mod services;
mod shutdown;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use assignment::{EntropySource, RandomSource};
use config::Config;
use db::{Repository, SqliteRepository};
use services::{PullRequestService, StatsService, TeamService, UserService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub teams: TeamService,
    pub users: UserService,
    pub prs: PullRequestService,
    pub stats: StatsService,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>, rng: Arc<dyn RandomSource>) -> Self {
        Self {
            teams: TeamService::new(repo.clone()),
            users: UserService::new(repo.clone(), rng.clone()),
            prs: PullRequestService::new(repo.clone(), rng),
            stats: StatsService::new(repo),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&config);

    tracing::info!("Starting Reviewer Service");
    tracing::info!("Database URL: {}", config.db_url);
    tracing::info!("Log level: {}", config.log_level);

    // Initialize database
    let pool = db::init_database(&config.db_url).await?;
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::new(pool.clone()));

    // Create application state
    let state = AppState::new(repo, Arc::new(EntropySource));

    // Build router
    let app = create_router(state);

    // Start server
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown::shutdown_signal().await;
        let _ = signalled_tx.send(());
    });
    let mut server = tokio::spawn(async move { serve.await });

    let drain_deadline = async move {
        if signalled_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(shutdown::DRAIN_TIMEOUT).await;
    };

    tokio::select! {
        result = &mut server => result??,
        _ = drain_deadline => {
            tracing::warn!("drain deadline passed, closing remaining connections");
            server.abort();
        }
    }

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let team_routes = Router::new()
        .route("/add", post(api::add_team))
        .route("/add-member", post(api::add_member))
        .route("/get", get(api::get_team));

    let user_routes = Router::new()
        .route("/setIsActive", post(api::set_is_active))
        .route("/getReview", get(api::get_review))
        .route("/deactivateByTeam", post(api::deactivate_by_team));

    let pr_routes = Router::new()
        .route("/create", post(api::create_pr))
        .route("/merge", post(api::merge_pr))
        .route("/reassign", post(api::reassign_pr));

    let stats_routes = Router::new()
        .route("/prs-total", get(api::prs_total))
        .route("/prs-status", get(api::prs_status))
        .route("/assignments-per-user", get(api::assignments_per_user))
        .route("/top-reviewers", get(api::top_reviewers))
        .route("/avg-close-time", get(api::avg_close_time))
        .route("/idle-users-per-team", get(api::idle_users_per_team))
        .route("/needy-prs-per-team", get(api::needy_prs_per_team));

    Router::new()
        .nest("/team", team_routes)
        .nest("/users", user_routes)
        .nest("/pullRequest", pr_routes)
        .nest("/stats", stats_routes)
        .route("/health", get(api::health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
