//! Persistence layer.
//!
//! The [`Repository`] trait is the only way the services touch stored state.
//! SQLite is the production store; tests can swap in the in-memory double.

#[cfg(test)]
mod memory;
mod repository;

#[cfg(test)]
pub use memory::InMemoryRepository;
pub use repository::SqliteRepository;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::{
    PrsStatus, PullRequest, PullRequestShort, Team, TeamMetric, User, UserAssignment,
};

/// How many reviewers the top-reviewers query returns.
pub const TOP_REVIEWERS_LIMIT: i64 = 5;

/// Storage operations for teams, users and pull requests.
///
/// Each method is atomic with respect to the store. Lookups of a single
/// entity fail with [`AppError::NotFound`] when it is absent.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Insert the team and upsert all of its members in one transaction.
    /// Fails with [`AppError::TeamExists`] on a name collision.
    async fn create_team(&self, team: &Team) -> Result<(), AppError>;

    async fn get_team(&self, name: &str) -> Result<Team, AppError>;

    /// Insert the user, or overwrite its name, team and active flag.
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    async fn get_user(&self, id: &str) -> Result<User, AppError>;

    async fn update_user_active(&self, id: &str, is_active: bool) -> Result<(), AppError>;

    async fn get_active_users_by_team(&self, team_name: &str) -> Result<Vec<User>, AppError>;

    /// Clear the active flag of every member. Idempotent.
    async fn deactivate_users_by_team(&self, team_name: &str) -> Result<(), AppError>;

    /// Insert an open pull request stamped with the current time.
    /// Fails with [`AppError::PrExists`] when the id is taken.
    async fn create_pr(&self, pr: &PullRequest) -> Result<(), AppError>;

    async fn get_pr(&self, id: &str) -> Result<PullRequest, AppError>;

    /// Rewrite the reviewer list and the needs-more flag of an open pull
    /// request. Fails with [`AppError::PrMerged`] when the stored row is merged.
    async fn update_pr(&self, pr: &PullRequest) -> Result<(), AppError>;

    /// Mark the pull request merged unless it already is. Never fails on an
    /// already merged or missing row.
    async fn merge_pr(&self, id: &str) -> Result<(), AppError>;

    async fn get_prs_for_reviewer(&self, user_id: &str)
        -> Result<Vec<PullRequestShort>, AppError>;

    /// Open pull requests with at least one reviewer from `team_name`.
    async fn get_open_prs_with_reviewers_from_team(
        &self,
        team_name: &str,
    ) -> Result<Vec<PullRequest>, AppError>;

    async fn count_prs(&self) -> Result<i64, AppError>;

    async fn count_prs_by_status(&self) -> Result<PrsStatus, AppError>;

    /// Review assignments of active users, most loaded first.
    async fn assignments_per_user(&self) -> Result<Vec<UserAssignment>, AppError>;

    async fn top_reviewers(&self, limit: i64) -> Result<Vec<UserAssignment>, AppError>;

    /// Mean seconds from creation to merge, and the number of merged rows.
    async fn avg_close_time(&self) -> Result<(f64, i64), AppError>;

    /// Active users not reviewing any open pull request, per team.
    async fn idle_users_per_team(&self) -> Result<Vec<TeamMetric>, AppError>;

    /// Open pull requests short of reviewers, per author team.
    async fn needy_prs_per_team(&self) -> Result<Vec<TeamMetric>, AppError>;
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    // Ensure the parent directory exists
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            name TEXT PRIMARY KEY
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            team_name TEXT NOT NULL REFERENCES teams(name),
            is_active BOOLEAN NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pull_requests (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author_id TEXT NOT NULL REFERENCES users(id),
            status TEXT NOT NULL DEFAULT 'OPEN' CHECK (status IN ('OPEN', 'MERGED')),
            reviewers TEXT NOT NULL DEFAULT '[]',
            need_more_reviewers BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            merged_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_users_team_active ON users(team_name, is_active);
        CREATE INDEX IF NOT EXISTS idx_pull_requests_status ON pull_requests(status);
        CREATE INDEX IF NOT EXISTS idx_pull_requests_author ON pull_requests(author_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
