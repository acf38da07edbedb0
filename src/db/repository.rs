//! SQLite implementation of the repository.
//!
//! Reviewer lists live in a JSON array column; queries that need to look
//! inside them go through `json_each`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::Repository;
use crate::assignment::needs_more_reviewers;
use crate::errors::AppError;
use crate::models::{
    PrStatus, PrsStatus, PullRequest, PullRequestShort, Team, TeamMetric, User, UserAssignment,
};

const PR_COLUMNS: &str =
    "pr.id, pr.title, pr.author_id, pr.status, pr.reviewers, pr.need_more_reviewers, pr.created_at, pr.merged_at";

/// Database repository backed by a SQLite pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Per-user review counts over active users. A negative `limit` means
    /// no limit.
    async fn reviewer_counts(&self, limit: i64) -> Result<Vec<UserAssignment>, AppError> {
        let rows = sqlx::query(
            r#"SELECT u.id AS user_id, u.name AS username, COUNT(*) AS assignment_count
               FROM pull_requests pr
               JOIN json_each(pr.reviewers) r
               JOIN users u ON u.id = r.value
               WHERE u.is_active = 1
               GROUP BY u.id, u.name
               ORDER BY assignment_count DESC, u.id ASC
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(UserAssignment {
                    user_id: row.try_get("user_id")?,
                    username: row.try_get("username")?,
                    assignment_count: row.try_get("assignment_count")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    // ==================== TEAM OPERATIONS ====================

    async fn create_team(&self, team: &Team) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT INTO teams (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(&team.team_name)
            .execute(&mut *tx)
            .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::TeamExists(format!(
                "Team {} already exists",
                team.team_name
            )));
        }

        for member in &team.members {
            let user = User::from_member(member, &team.team_name);
            sqlx::query(UPSERT_USER)
                .bind(&user.user_id)
                .bind(&user.username)
                .bind(&user.team_name)
                .bind(user.is_active)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::from(e).context("failed to upsert member"))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_team(&self, name: &str) -> Result<Team, AppError> {
        let exists = sqlx::query("SELECT name FROM teams WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Team {} not found", name)));
        }

        let rows = sqlx::query(
            "SELECT id, name, team_name, is_active FROM users WHERE team_name = ? ORDER BY id",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let members = rows
            .iter()
            .map(|row| user_from_row(row).map(|u| u.to_member()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Team {
            team_name: name.to_string(),
            members,
        })
    }

    // ==================== USER OPERATIONS ====================

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(UPSERT_USER)
            .bind(&user.user_id)
            .bind(&user.username)
            .bind(&user.team_name)
            .bind(user.is_active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<User, AppError> {
        let row = sqlx::query("SELECT id, name, team_name, is_active FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(AppError::NotFound(format!("User {} not found", id))),
        }
    }

    async fn update_user_active(&self, id: &str, is_active: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    async fn get_active_users_by_team(&self, team_name: &str) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, team_name, is_active FROM users WHERE team_name = ? AND is_active = 1 ORDER BY id",
        )
        .bind(team_name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn deactivate_users_by_team(&self, team_name: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET is_active = 0 WHERE team_name = ?")
            .bind(team_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== PULL REQUEST OPERATIONS ====================

    async fn create_pr(&self, pr: &PullRequest) -> Result<(), AppError> {
        let reviewers_json = serde_json::to_string(&pr.reviewers)?;

        let result = sqlx::query(
            r#"INSERT INTO pull_requests (id, title, author_id, status, reviewers, need_more_reviewers, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO NOTHING"#,
        )
        .bind(&pr.id)
        .bind(&pr.title)
        .bind(&pr.author_id)
        .bind(PrStatus::Open.as_str())
        .bind(&reviewers_json)
        .bind(needs_more_reviewers(&pr.reviewers))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::PrExists(format!("PR {} already exists", pr.id)));
        }
        Ok(())
    }

    async fn get_pr(&self, id: &str) -> Result<PullRequest, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pull_requests pr WHERE pr.id = ?",
            PR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => pr_from_row(&row),
            None => Err(AppError::NotFound(format!("PR {} not found", id))),
        }
    }

    async fn update_pr(&self, pr: &PullRequest) -> Result<(), AppError> {
        let reviewers_json = serde_json::to_string(&pr.reviewers)?;

        // The status guard makes the merged check and the write one statement
        let result = sqlx::query(
            "UPDATE pull_requests SET reviewers = ?, need_more_reviewers = ? WHERE id = ? AND status = 'OPEN'",
        )
        .bind(&reviewers_json)
        .bind(needs_more_reviewers(&pr.reviewers))
        .bind(&pr.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either missing (NotFound propagates) or merged
            self.get_pr(&pr.id).await?;
            return Err(AppError::PrMerged(format!("PR {} is merged", pr.id)));
        }
        Ok(())
    }

    async fn merge_pr(&self, id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE pull_requests SET status = 'MERGED', merged_at = ? WHERE id = ? AND status != 'MERGED'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_prs_for_reviewer(
        &self,
        user_id: &str,
    ) -> Result<Vec<PullRequestShort>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM pull_requests pr
               WHERE EXISTS (SELECT 1 FROM json_each(pr.reviewers) r WHERE r.value = ?)
               ORDER BY pr.id"#,
            PR_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| pr_from_row(row).map(|pr| pr.short()))
            .collect()
    }

    async fn get_open_prs_with_reviewers_from_team(
        &self,
        team_name: &str,
    ) -> Result<Vec<PullRequest>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM pull_requests pr
               WHERE pr.status = 'OPEN'
                 AND EXISTS (
                   SELECT 1 FROM json_each(pr.reviewers) r
                   JOIN users u ON u.id = r.value
                   WHERE u.team_name = ?
                 )
               ORDER BY pr.id"#,
            PR_COLUMNS
        ))
        .bind(team_name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(pr_from_row).collect()
    }

    // ==================== STATISTICS ====================

    async fn count_prs(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM pull_requests")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn count_prs_by_status(&self) -> Result<PrsStatus, AppError> {
        let row = sqlx::query(
            r#"SELECT COALESCE(SUM(status = 'OPEN'), 0) AS open_prs,
                      COALESCE(SUM(status = 'MERGED'), 0) AS merged_prs
               FROM pull_requests"#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PrsStatus {
            open_prs: row.try_get("open_prs")?,
            merged_prs: row.try_get("merged_prs")?,
        })
    }

    async fn assignments_per_user(&self) -> Result<Vec<UserAssignment>, AppError> {
        self.reviewer_counts(-1).await
    }

    async fn top_reviewers(&self, limit: i64) -> Result<Vec<UserAssignment>, AppError> {
        self.reviewer_counts(limit.max(0)).await
    }

    async fn avg_close_time(&self) -> Result<(f64, i64), AppError> {
        let row = sqlx::query(
            r#"SELECT AVG((julianday(merged_at) - julianday(created_at)) * 86400.0) AS avg_seconds,
                      COUNT(*) AS merged_count
               FROM pull_requests
               WHERE status = 'MERGED'"#,
        )
        .fetch_one(&self.pool)
        .await?;

        let avg: Option<f64> = row.try_get("avg_seconds")?;
        Ok((avg.unwrap_or(0.0), row.try_get("merged_count")?))
    }

    async fn idle_users_per_team(&self) -> Result<Vec<TeamMetric>, AppError> {
        let rows = sqlx::query(
            r#"SELECT u.team_name AS team_name, COUNT(*) AS idle_count
               FROM users u
               WHERE u.is_active = 1
                 AND u.id NOT IN (
                   SELECT r.value FROM pull_requests pr
                   JOIN json_each(pr.reviewers) r
                   WHERE pr.status = 'OPEN'
                 )
               GROUP BY u.team_name
               ORDER BY idle_count DESC, u.team_name ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| team_metric_from_row(row, "idle_count"))
            .collect()
    }

    async fn needy_prs_per_team(&self) -> Result<Vec<TeamMetric>, AppError> {
        let rows = sqlx::query(
            r#"SELECT u.team_name AS team_name, COUNT(*) AS needy_count
               FROM pull_requests pr
               JOIN users u ON u.id = pr.author_id
               WHERE pr.status = 'OPEN' AND pr.need_more_reviewers = 1
               GROUP BY u.team_name
               ORDER BY needy_count DESC, u.team_name ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| team_metric_from_row(row, "needy_count"))
            .collect()
    }
}

const UPSERT_USER: &str = r#"INSERT INTO users (id, name, team_name, is_active) VALUES (?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET name = excluded.name, team_name = excluded.team_name, is_active = excluded.is_active"#;

// Helper functions for row conversion

fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    Ok(User {
        user_id: row.try_get("id")?,
        username: row.try_get("name")?,
        team_name: row.try_get("team_name")?,
        is_active: row.try_get("is_active")?,
    })
}

fn pr_from_row(row: &SqliteRow) -> Result<PullRequest, AppError> {
    let status: String = row.try_get("status")?;
    let reviewers: String = row.try_get("reviewers")?;

    Ok(PullRequest {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author_id: row.try_get("author_id")?,
        status: PrStatus::parse(&status)
            .ok_or_else(|| AppError::Internal(format!("unknown PR status {}", status)))?,
        reviewers: serde_json::from_str(&reviewers)?,
        need_more_reviewers: row.try_get("need_more_reviewers")?,
        created_at: row.try_get("created_at")?,
        merged_at: row.try_get("merged_at")?,
    })
}

fn team_metric_from_row(row: &SqliteRow, count_column: &str) -> Result<TeamMetric, AppError> {
    Ok(TeamMetric {
        team_name: row.try_get("team_name")?,
        count: row.try_get(count_column)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::TeamMember;
    use tempfile::TempDir;

    async fn setup() -> (SqliteRepository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite:{}", temp_dir.path().join("test.sqlite").display());
        let pool = init_database(&url).await.expect("Failed to init DB");
        (SqliteRepository::new(pool), temp_dir)
    }

    fn member(id: &str, active: bool) -> TeamMember {
        TeamMember {
            user_id: id.into(),
            username: id.to_uppercase(),
            is_active: active,
        }
    }

    fn team(name: &str, members: Vec<TeamMember>) -> Team {
        Team {
            team_name: name.into(),
            members,
        }
    }

    fn pr(id: &str, author: &str, reviewers: &[&str]) -> PullRequest {
        let reviewers: Vec<String> = reviewers.iter().map(|s| s.to_string()).collect();
        PullRequest {
            id: id.into(),
            title: format!("PR {}", id),
            author_id: author.into(),
            status: PrStatus::Open,
            need_more_reviewers: needs_more_reviewers(&reviewers),
            reviewers,
            created_at: Utc::now(),
            merged_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_team_then_get_returns_members() {
        let (repo, _dir) = setup().await;
        let t = team("backend", vec![member("u1", true), member("u2", false)]);

        repo.create_team(&t).await.unwrap();
        let loaded = repo.get_team("backend").await.unwrap();

        assert_eq!(loaded.team_name, "backend");
        assert_eq!(loaded.members, t.members);
    }

    #[tokio::test]
    async fn test_create_team_twice_fails() {
        let (repo, _dir) = setup().await;
        let t = team("backend", vec![member("u1", true)]);
        repo.create_team(&t).await.unwrap();

        let err = repo
            .create_team(&team("backend", vec![member("u9", true)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TeamExists(_)));

        // The rejected member list must not have leaked in
        assert!(matches!(repo.get_user("u9").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_team_moves_existing_user() {
        let (repo, _dir) = setup().await;
        repo.create_team(&team("a", vec![member("u1", true)]))
            .await
            .unwrap();
        repo.create_team(&team("b", vec![member("u1", false)]))
            .await
            .unwrap();

        let user = repo.get_user("u1").await.unwrap();
        assert_eq!(user.team_name, "b");
        assert!(!user.is_active);
        assert!(repo.get_team("a").await.unwrap().members.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_entities() {
        let (repo, _dir) = setup().await;
        assert!(repo.get_team("nope").await.unwrap_err().is_not_found());
        assert!(repo.get_user("nope").await.unwrap_err().is_not_found());
        assert!(repo.get_pr("nope").await.unwrap_err().is_not_found());
        assert!(repo
            .update_user_active("nope", true)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_deactivate_users_by_team() {
        let (repo, _dir) = setup().await;
        repo.create_team(&team("t", vec![member("u1", true), member("u2", true)]))
            .await
            .unwrap();
        repo.create_team(&team("other", vec![member("x1", true)]))
            .await
            .unwrap();

        repo.deactivate_users_by_team("t").await.unwrap();
        repo.deactivate_users_by_team("t").await.unwrap();
        repo.deactivate_users_by_team("empty").await.unwrap();

        assert!(repo.get_active_users_by_team("t").await.unwrap().is_empty());
        assert_eq!(repo.get_active_users_by_team("other").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pr_lifecycle() {
        let (repo, _dir) = setup().await;
        repo.create_team(&team(
            "t",
            vec![member("u1", true), member("u2", true), member("u3", true)],
        ))
        .await
        .unwrap();

        repo.create_pr(&pr("pr1", "u1", &["u2"])).await.unwrap();
        let err = repo.create_pr(&pr("pr1", "u1", &[])).await.unwrap_err();
        assert!(matches!(err, AppError::PrExists(_)));

        let mut stored = repo.get_pr("pr1").await.unwrap();
        assert_eq!(stored.status, PrStatus::Open);
        assert_eq!(stored.reviewers, vec!["u2".to_string()]);
        assert!(stored.need_more_reviewers);
        assert!(stored.merged_at.is_none());

        stored.reviewers = vec!["u2".into(), "u3".into()];
        repo.update_pr(&stored).await.unwrap();
        let updated = repo.get_pr("pr1").await.unwrap();
        assert_eq!(updated.reviewers, vec!["u2".to_string(), "u3".to_string()]);
        assert!(!updated.need_more_reviewers);

        repo.merge_pr("pr1").await.unwrap();
        let merged = repo.get_pr("pr1").await.unwrap();
        assert_eq!(merged.status, PrStatus::Merged);
        assert!(merged.merged_at.is_some());

        // Merging again leaves the row as it was
        repo.merge_pr("pr1").await.unwrap();
        assert_eq!(repo.get_pr("pr1").await.unwrap(), merged);

        // Merged rows are frozen
        let err = repo.update_pr(&stored).await.unwrap_err();
        assert!(matches!(err, AppError::PrMerged(_)));
        assert_eq!(repo.get_pr("pr1").await.unwrap().reviewers, merged.reviewers);
    }

    #[tokio::test]
    async fn test_update_missing_pr_is_not_found() {
        let (repo, _dir) = setup().await;
        let err = repo.update_pr(&pr("ghost", "u1", &[])).await.unwrap_err();
        assert!(err.is_not_found());
        repo.merge_pr("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_reviewer_queries() {
        let (repo, _dir) = setup().await;
        repo.create_team(&team("a", vec![member("a1", true), member("a2", true)]))
            .await
            .unwrap();
        repo.create_team(&team("b", vec![member("b1", true), member("b2", true)]))
            .await
            .unwrap();

        repo.create_pr(&pr("pr1", "a1", &["a2", "b1"])).await.unwrap();
        repo.create_pr(&pr("pr2", "a2", &["b1"])).await.unwrap();
        repo.create_pr(&pr("pr3", "b2", &["a1"])).await.unwrap();
        repo.merge_pr("pr2").await.unwrap();

        let for_b1 = repo.get_prs_for_reviewer("b1").await.unwrap();
        let ids: Vec<&str> = for_b1.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["pr1", "pr2"]);
        assert_eq!(for_b1[1].status, PrStatus::Merged);

        let open_b = repo.get_open_prs_with_reviewers_from_team("b").await.unwrap();
        let ids: Vec<&str> = open_b.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["pr1"]);

        let open_a = repo.get_open_prs_with_reviewers_from_team("a").await.unwrap();
        let ids: Vec<&str> = open_a.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["pr1", "pr3"]);
    }

    #[tokio::test]
    async fn test_statistics() {
        let (repo, _dir) = setup().await;
        repo.create_team(&team(
            "a",
            vec![member("a1", true), member("a2", true), member("a3", true)],
        ))
        .await
        .unwrap();
        repo.create_team(&team("b", vec![member("b1", true), member("b2", false)]))
            .await
            .unwrap();

        repo.create_pr(&pr("pr1", "a1", &["a2", "b1"])).await.unwrap();
        repo.create_pr(&pr("pr2", "a1", &["b1"])).await.unwrap();
        repo.create_pr(&pr("pr3", "b1", &["a2", "b2"])).await.unwrap();
        repo.merge_pr("pr3").await.unwrap();

        assert_eq!(repo.count_prs().await.unwrap(), 3);
        assert_eq!(
            repo.count_prs_by_status().await.unwrap(),
            PrsStatus {
                open_prs: 2,
                merged_prs: 1
            }
        );

        // b2 is inactive and therefore not counted
        let per_user = repo.assignments_per_user().await.unwrap();
        let counts: Vec<(&str, i64)> = per_user
            .iter()
            .map(|a| (a.user_id.as_str(), a.assignment_count))
            .collect();
        assert_eq!(counts, vec![("a2", 2), ("b1", 2)]);
        assert_eq!(per_user[0].username, "A2");

        let top = repo.top_reviewers(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].user_id, "a2");

        let (avg, merged) = repo.avg_close_time().await.unwrap();
        assert_eq!(merged, 1);
        assert!(avg >= 0.0);

        // a1 and a3 review nothing open; b has nobody idle
        let idle = repo.idle_users_per_team().await.unwrap();
        assert_eq!(
            idle,
            vec![TeamMetric {
                team_name: "a".into(),
                count: 2
            }]
        );

        // pr2 is open with a single reviewer, authored from team a
        let needy = repo.needy_prs_per_team().await.unwrap();
        assert_eq!(
            needy,
            vec![TeamMetric {
                team_name: "a".into(),
                count: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_statistics_on_empty_store() {
        let (repo, _dir) = setup().await;
        assert_eq!(repo.count_prs().await.unwrap(), 0);
        assert_eq!(repo.avg_close_time().await.unwrap(), (0.0, 0));
        assert!(repo.assignments_per_user().await.unwrap().is_empty());
        assert!(repo.idle_users_per_team().await.unwrap().is_empty());
    }
}
