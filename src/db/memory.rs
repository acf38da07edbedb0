//! In-memory implementation of `Repository`.
//!
//! Mirrors the SQLite adapter's contract so services can be tested without a
//! database file. All state is lost when the value is dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::Repository;
use crate::assignment::needs_more_reviewers;
use crate::errors::AppError;
use crate::models::{
    PrStatus, PrsStatus, PullRequest, PullRequestShort, Team, TeamMetric, User, UserAssignment,
};

#[derive(Default)]
struct Store {
    teams: BTreeSet<String>,
    users: BTreeMap<String, User>,
    prs: BTreeMap<String, PullRequest>,
}

/// In-memory repository.
///
/// One `RwLock` guards all three tables so every operation is atomic.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
    fail_open_pr_listing: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `get_open_prs_with_reviewers_from_team` fail, to exercise the
    /// best-effort part of mass deactivation.
    pub fn failing_open_pr_listing() -> Self {
        Self {
            fail_open_pr_listing: true,
            ..Self::default()
        }
    }

    /// Insert a pull request as-is, bypassing the open-only creation rules.
    pub async fn insert_pr(&self, pr: PullRequest) {
        self.store.write().await.prs.insert(pr.id.clone(), pr);
    }

    fn reviewer_counts(store: &Store) -> Vec<UserAssignment> {
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for pr in store.prs.values() {
            for reviewer in &pr.reviewers {
                *counts.entry(reviewer.as_str()).or_default() += 1;
            }
        }

        let mut out: Vec<UserAssignment> = store
            .users
            .values()
            .filter(|u| u.is_active)
            .filter_map(|u| {
                counts.get(u.user_id.as_str()).map(|&n| UserAssignment {
                    user_id: u.user_id.clone(),
                    username: u.username.clone(),
                    assignment_count: n,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.assignment_count
                .cmp(&a.assignment_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        out
    }

    fn sorted_metrics(counts: HashMap<String, i64>) -> Vec<TeamMetric> {
        let mut out: Vec<TeamMetric> = counts
            .into_iter()
            .map(|(team_name, count)| TeamMetric { team_name, count })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.team_name.cmp(&b.team_name)));
        out
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_team(&self, team: &Team) -> Result<(), AppError> {
        let mut store = self.store.write().await;
        if !store.teams.insert(team.team_name.clone()) {
            return Err(AppError::TeamExists(format!(
                "Team {} already exists",
                team.team_name
            )));
        }
        for member in &team.members {
            let user = User::from_member(member, &team.team_name);
            store.users.insert(user.user_id.clone(), user);
        }
        Ok(())
    }

    async fn get_team(&self, name: &str) -> Result<Team, AppError> {
        let store = self.store.read().await;
        if !store.teams.contains(name) {
            return Err(AppError::NotFound(format!("Team {} not found", name)));
        }
        let members = store
            .users
            .values()
            .filter(|u| u.team_name == name)
            .map(User::to_member)
            .collect();
        Ok(Team {
            team_name: name.to_string(),
            members,
        })
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let mut store = self.store.write().await;
        if !store.teams.contains(&user.team_name) {
            return Err(AppError::Database(format!(
                "team {} does not exist",
                user.team_name
            )));
        }
        store.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<User, AppError> {
        let store = self.store.read().await;
        store
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    async fn update_user_active(&self, id: &str, is_active: bool) -> Result<(), AppError> {
        let mut store = self.store.write().await;
        match store.users.get_mut(id) {
            Some(user) => {
                user.is_active = is_active;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User {} not found", id))),
        }
    }

    async fn get_active_users_by_team(&self, team_name: &str) -> Result<Vec<User>, AppError> {
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .filter(|u| u.team_name == team_name && u.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate_users_by_team(&self, team_name: &str) -> Result<(), AppError> {
        let mut store = self.store.write().await;
        store
            .users
            .values_mut()
            .filter(|u| u.team_name == team_name)
            .for_each(|u| u.is_active = false);
        Ok(())
    }

    async fn create_pr(&self, pr: &PullRequest) -> Result<(), AppError> {
        let mut store = self.store.write().await;
        if store.prs.contains_key(&pr.id) {
            return Err(AppError::PrExists(format!("PR {} already exists", pr.id)));
        }
        if !store.users.contains_key(&pr.author_id) {
            return Err(AppError::Database(format!(
                "author {} does not exist",
                pr.author_id
            )));
        }

        let stored = PullRequest {
            status: PrStatus::Open,
            need_more_reviewers: needs_more_reviewers(&pr.reviewers),
            created_at: Utc::now(),
            merged_at: None,
            ..pr.clone()
        };
        store.prs.insert(pr.id.clone(), stored);
        Ok(())
    }

    async fn get_pr(&self, id: &str) -> Result<PullRequest, AppError> {
        let store = self.store.read().await;
        store
            .prs
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("PR {} not found", id)))
    }

    async fn update_pr(&self, pr: &PullRequest) -> Result<(), AppError> {
        let mut store = self.store.write().await;
        let stored = store
            .prs
            .get_mut(&pr.id)
            .ok_or_else(|| AppError::NotFound(format!("PR {} not found", pr.id)))?;
        if stored.is_merged() {
            return Err(AppError::PrMerged(format!("PR {} is merged", pr.id)));
        }
        stored.reviewers = pr.reviewers.clone();
        stored.need_more_reviewers = needs_more_reviewers(&pr.reviewers);
        Ok(())
    }

    async fn merge_pr(&self, id: &str) -> Result<(), AppError> {
        let mut store = self.store.write().await;
        if let Some(pr) = store.prs.get_mut(id) {
            if !pr.is_merged() {
                pr.status = PrStatus::Merged;
                pr.merged_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn get_prs_for_reviewer(
        &self,
        user_id: &str,
    ) -> Result<Vec<PullRequestShort>, AppError> {
        let store = self.store.read().await;
        Ok(store
            .prs
            .values()
            .filter(|pr| pr.reviewers.iter().any(|r| r == user_id))
            .map(PullRequest::short)
            .collect())
    }

    async fn get_open_prs_with_reviewers_from_team(
        &self,
        team_name: &str,
    ) -> Result<Vec<PullRequest>, AppError> {
        if self.fail_open_pr_listing {
            return Err(AppError::Database("open PR listing unavailable".into()));
        }

        let store = self.store.read().await;
        let in_team = |id: &String| {
            store
                .users
                .get(id)
                .is_some_and(|u| u.team_name == team_name)
        };
        Ok(store
            .prs
            .values()
            .filter(|pr| !pr.is_merged() && pr.reviewers.iter().any(in_team))
            .cloned()
            .collect())
    }

    async fn count_prs(&self) -> Result<i64, AppError> {
        Ok(self.store.read().await.prs.len() as i64)
    }

    async fn count_prs_by_status(&self) -> Result<PrsStatus, AppError> {
        let store = self.store.read().await;
        let merged = store.prs.values().filter(|pr| pr.is_merged()).count() as i64;
        Ok(PrsStatus {
            open_prs: store.prs.len() as i64 - merged,
            merged_prs: merged,
        })
    }

    async fn assignments_per_user(&self) -> Result<Vec<UserAssignment>, AppError> {
        Ok(Self::reviewer_counts(&*self.store.read().await))
    }

    async fn top_reviewers(&self, limit: i64) -> Result<Vec<UserAssignment>, AppError> {
        let mut top = Self::reviewer_counts(&*self.store.read().await);
        top.truncate(limit.max(0) as usize);
        Ok(top)
    }

    async fn avg_close_time(&self) -> Result<(f64, i64), AppError> {
        let store = self.store.read().await;
        let durations: Vec<f64> = store
            .prs
            .values()
            .filter_map(|pr| pr.merged_at.map(|m| m - pr.created_at))
            .map(|d| d.num_milliseconds() as f64 / 1000.0)
            .collect();

        if durations.is_empty() {
            return Ok((0.0, 0));
        }
        let count = durations.len() as i64;
        Ok((durations.iter().sum::<f64>() / count as f64, count))
    }

    async fn idle_users_per_team(&self) -> Result<Vec<TeamMetric>, AppError> {
        let store = self.store.read().await;
        let busy: HashSet<&str> = store
            .prs
            .values()
            .filter(|pr| !pr.is_merged())
            .flat_map(|pr| pr.reviewers.iter().map(String::as_str))
            .collect();

        let mut counts: HashMap<String, i64> = HashMap::new();
        for user in store.users.values() {
            if user.is_active && !busy.contains(user.user_id.as_str()) {
                *counts.entry(user.team_name.clone()).or_default() += 1;
            }
        }
        Ok(Self::sorted_metrics(counts))
    }

    async fn needy_prs_per_team(&self) -> Result<Vec<TeamMetric>, AppError> {
        let store = self.store.read().await;
        let mut counts: HashMap<String, i64> = HashMap::new();
        for pr in store.prs.values() {
            if pr.is_merged() || !pr.need_more_reviewers {
                continue;
            }
            if let Some(author) = store.users.get(&pr.author_id) {
                *counts.entry(author.team_name.clone()).or_default() += 1;
            }
        }
        Ok(Self::sorted_metrics(counts))
    }
}
