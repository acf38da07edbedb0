//! Team operations.

use std::sync::Arc;

use super::require;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{AddMemberRequest, Team, TeamMember, User};

#[derive(Clone)]
pub struct TeamService {
    repo: Arc<dyn Repository>,
}

impl TeamService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Create a team together with its members.
    ///
    /// Members that already exist elsewhere are moved into the new team.
    pub async fn create_team(&self, team: Team) -> Result<Team, AppError> {
        require("team_name", &team.team_name)?;
        if team.members.is_empty() {
            return Err(AppError::InvalidInput(
                "team needs at least one member".to_string(),
            ));
        }
        for member in &team.members {
            validate_member(member)?;
        }

        self.repo
            .create_team(&team)
            .await
            .map_err(|e| e.context("failed to create team"))?;

        tracing::info!(
            team_name = %team.team_name,
            members = team.members.len(),
            "team created"
        );

        self.repo.get_team(&team.team_name).await
    }

    pub async fn get_team(&self, team_name: &str) -> Result<Team, AppError> {
        require("team_name", team_name)?;
        self.repo
            .get_team(team_name)
            .await
            .map_err(|e| e.context("failed to get team"))
    }

    /// Put `member` into an existing team, moving it from its old team if
    /// needed.
    pub async fn add_member(&self, request: AddMemberRequest) -> Result<(), AppError> {
        require("team_name", &request.team_name)?;
        validate_member(&request.member)?;

        self.repo
            .get_team(&request.team_name)
            .await
            .map_err(|e| e.context("failed to check team"))?;

        let user = User::from_member(&request.member, &request.team_name);
        self.repo
            .upsert_user(&user)
            .await
            .map_err(|e| e.context("failed to add member"))?;

        tracing::info!(
            team_name = %request.team_name,
            user_id = %user.user_id,
            "member added"
        );
        Ok(())
    }
}

fn validate_member(member: &TeamMember) -> Result<(), AppError> {
    require("user_id", &member.user_id)?;
    require("username", &member.username)
}
