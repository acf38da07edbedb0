//! User model.

use serde::{Deserialize, Serialize};

use super::TeamMember;

/// A user belongs to exactly one team at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl User {
    /// Build the user row for `member` as part of `team_name`.
    pub fn from_member(member: &TeamMember, team_name: &str) -> Self {
        Self {
            user_id: member.user_id.clone(),
            username: member.username.clone(),
            team_name: team_name.to_string(),
            is_active: member.is_active,
        }
    }

    pub fn to_member(&self) -> TeamMember {
        TeamMember {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            is_active: self.is_active,
        }
    }
}

/// Request body for toggling a user's active flag.
#[derive(Debug, Clone, Deserialize)]
pub struct SetActiveRequest {
    pub user_id: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Request body for deactivating a whole team.
#[derive(Debug, Clone, Deserialize)]
pub struct DeactivateTeamRequest {
    pub team_name: String,
}

/// Query parameters for listing a user's reviews.
#[derive(Debug, Clone, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: String,
}
