//! Team and team member models.

use serde::{Deserialize, Serialize};

/// A member entry as listed inside a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub is_active: bool,
}

/// A team with its full member list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

/// Request body for adding a member to an existing team.
#[derive(Debug, Clone, Deserialize)]
pub struct AddMemberRequest {
    pub team_name: String,
    pub member: TeamMember,
}

/// Query parameters for fetching a team.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamQuery {
    #[serde(default)]
    pub team_name: String,
}
