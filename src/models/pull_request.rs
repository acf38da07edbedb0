//! Pull request models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of reviewer slots on every pull request.
pub const REVIEWER_SLOTS: usize = 2;

/// Lifecycle status of a pull request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    Open,
    Merged,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "OPEN",
            PrStatus::Merged => "MERGED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(PrStatus::Open),
            "MERGED" => Some(PrStatus::Merged),
            _ => None,
        }
    }
}

/// A pull request with up to two reviewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    #[serde(rename = "pull_request_id")]
    pub id: String,
    #[serde(rename = "pull_request_name")]
    pub title: String,
    pub author_id: String,
    pub status: PrStatus,
    #[serde(rename = "assigned_reviewers")]
    pub reviewers: Vec<String>,
    pub need_more_reviewers: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "mergedAt", skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged
    }

    pub fn short(&self) -> PullRequestShort {
        PullRequestShort {
            id: self.id.clone(),
            title: self.title.clone(),
            author_id: self.author_id.clone(),
            status: self.status,
        }
    }
}

/// Compact pull request view used in per-reviewer listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestShort {
    #[serde(rename = "pull_request_id")]
    pub id: String,
    #[serde(rename = "pull_request_name")]
    pub title: String,
    pub author_id: String,
    pub status: PrStatus,
}

/// Request body for creating a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrRequest {
    #[serde(rename = "pull_request_id")]
    pub id: String,
    #[serde(rename = "pull_request_name")]
    pub title: String,
    pub author_id: String,
}

/// Request body for merging a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct MergePrRequest {
    pub pull_request_id: String,
}

/// Request body for replacing one reviewer.
#[derive(Debug, Clone, Deserialize)]
pub struct ReassignRequest {
    pub pull_request_id: String,
    pub old_reviewer_id: String,
}
