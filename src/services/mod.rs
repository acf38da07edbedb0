//! Operation services.
//!
//! Each service validates its input, orchestrates the assignment engine and
//! the repository, and returns domain values. Services keep no state between
//! calls beyond their shared handles.

mod pull_request;
mod stats;
mod team;
mod user;

pub use pull_request::*;
pub use stats::*;
pub use team::*;
pub use user::*;

use crate::errors::AppError;
use crate::models::User;

/// Reject a required field that is empty or whitespace.
fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

fn user_ids(users: Vec<User>) -> Vec<String> {
    users.into_iter().map(|u| u.user_id).collect()
}
