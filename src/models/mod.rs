//! Data models for the reviewer service.
//!
//! Field names follow the JSON layout clients already depend on.

mod pull_request;
mod stats;
mod team;
mod user;

pub use pull_request::*;
pub use stats::*;
pub use team::*;
pub use user::*;
