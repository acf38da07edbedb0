//! REST API module.
//!
//! Handlers validate the request shape, call a service and wrap the result in
//! the JSON body clients expect.

mod pull_requests;
mod stats;
mod teams;
mod users;

pub use pull_requests::*;
pub use stats::*;
pub use teams::*;
pub use users::*;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// JSON body extractor whose rejections render as `INVALID_INPUT`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections render as `INVALID_INPUT`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Success response: a status code and a JSON body.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub status: StatusCode,
    pub body: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn created(body: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Plain confirmation body.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

/// Health check body.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
}

/// GET /health - Liveness probe.
pub async fn health_check() -> ApiResult<HealthBody> {
    Ok(ApiResponse::ok(HealthBody { status: "ok" }))
}
