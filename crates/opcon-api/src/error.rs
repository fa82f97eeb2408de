//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Responses keep the `{success: false, message}` envelope the console's
//! front end has always consumed.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler; a thin response-mapping wrapper
/// around the core taxonomy.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub opcon_core::Error);

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use opcon_core::Error as Core;

    let status = match &self.0 {
      Core::DuplicateName(_) => StatusCode::CONFLICT,
      Core::NotFound(_) => StatusCode::NOT_FOUND,
      Core::EmptyDroneList | Core::MalformedInput(_) => StatusCode::BAD_REQUEST,
      Core::Storage(_) | Core::Filesystem(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = Json(json!({ "success": false, "message": self.to_string() }));
    (status, body).into_response()
  }
}
