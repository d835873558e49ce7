use std::any::Any;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use tower_governor::GovernorError;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub success: bool,
  pub error: String,
  #[serde(rename = "availableEndpoints", skip_serializing_if = "Option::is_none")]
  pub available_endpoints: Option<Vec<&'static str>>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      success: false,
      error: error.into(),
      available_endpoints: None,
    }
  }

  pub fn with_endpoints(error: impl Into<String>, endpoints: &[&'static str]) -> Self {
    Self {
      success: false,
      error: error.into(),
      available_endpoints: Some(endpoints.to_vec()),
    }
  }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  StoreError(fivemon_store::StoreError),
  ValidationError(String),
  Internal(String),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    match self {
      AppError::StoreError(store_err) => {
        tracing::warn!(%store_err, "Query rejected");
        let error_response = ErrorResponse::new(store_err.to_string());
        (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
      }
      AppError::ValidationError(msg) => {
        tracing::warn!(validation_error = %msg, "Validation failed");
        let error_response = ErrorResponse::new(msg);
        (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
      }
      AppError::Internal(detail) => {
        // Log the detail server-side only
        tracing::error!(%detail, "Internal error occurred");
        let error_response = ErrorResponse::new("Internal server error");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response)).into_response()
      }
    }
  }
}

impl From<fivemon_store::StoreError> for AppError {
  fn from(err: fivemon_store::StoreError) -> Self {
    AppError::StoreError(err)
  }
}

impl From<crate::validation::ValidationError> for AppError {
  fn from(err: crate::validation::ValidationError) -> Self {
    AppError::ValidationError(err.to_string())
  }
}

/// Turn a handler panic into the generic 500 response.
pub(crate) fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
  let detail = if let Some(s) = err.downcast_ref::<String>() {
    s.clone()
  } else if let Some(s) = err.downcast_ref::<&str>() {
    s.to_string()
  } else {
    "unknown panic payload".to_string()
  };
  AppError::Internal(format!("handler panicked: {detail}")).into_response()
}

/// Render a rate-limiter rejection with the JSON error body.
pub(crate) fn rate_limit_response(err: GovernorError) -> Response {
  match err {
    GovernorError::TooManyRequests { wait_time, headers } => {
      tracing::debug!(wait_time, "Rate limit exceeded");
      let error_response =
        ErrorResponse::new(format!("Too many requests, retry in {wait_time}s"));
      let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();
      if let Some(headers) = headers {
        response.headers_mut().extend(headers);
      }
      response
    }
    GovernorError::UnableToExtractKey => {
      AppError::Internal("unable to extract client address".to_string()).into_response()
    }
    GovernorError::Other { code, msg, headers } => {
      let error_response = ErrorResponse::new(msg.unwrap_or_else(|| "Request rejected".to_string()));
      let mut response = (code, Json(error_response)).into_response();
      if let Some(headers) = headers {
        response.headers_mut().extend(headers);
      }
      response
    }
  }
}
