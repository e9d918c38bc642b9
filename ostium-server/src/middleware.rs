//! `/v2` route guard for the OSB protocol version header.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::errors::AppError;

pub const API_VERSION_HEADER: &str = "x-broker-api-version";

/// Platforms must announce their protocol version; only the 2.x line is
/// served. Missing or foreign versions are rejected with 412 before any
/// handler runs.
pub async fn require_api_version(request: Request, next: Next) -> Result<Response, AppError> {
    let Some(value) = request.headers().get(API_VERSION_HEADER) else {
        return Err(AppError::precondition_failed(
            "X-Broker-API-Version header is missing",
        ));
    };
    let version = value.to_str().map_err(|_| {
        AppError::precondition_failed("X-Broker-API-Version header is not readable")
    })?;
    if !version.trim().starts_with("2.") {
        return Err(AppError::precondition_failed(format!(
            "unsupported broker API version {version}"
        )));
    }
    Ok(next.run(request).await)
}
