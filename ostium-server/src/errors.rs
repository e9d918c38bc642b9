use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use ostium_core::{BrokerError, GraphError};

pub type AppResult<T> = Result<T, AppError>;

/// Protocol-shaped error: an HTTP status plus the OSB error body
/// (`description` always, `error` code when one applies).
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: Option<String>,
    pub description: String,
}

impl AppError {
    pub fn new(status: StatusCode, description: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            description: description.into(),
        }
    }

    pub fn with_code(status: StatusCode, code: &str, description: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code.to_owned()),
            description: description.into(),
        }
    }

    pub fn bad_request(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, description)
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, description)
    }

    pub fn gone(description: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, description)
    }

    pub fn precondition_failed(description: impl Into<String>) -> Self {
        Self::new(StatusCode::PRECONDITION_FAILED, description)
    }

    pub fn internal(description: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, description)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({ "description": self.description });
        if let Some(code) = &self.code {
            body["error"] = json!(code);
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<BrokerError> for AppError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::AsyncRequired => Self::with_code(
                StatusCode::UNPROCESSABLE_ENTITY,
                "AsyncRequired",
                "This service plan requires client support for asynchronous service operations.",
            ),
            BrokerError::InstanceNotFound | BrokerError::BindingNotFound => {
                Self::gone(err.to_string())
            }
            BrokerError::BindingNotReady => Self::not_found(err.to_string()),
            BrokerError::MalformedParameters(_) => Self::bad_request(err.to_string()),
            BrokerError::InvalidToken(_)
            | BrokerError::UnexpectedUnusedCredential
            | BrokerError::InvalidSchema(_)
            | BrokerError::UnknownSpecFormat(_) => Self::internal(err.to_string()),
            BrokerError::Graph(err) => Self::from(err),
        }
    }
}

impl From<GraphError> for AppError {
    fn from(err: GraphError) -> Self {
        Self::new(graph_status(&err), err.to_string())
    }
}

/// Backend unavailability is retryable (502); anything else that leaks
/// out of the core is a broker-side defect (500). Not-found errors only
/// reach here from endpoints where 404 is the right answer; the
/// endpoints with 410 semantics translate them in the core first.
fn graph_status(err: &GraphError) -> StatusCode {
    match err {
        GraphError::NotFound(_) => StatusCode::NOT_FOUND,
        GraphError::Transport(_) | GraphError::Backend(_) => StatusCode::BAD_GATEWAY,
        GraphError::Fetch { source, .. } => graph_status(source),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
