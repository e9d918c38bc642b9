use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use ostium_core::broker::AcceptedOperation;
use ostium_core::broker::osb::{LastOperationResponse, OperationResponse, ProvisionRequest};

use crate::errors::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AsyncQuery {
    #[serde(default)]
    pub accepts_incomplete: bool,
}

/// OSB requires the platform to repeat the service and plan on delete
/// calls; rejecting their absence happens in the extractor.
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub accepts_incomplete: bool,
}

#[derive(Debug, Deserialize)]
pub struct LastOperationQuery {
    pub operation: Option<String>,
}

/// 202 for a freshly started operation, 200 for an idempotent retry.
pub(crate) fn accepted_response(
    accepted: AcceptedOperation,
) -> (StatusCode, Json<OperationResponse>) {
    let status = if accepted.already_exists {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    (
        status,
        Json(OperationResponse {
            operation: accepted.operation,
        }),
    )
}

/// `PUT /v2/service_instances/{instance_id}`
pub async fn provision(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    Json(request): Json<ProvisionRequest>,
) -> AppResult<(StatusCode, Json<OperationResponse>)> {
    let accepted = state
        .broker
        .provision(&instance_id, &request, query.accepts_incomplete)
        .await?;
    Ok(accepted_response(accepted))
}

/// `DELETE /v2/service_instances/{instance_id}`
pub async fn deprovision(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<(StatusCode, Json<OperationResponse>)> {
    let operation = state
        .broker
        .deprovision(
            &instance_id,
            &query.service_id,
            &query.plan_id,
            query.accepts_incomplete,
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(OperationResponse { operation })))
}

/// `GET /v2/service_instances/{instance_id}/last_operation`
pub async fn last_operation(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
) -> AppResult<Json<LastOperationResponse>> {
    let response = state
        .broker
        .instance_last_operation(&instance_id, query.operation.as_deref())
        .await?;
    Ok(Json(response))
}
