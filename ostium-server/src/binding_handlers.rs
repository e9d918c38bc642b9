use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use ostium_core::broker::osb::{
    BindRequest, BindingResponse, LastOperationResponse, OperationResponse,
};

use crate::errors::AppResult;
use crate::instance_handlers::{AsyncQuery, DeleteQuery, LastOperationQuery, accepted_response};
use crate::state::AppState;

/// `PUT /v2/service_instances/{instance_id}/service_bindings/{binding_id}`
pub async fn bind(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    Query(query): Query<AsyncQuery>,
    Json(request): Json<BindRequest>,
) -> AppResult<(StatusCode, Json<OperationResponse>)> {
    let accepted = state
        .broker
        .bind(&instance_id, &binding_id, &request, query.accepts_incomplete)
        .await?;
    Ok(accepted_response(accepted))
}

/// `DELETE /v2/service_instances/{instance_id}/service_bindings/{binding_id}`
pub async fn unbind(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<(StatusCode, Json<OperationResponse>)> {
    let operation = state
        .broker
        .unbind(&instance_id, &binding_id, query.accepts_incomplete)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(OperationResponse { operation })))
}

/// `GET /v2/service_instances/{instance_id}/service_bindings/{binding_id}/last_operation`
pub async fn last_operation(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    Query(query): Query<LastOperationQuery>,
) -> AppResult<Json<LastOperationResponse>> {
    let response = state
        .broker
        .binding_last_operation(&instance_id, &binding_id, query.operation.as_deref())
        .await?;
    Ok(Json(response))
}

/// `GET /v2/service_instances/{instance_id}/service_bindings/{binding_id}`
///
/// Synchronous credential retrieval; anything short of a terminal
/// `Succeeded` record answers 404 so the platform keeps polling.
pub async fn get_binding(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
) -> AppResult<Json<BindingResponse>> {
    let response = state.broker.get_binding(&instance_id, &binding_id).await?;
    Ok(Json(response))
}
