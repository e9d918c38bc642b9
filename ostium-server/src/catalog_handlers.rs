use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use ostium_core::broker::osb::CatalogResponse;
use ostium_core::broker::spec_content_type;

use crate::errors::AppResult;
use crate::state::AppState;

/// `GET /v2/catalog`: walks the backend graph and returns one service
/// offering per application.
pub async fn get_catalog(State(state): State<AppState>) -> AppResult<Json<CatalogResponse>> {
    let cancel = state.shutdown.child_token();
    let catalog = state.broker.catalog(&cancel).await?;
    Ok(Json(catalog))
}

#[derive(Debug, Deserialize)]
pub struct SpecificationQuery {
    pub app_id: String,
    pub bundle_id: String,
    pub definition_id: String,
}

/// `GET /specifications`: serves one definition's spec document; this is
/// the target of the URLs embedded in catalog metadata.
pub async fn get_specification(
    State(state): State<AppState>,
    Query(query): Query<SpecificationQuery>,
) -> AppResult<Response> {
    let spec = state
        .broker
        .specification(&query.app_id, &query.bundle_id, &query.definition_id)
        .await?;
    let content_type = spec_content_type(spec.format.as_deref())?;
    let body = spec.data.unwrap_or_default();
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
