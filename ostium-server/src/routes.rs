//! Router assembly: the OSB surface under `/v2` behind the version
//! guard, the specification and health endpoints outside it.

use axum::{
    Router, middleware,
    routing::{get, put},
};
use tower_http::trace::TraceLayer;

use crate::middleware::require_api_version;
use crate::state::AppState;
use crate::{binding_handlers, catalog_handlers, instance_handlers};

pub fn create_router(state: AppState) -> Router {
    let osb = Router::new()
        .route("/catalog", get(catalog_handlers::get_catalog))
        .route(
            "/service_instances/{instance_id}",
            put(instance_handlers::provision).delete(instance_handlers::deprovision),
        )
        .route(
            "/service_instances/{instance_id}/last_operation",
            get(instance_handlers::last_operation),
        )
        .route(
            "/service_instances/{instance_id}/service_bindings/{binding_id}",
            put(binding_handlers::bind)
                .delete(binding_handlers::unbind)
                .get(binding_handlers::get_binding),
        )
        .route(
            "/service_instances/{instance_id}/service_bindings/{binding_id}/last_operation",
            get(binding_handlers::last_operation),
        )
        .route_layer(middleware::from_fn(require_api_version));

    Router::new()
        .nest("/v2", osb)
        .route("/specifications", get(catalog_handlers::get_specification))
        .route("/health", get(catalog_handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
