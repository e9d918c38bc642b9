//! # Ostium Server
//!
//! HTTP surface of the Ostium service broker: the OSB endpoints under
//! `/v2` (catalog, provisioning, bindings, operation polling), the
//! specification document endpoint, and a health probe. All domain
//! logic lives in `ostium-core`; handlers here translate between HTTP
//! and the broker's vocabulary.

pub mod binding_handlers;
pub mod catalog_handlers;
pub mod errors;
pub mod instance_handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use errors::{AppError, AppResult};
pub use routes::create_router;
pub use state::AppState;
