//! OSB endpoint state machines over the remote credential lifecycle.
//!
//! Every endpoint is a small state machine: an existence check against
//! the backend, perhaps one mutation, and a translation of the remote
//! status into protocol vocabulary. No operation state is kept locally;
//! the [`OperationToken`] handed to the platform carries everything a
//! later poll needs.

mod bindings;
mod catalog;
mod error;
mod instances;
pub mod osb;
mod state;
mod token;

use std::sync::Arc;

use serde_json::Value;

pub use catalog::spec_content_type;
pub use error::BrokerError;
pub use state::{OperationState, map_condition};
pub use token::{InstanceOperation, OperationToken, OperationType};

use crate::graph::GraphError;
use crate::graph::client::RegistryClient;
use crate::graph::pipeline::GraphFetcher;
use crate::graph::transport::Transport;
use crate::graph::types::{AuthStatusCondition, InstanceAuth};

/// Tunables the endpoints need beyond the transport itself.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Base URL baked into catalog spec links, without a trailing slash.
    pub spec_base_url: String,
    /// Page size for every collection query.
    pub page_size: u32,
    /// Concurrency budget of the catalog fetch pipeline.
    pub parallelism: usize,
}

/// The broker itself: one instance serves every request.
#[derive(Debug, Clone)]
pub struct Broker {
    client: RegistryClient,
    fetcher: GraphFetcher,
    settings: Arc<BrokerSettings>,
}

/// Answer of a provision or bind call: the token to poll with, and
/// whether the credential already existed (idempotent retry).
#[derive(Debug, Clone)]
pub struct AcceptedOperation {
    pub operation: String,
    pub already_exists: bool,
}

impl Broker {
    pub fn new(transport: Arc<dyn Transport>, settings: BrokerSettings) -> Self {
        Self {
            client: RegistryClient::new(Arc::clone(&transport)),
            fetcher: GraphFetcher::new(transport, settings.page_size, settings.parallelism),
            settings: Arc::new(settings),
        }
    }
}

/// Platform parameters must be structured data (a JSON object) when
/// present; anything else is fatal and never retried.
fn validate_parameters(parameters: Option<&Value>) -> Result<Option<Value>, BrokerError> {
    match parameters {
        None => Ok(None),
        Some(value @ Value::Object(_)) => Ok(Some(value.clone())),
        Some(_) => Err(BrokerError::MalformedParameters(
            "parameters must be a JSON object".into(),
        )),
    }
}

/// Pulls the lifecycle condition out of a credential record; a record
/// without a status block violates the backend contract.
fn require_condition(auth: &InstanceAuth) -> Result<AuthStatusCondition, BrokerError> {
    auth.condition().ok_or_else(|| {
        BrokerError::Graph(GraphError::protocol("credential record carries no status"))
    })
}

fn status_message(auth: &InstanceAuth) -> Option<String> {
    auth.status.as_ref().and_then(|status| status.message.clone())
}

/// Swaps a remote not-found for the endpoint's own "does not exist"
/// answer, leaving every other failure untouched.
fn map_missing(err: GraphError, missing: BrokerError) -> BrokerError {
    if err.is_not_found() {
        missing
    } else {
        BrokerError::Graph(err)
    }
}
