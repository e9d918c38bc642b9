//! OSB request and response shapes.
//!
//! Field names follow the Open Service Broker API; catalog metadata
//! objects carry free-form additions next to their well-known keys,
//! hence the flattened maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::broker::state::OperationState;

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionRequest {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub organization_guid: Option<String>,
    #[serde(default)]
    pub space_guid: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BindRequest {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub bind_resource: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub parameters: Option<Value>,
}

/// Body of every 202 answer: the token the platform polls with.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResponse {
    pub operation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastOperationResponse {
    pub state: OperationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse {
    pub services: Vec<Service>,
}

/// One service offering, generated from one application.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    pub instances_retrievable: bool,
    pub bindings_retrievable: bool,
    pub plan_updateable: bool,
    pub plans: Vec<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ServiceMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceMetadata {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "providerDisplayName", skip_serializing_if = "Option::is_none")]
    pub provider_display_name: Option<String>,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// One service plan, generated from one bundle.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PlanMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<PlanSchemas>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanMetadata {
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanSchemas {
    pub service_instance: InstanceSchemas,
    pub service_binding: BindingSchemas,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceSchemas {
    pub create: SchemaParameters,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaParameters {
    pub parameters: Value,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BindingSchemas {}

#[derive(Debug, Clone, Serialize)]
pub struct BindingResponse {
    pub credentials: BindingCredentials,
}

/// Credential payload handed back by get-binding: the raw auth details
/// issued by the backend plus the target URL of every API the bundle
/// exposes, keyed by API name.
#[derive(Debug, Clone, Serialize)]
pub struct BindingCredentials {
    pub auth_details: Value,
    pub target_urls: BTreeMap<String, String>,
}
