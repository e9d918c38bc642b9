//! Wire records for the graph backend.
//!
//! Collection queries return connection envelopes (`data` + `pageInfo`
//! footer); single-object queries return the object under a `result`
//! alias. Field names follow the backend schema, hence the camelCase
//! renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cursor footer carried by every collection page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub start_cursor: Option<String>,
    #[serde(default)]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// One page of a collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub total_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Option<serde_json::Map<String, Value>>,
}

/// A named grouping of definitions belonging to one application; the unit
/// a binding is issued against.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instance_auth_request_input_schema: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "targetURL")]
    pub target_url: String,
    #[serde(default)]
    pub spec: Option<DefinitionSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub spec: Option<DefinitionSpec>,
}

/// Spec attachment of an API or event definition. `format` is an open
/// string; the catalog converter rejects values it does not know.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSpec {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, rename = "type")]
    pub spec_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Remote credential record. Created by a broker mutation, mutated only by
/// the backend afterwards; the broker reads it to drive the operation
/// state machines.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceAuth {
    #[serde(default)]
    pub id: Option<String>,
    /// JSON-encoded correlation map (`instance_id`, `binding_id`), set at
    /// creation time and used to detect broker/platform desynchronization.
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub input_params: Option<String>,
    /// Opaque credential payload; only passed through, never interpreted.
    #[serde(default)]
    pub auth: Option<Value>,
    #[serde(default)]
    pub status: Option<AuthStatus>,
}

impl InstanceAuth {
    pub fn condition(&self) -> Option<AuthStatusCondition> {
        self.status.as_ref().map(|status| status.condition)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthStatus {
    pub condition: AuthStatusCondition,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Closed credential lifecycle vocabulary reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatusCondition {
    Pending,
    Succeeded,
    Failed,
    Unused,
}

/// Identifiers embedded in a credential's context at creation time.
/// Instance credentials carry only `instance_id`; binding credentials
/// carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthCoordinates {
    pub instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding_id: Option<String>,
}

impl AuthCoordinates {
    pub fn instance(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            binding_id: None,
        }
    }

    pub fn binding(instance_id: impl Into<String>, binding_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            binding_id: Some(binding_id.into()),
        }
    }
}

/// Bundle view reachable through one of its credentials, used when
/// assembling the binding payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundBundle {
    #[serde(default)]
    pub api_definitions: Option<Connection<ApiTarget>>,
    #[serde(default)]
    pub instance_auth: Option<InstanceAuth>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTarget {
    pub name: String,
    #[serde(rename = "targetURL")]
    pub target_url: String,
}

/// Resolved specification document of a single API or event definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecificationOutput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}
