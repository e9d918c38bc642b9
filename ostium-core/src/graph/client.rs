use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::graph::error::{GraphError, Result};
use crate::graph::queries;
use crate::graph::transport::{GraphRequest, Transport};
use crate::graph::types::{
    AuthCoordinates, BoundBundle, DefinitionSpec, InstanceAuth, SpecificationOutput,
};

/// Typed operations against the registry backend.
///
/// A thin layer over [`Transport`]: renders one query or mutation per
/// call, decodes the `result` alias and enforces the context-coordinate
/// invariants on credential records.
#[derive(Clone)]
pub struct RegistryClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient").finish_non_exhaustive()
    }
}

/// Everything needed to request creation of one credential record.
#[derive(Debug, Clone)]
pub struct AuthCreationInput {
    pub bundle_id: String,
    pub auth_id: String,
    pub coordinates: AuthCoordinates,
    pub input_params: Option<Value>,
}

/// Credential payload plus the API entry points it unlocks.
#[derive(Debug, Clone)]
pub struct BoundCredentials {
    pub auth: InstanceAuth,
    pub target_urls: BTreeMap<String, String>,
}

impl RegistryClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetches a credential record by ID and verifies that its embedded
    /// context matches the requested coordinates.
    ///
    /// A record without context reads as not found; a record whose
    /// context disagrees with `expected` is a fatal consistency error.
    pub async fn instance_auth(
        &self,
        auth_id: &str,
        expected: &AuthCoordinates,
    ) -> Result<InstanceAuth> {
        let data = self
            .execute(queries::instance_auth(auth_id))
            .await
            .map_err(|err| err.while_doing("executing GraphQL call to get bundle instance auth"))?;
        let auth: InstanceAuth = decode_result(data, "bundle instance auth")?;
        verify_context(&auth, expected)?;
        Ok(auth)
    }

    /// Requests asynchronous creation of a credential against a bundle.
    /// The backend answers with the initial status record.
    pub async fn request_auth_creation(&self, input: &AuthCreationInput) -> Result<InstanceAuth> {
        let context = serde_json::to_value(&input.coordinates)?;
        let params = input.input_params.clone().unwrap_or(Value::Null);
        debug!(
            bundle_id = %input.bundle_id,
            auth_id = %input.auth_id,
            "requesting credential creation"
        );
        let data = self
            .execute(queries::request_auth_creation(
                &input.bundle_id,
                &input.auth_id,
                &context,
                &params,
            ))
            .await
            .map_err(|err| {
                err.while_doing("executing GraphQL call to create bundle instance auth")
            })?;
        decode_result(data, "created bundle instance auth")
    }

    /// Requests asynchronous deletion of a credential record.
    pub async fn request_auth_deletion(&self, auth_id: &str) -> Result<InstanceAuth> {
        debug!(auth_id = %auth_id, "requesting credential deletion");
        let data = self
            .execute(queries::request_auth_deletion(auth_id))
            .await
            .map_err(|err| {
                err.while_doing("executing GraphQL call to delete the bundle instance auth")
            })?;
        decode_result(data, "deleted bundle instance auth")
    }

    /// Fetches the full credential payload of a binding together with
    /// the target URLs of the APIs it unlocks.
    pub async fn binding_credentials(
        &self,
        auth_id: &str,
        expected: &AuthCoordinates,
    ) -> Result<BoundCredentials> {
        let data = self
            .execute(queries::bundle_by_auth(auth_id))
            .await
            .map_err(|err| err.while_doing("executing GraphQL call to get bundle instance auth"))?;
        let bundle: BoundBundle = decode_result(data, "bundle for instance auth")?;
        let auth = bundle
            .instance_auth
            .ok_or_else(|| GraphError::not_found("bundle carries no matching instance auth"))?;
        verify_context(&auth, expected)?;
        let target_urls = bundle
            .api_definitions
            .map(|connection| {
                connection
                    .data
                    .into_iter()
                    .map(|api| (api.name, api.target_url))
                    .collect()
            })
            .unwrap_or_default();
        Ok(BoundCredentials { auth, target_urls })
    }

    /// Resolves the specification document of a single API or event
    /// definition.
    pub async fn find_specification(
        &self,
        application_id: &str,
        bundle_id: &str,
        definition_id: &str,
    ) -> Result<SpecificationOutput> {
        let data = self
            .execute(queries::specification(
                application_id,
                bundle_id,
                definition_id,
            ))
            .await
            .map_err(|err| err.while_doing("executing GraphQL call to find specification"))?;
        let envelope: SpecificationEnvelope = decode_result(data, "application")?;
        let bundle = envelope
            .bundle
            .ok_or_else(|| GraphError::not_found("bundle"))?;
        match (bundle.api_definition, bundle.event_definition) {
            (Some(api), Some(event)) if api.spec.is_some() && event.spec.is_some() => {
                Err(GraphError::protocol(
                    "definition id resolves to more than one specification",
                ))
            }
            (Some(SpecHolder { name, spec: Some(spec) }), _)
            | (_, Some(SpecHolder { name, spec: Some(spec) })) => Ok(SpecificationOutput {
                name,
                data: spec.data,
                format: spec.format,
            }),
            _ => Err(GraphError::not_found("specification")),
        }
    }

    async fn execute(&self, query: String) -> Result<Value> {
        self.transport.execute(GraphRequest::new(query)).await
    }
}

#[derive(Debug, Deserialize)]
struct SpecificationEnvelope {
    #[serde(default)]
    bundle: Option<SpecBundle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecBundle {
    #[serde(default)]
    api_definition: Option<SpecHolder>,
    #[serde(default)]
    event_definition: Option<SpecHolder>,
}

#[derive(Debug, Deserialize)]
struct SpecHolder {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    spec: Option<DefinitionSpec>,
}

/// Unwraps the `result` alias every client operation queries under.
fn decode_result<T: DeserializeOwned>(mut data: Value, what: &str) -> Result<T> {
    match data.get_mut("result").map(Value::take) {
        Some(node) if !node.is_null() => Ok(serde_json::from_value(node)?),
        _ => Err(GraphError::not_found(what)),
    }
}

fn verify_context(auth: &InstanceAuth, expected: &AuthCoordinates) -> Result<()> {
    let raw = auth
        .context
        .as_deref()
        .ok_or_else(|| GraphError::not_found("credential carries no context"))?;
    let context: Value = serde_json::from_str(raw).map_err(GraphError::AuthContext)?;
    let field = |key: &str| context.get(key).and_then(Value::as_str);
    let mut matches = field("instance_id") == Some(expected.instance_id.as_str());
    if let Some(binding_id) = expected.binding_id.as_deref() {
        matches = matches && field("binding_id") == Some(binding_id);
    }
    if matches {
        Ok(())
    } else {
        Err(GraphError::ContextMismatch)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::graph::testing::FakeTransport;
    use crate::graph::types::AuthStatusCondition;

    fn instance_coords() -> AuthCoordinates {
        AuthCoordinates::instance("instance-1")
    }

    #[tokio::test]
    async fn instance_auth_decodes_a_full_record() {
        let transport = FakeTransport::scripted(vec![Ok(json!({
            "result": {
                "id": "instance-1",
                "context": "{\"instance_id\": \"instance-1\"}",
                "status": {
                    "condition": "SUCCEEDED",
                    "timestamp": "2020-04-20T10:00:00Z",
                    "message": "auth created",
                    "reason": "CredentialsProvided"
                }
            }
        }))]);
        let client = RegistryClient::new(transport.clone());

        let auth = client
            .instance_auth("instance-1", &instance_coords())
            .await
            .expect("record should decode");

        assert_eq!(auth.condition(), Some(AuthStatusCondition::Succeeded));
        assert_eq!(transport.call_count(), 1);
        assert!(transport.queries()[0].contains("bundleInstanceAuth(id: \"instance-1\")"));
    }

    #[tokio::test]
    async fn empty_response_reads_as_not_found() {
        let transport = FakeTransport::scripted(vec![Ok(json!({}))]);
        let client = RegistryClient::new(transport);

        let err = client
            .instance_auth("instance-1", &instance_coords())
            .await
            .expect_err("missing result should fail");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn record_without_context_reads_as_not_found() {
        let transport = FakeTransport::scripted(vec![Ok(json!({"result": {}}))]);
        let client = RegistryClient::new(transport);

        let err = client
            .instance_auth("instance-1", &instance_coords())
            .await
            .expect_err("missing context should fail");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn malformed_context_is_fatal() {
        let transport =
            FakeTransport::scripted(vec![Ok(json!({"result": {"context": "not a json"}}))]);
        let client = RegistryClient::new(transport);

        let err = client
            .instance_auth("instance-1", &instance_coords())
            .await
            .expect_err("malformed context should fail");
        assert!(err.to_string().contains("while unmarshaling auth context"));
    }

    #[tokio::test]
    async fn mismatched_instance_coordinates_are_fatal() {
        let transport = FakeTransport::scripted(vec![Ok(
            json!({"result": {"context": "{\"instance_id\": \"someone-else\"}"}}),
        )]);
        let client = RegistryClient::new(transport);

        let err = client
            .instance_auth("instance-1", &instance_coords())
            .await
            .expect_err("foreign record should fail");
        assert!(matches!(err, GraphError::ContextMismatch));
        assert!(
            err.to_string()
                .contains("found binding with mismatched context coordinates")
        );
    }

    #[tokio::test]
    async fn mismatched_binding_coordinates_are_fatal() {
        let transport = FakeTransport::scripted(vec![Ok(json!({
            "result": {
                "context": "{\"instance_id\": \"instance-1\", \"binding_id\": \"someone-else\"}"
            }
        }))]);
        let client = RegistryClient::new(transport);

        let err = client
            .instance_auth(
                "binding-1",
                &AuthCoordinates::binding("instance-1", "binding-1"),
            )
            .await
            .expect_err("foreign binding should fail");
        assert!(matches!(err, GraphError::ContextMismatch));
    }

    #[tokio::test]
    async fn creation_mutation_carries_coordinates_and_params() {
        let transport = FakeTransport::scripted(vec![Ok(json!({
            "result": {"status": {"condition": "PENDING"}}
        }))]);
        let client = RegistryClient::new(transport.clone());

        let auth = client
            .request_auth_creation(&AuthCreationInput {
                bundle_id: "plan-1".into(),
                auth_id: "instance-1".into(),
                coordinates: instance_coords(),
                input_params: None,
            })
            .await
            .expect("creation should succeed");

        assert_eq!(auth.condition(), Some(AuthStatusCondition::Pending));
        let query = &transport.queries()[0];
        assert!(query.contains("requestBundleInstanceAuthCreation(bundleID: \"plan-1\""));
        assert!(query.contains("id: \"instance-1\""));
        assert!(query.contains("context: \"{\\\"instance_id\\\":\\\"instance-1\\\"}\""));
        assert!(query.contains("inputParams: \"null\""));
    }

    #[tokio::test]
    async fn deletion_passes_not_found_through() {
        let transport = FakeTransport::scripted(vec![Err(GraphError::not_found(
            "Object not found [object=BundleInstanceAuth]",
        ))]);
        let client = RegistryClient::new(transport);

        let err = client
            .request_auth_deletion("binding-1")
            .await
            .expect_err("deletion should surface the failure");
        assert!(err.is_not_found());
        assert!(
            err.to_string()
                .contains("while executing GraphQL call to delete the bundle instance auth")
        );
    }

    #[tokio::test]
    async fn binding_credentials_collect_target_urls() {
        let transport = FakeTransport::scripted(vec![Ok(json!({
            "result": {
                "apiDefinitions": {
                    "data": [
                        {"name": "payments", "targetURL": "https://api.example.com/payments"},
                        {"name": "refunds", "targetURL": "https://api.example.com/refunds"}
                    ]
                },
                "instanceAuth": {
                    "id": "binding-1",
                    "context": "{\"instance_id\": \"instance-1\", \"binding_id\": \"binding-1\"}",
                    "auth": {"credential": {"username": "user", "password": "pass"}},
                    "status": {"condition": "SUCCEEDED"}
                }
            }
        }))]);
        let client = RegistryClient::new(transport);

        let credentials = client
            .binding_credentials(
                "binding-1",
                &AuthCoordinates::binding("instance-1", "binding-1"),
            )
            .await
            .expect("credentials should decode");

        assert_eq!(
            credentials.target_urls.get("payments").map(String::as_str),
            Some("https://api.example.com/payments")
        );
        assert_eq!(credentials.auth.condition(), Some(AuthStatusCondition::Succeeded));
    }

    #[tokio::test]
    async fn specification_resolves_api_definitions() {
        let transport = FakeTransport::scripted(vec![Ok(json!({
            "result": {
                "bundle": {
                    "apiDefinition": {
                        "name": "payments",
                        "spec": {"data": "{\"openapi\": \"3.0.0\"}", "format": "JSON"}
                    }
                }
            }
        }))]);
        let client = RegistryClient::new(transport.clone());

        let spec = client
            .find_specification("app-1", "bundle-1", "def-1")
            .await
            .expect("api spec should resolve");

        assert_eq!(spec.name.as_deref(), Some("payments"));
        assert_eq!(spec.format.as_deref(), Some("JSON"));
        let query = &transport.queries()[0];
        assert!(query.contains("apiDefinition(id: \"def-1\")"));
        assert!(query.contains("eventDefinition(id: \"def-1\")"));
    }

    #[tokio::test]
    async fn specification_falls_back_to_event_definitions() {
        let transport = FakeTransport::scripted(vec![Ok(json!({
            "result": {
                "bundle": {
                    "eventDefinition": {
                        "name": "order-events",
                        "spec": {"data": "asyncapi: 2.0.0", "format": "YAML"}
                    }
                }
            }
        }))]);
        let client = RegistryClient::new(transport);

        let spec = client
            .find_specification("app-1", "bundle-1", "def-1")
            .await
            .expect("event spec should resolve");
        assert_eq!(spec.name.as_deref(), Some("order-events"));
    }

    #[tokio::test]
    async fn ambiguous_specification_violates_protocol() {
        let transport = FakeTransport::scripted(vec![Ok(json!({
            "result": {
                "bundle": {
                    "apiDefinition": {"spec": {"data": "a", "format": "JSON"}},
                    "eventDefinition": {"spec": {"data": "b", "format": "JSON"}}
                }
            }
        }))]);
        let client = RegistryClient::new(transport);

        let err = client
            .find_specification("app-1", "bundle-1", "def-1")
            .await
            .expect_err("two matches should fail");
        assert!(matches!(err, GraphError::Protocol(_)));
    }

    #[tokio::test]
    async fn unknown_specification_reads_as_not_found() {
        let transport = FakeTransport::scripted(vec![Ok(json!({"result": {"bundle": {}}}))]);
        let client = RegistryClient::new(transport);

        let err = client
            .find_specification("app-1", "bundle-1", "def-1")
            .await
            .expect_err("no definition should fail");
        assert!(err.is_not_found());
    }
}
