//! Bind, unbind, the binding-scoped operation poll and get-binding.
//!
//! Binding credentials are keyed by the binding ID itself, so the
//! operation tokens here carry no coordinates; every poll re-derives
//! them from the request path.

use serde_json::Value;
use tracing::{debug, info};

use crate::broker::error::BrokerError;
use crate::broker::osb::{BindRequest, BindingCredentials, BindingResponse, LastOperationResponse};
use crate::broker::state::{OperationState, map_condition};
use crate::broker::token::{OperationToken, OperationType};
use crate::broker::{
    AcceptedOperation, Broker, map_missing, require_condition, status_message,
    validate_parameters,
};
use crate::graph::client::AuthCreationInput;
use crate::graph::types::{AuthCoordinates, AuthStatusCondition};

impl Broker {
    /// Binds against a service instance by requesting a credential whose
    /// context carries both coordinate IDs. An existing record for this
    /// binding makes the call an idempotent retry.
    pub async fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        request: &BindRequest,
        async_allowed: bool,
    ) -> Result<AcceptedOperation, BrokerError> {
        if !async_allowed {
            return Err(BrokerError::AsyncRequired);
        }
        let coordinates = AuthCoordinates::binding(instance_id, binding_id);
        let operation = OperationToken::Bind.encode();
        match self.client.instance_auth(binding_id, &coordinates).await {
            Ok(_) => {
                debug!(instance_id, binding_id, "binding credential already exists, reusing");
                Ok(AcceptedOperation {
                    operation,
                    already_exists: true,
                })
            }
            Err(err) if err.is_not_found() => {
                let input_params = validate_parameters(request.parameters.as_ref())?;
                info!(
                    instance_id,
                    binding_id,
                    plan_id = %request.plan_id,
                    "requesting binding credential creation"
                );
                self.client
                    .request_auth_creation(&AuthCreationInput {
                        bundle_id: request.plan_id.clone(),
                        auth_id: binding_id.to_owned(),
                        coordinates,
                        input_params,
                    })
                    .await?;
                Ok(AcceptedOperation {
                    operation,
                    already_exists: false,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Unbinds by requesting deletion of the binding credential. A
    /// missing record is surfaced as "binding does not exist"; a record
    /// already in the `UNUSED` condition is mid-deletion and gets no
    /// second deletion request.
    pub async fn unbind(
        &self,
        instance_id: &str,
        binding_id: &str,
        async_allowed: bool,
    ) -> Result<String, BrokerError> {
        if !async_allowed {
            return Err(BrokerError::AsyncRequired);
        }
        let coordinates = AuthCoordinates::binding(instance_id, binding_id);
        let auth = self
            .client
            .instance_auth(binding_id, &coordinates)
            .await
            .map_err(|err| map_missing(err, BrokerError::BindingNotFound))?;
        let operation = OperationToken::Unbind.encode();
        if require_condition(&auth)? == AuthStatusCondition::Unused {
            debug!(instance_id, binding_id, "binding credential already deleting");
            return Ok(operation);
        }
        info!(instance_id, binding_id, "requesting binding credential deletion");
        self.client
            .request_auth_deletion(binding_id)
            .await
            .map_err(|err| map_missing(err, BrokerError::BindingNotFound))?;
        Ok(operation)
    }

    /// Polls a binding operation; coordinates come from the request
    /// path, the token only selects which state machine applies.
    pub async fn binding_last_operation(
        &self,
        instance_id: &str,
        binding_id: &str,
        operation: Option<&str>,
    ) -> Result<LastOperationResponse, BrokerError> {
        let token = operation
            .ok_or_else(|| BrokerError::InvalidToken("missing from the request".into()))?;
        let coordinates = AuthCoordinates::binding(instance_id, binding_id);
        match OperationToken::decode(token)? {
            OperationToken::Bind => {
                let auth = self
                    .client
                    .instance_auth(binding_id, &coordinates)
                    .await
                    .map_err(|err| map_missing(err, BrokerError::BindingNotFound))?;
                let (state, _) = map_condition(OperationType::Bind, require_condition(&auth)?)?;
                Ok(LastOperationResponse {
                    state,
                    description: status_message(&auth),
                })
            }
            OperationToken::Unbind => {
                match self.client.instance_auth(binding_id, &coordinates).await {
                    Ok(auth) => {
                        let (state, _) =
                            map_condition(OperationType::Unbind, require_condition(&auth)?)?;
                        Ok(LastOperationResponse {
                            state,
                            description: status_message(&auth),
                        })
                    }
                    Err(err) if err.is_not_found() => Ok(LastOperationResponse {
                        state: OperationState::Succeeded,
                        description: Some("service binding deleted".into()),
                    }),
                    Err(err) => Err(err.into()),
                }
            }
            OperationToken::Provision(_) | OperationToken::Deprovision(_) => {
                Err(BrokerError::InvalidToken(
                    "instance operation polled at the binding endpoint".into(),
                ))
            }
        }
    }

    /// Fetches the credentials of a finished binding. Anything short of
    /// a terminal `SUCCEEDED` condition answers "not ready" so the
    /// platform keeps retrying.
    pub async fn get_binding(
        &self,
        instance_id: &str,
        binding_id: &str,
    ) -> Result<BindingResponse, BrokerError> {
        let coordinates = AuthCoordinates::binding(instance_id, binding_id);
        let bound = self
            .client
            .binding_credentials(binding_id, &coordinates)
            .await
            .map_err(|err| map_missing(err, BrokerError::BindingNotReady))?;
        if require_condition(&bound.auth)? != AuthStatusCondition::Succeeded {
            debug!(instance_id, binding_id, "binding credential not ready yet");
            return Err(BrokerError::BindingNotReady);
        }
        Ok(BindingResponse {
            credentials: BindingCredentials {
                auth_details: bound.auth.auth.unwrap_or(Value::Null),
                target_urls: bound.target_urls,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::broker::BrokerSettings;
    use crate::broker::token::InstanceOperation;
    use crate::graph::testing::FakeTransport;

    fn broker(transport: Arc<FakeTransport>) -> Broker {
        Broker::new(
            transport,
            BrokerSettings {
                spec_base_url: "http://broker.local".into(),
                page_size: 50,
                parallelism: 4,
            },
        )
    }

    fn bind_request() -> BindRequest {
        BindRequest {
            service_id: "app-1".into(),
            plan_id: "bundle-1".into(),
            bind_resource: None,
            context: None,
            parameters: None,
        }
    }

    fn binding_record(condition: &str) -> serde_json::Value {
        json!({
            "result": {
                "id": "binding-1",
                "context": "{\"instance_id\": \"instance-1\", \"binding_id\": \"binding-1\"}",
                "status": {"condition": condition, "message": "from the backend"}
            }
        })
    }

    #[tokio::test]
    async fn bind_refuses_synchronous_platforms() {
        let transport = FakeTransport::scripted(vec![]);
        let broker = broker(transport.clone());

        let err = broker
            .bind("instance-1", "binding-1", &bind_request(), false)
            .await
            .expect_err("synchronous binding should be refused");

        assert!(matches!(err, BrokerError::AsyncRequired));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn bind_creates_credentials_with_both_coordinates() {
        let transport = FakeTransport::scripted(vec![
            Ok(json!({})),
            Ok(json!({"result": {"status": {"condition": "PENDING"}}})),
        ]);
        let broker = broker(transport.clone());

        let accepted = broker
            .bind("instance-1", "binding-1", &bind_request(), true)
            .await
            .expect("binding should be accepted");

        assert!(!accepted.already_exists);
        assert_eq!(
            OperationToken::decode(&accepted.operation).expect("token should decode"),
            OperationToken::Bind
        );
        let creation = &transport.queries()[1];
        assert!(creation.contains("requestBundleInstanceAuthCreation(bundleID: \"bundle-1\""));
        assert!(creation.contains("id: \"binding-1\""));
        assert!(creation.contains(
            "context: \"{\\\"instance_id\\\":\\\"instance-1\\\",\\\"binding_id\\\":\\\"binding-1\\\"}\""
        ));
    }

    #[tokio::test]
    async fn bind_reuses_existing_credentials_without_creating() {
        let transport = FakeTransport::scripted(vec![Ok(binding_record("SUCCEEDED"))]);
        let broker = broker(transport.clone());

        let accepted = broker
            .bind("instance-1", "binding-1", &bind_request(), true)
            .await
            .expect("the retry should be accepted");

        assert!(accepted.already_exists);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn unbind_of_a_missing_binding_is_gone() {
        let transport = FakeTransport::scripted(vec![Ok(json!({}))]);
        let broker = broker(transport);

        let err = broker
            .unbind("instance-1", "binding-1", true)
            .await
            .expect_err("missing bindings cannot be unbound");

        assert!(matches!(err, BrokerError::BindingNotFound));
    }

    #[tokio::test]
    async fn unbind_skips_deletion_for_an_unused_credential() {
        let transport = FakeTransport::scripted(vec![Ok(binding_record("UNUSED"))]);
        let broker = broker(transport.clone());

        let operation = broker
            .unbind("instance-1", "binding-1", true)
            .await
            .expect("an already-deleting credential still answers with a token");

        assert_eq!(
            OperationToken::decode(&operation).expect("token should decode"),
            OperationToken::Unbind
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn unbind_requests_deletion() {
        let transport = FakeTransport::scripted(vec![
            Ok(binding_record("SUCCEEDED")),
            Ok(json!({"result": {"id": "binding-1", "status": {"condition": "UNUSED"}}})),
        ]);
        let broker = broker(transport.clone());

        broker
            .unbind("instance-1", "binding-1", true)
            .await
            .expect("unbinding should be accepted");

        assert_eq!(transport.call_count(), 2);
        assert!(transport.queries()[1].contains("requestBundleInstanceAuthDeletion"));
    }

    #[tokio::test]
    async fn unbind_poll_succeeds_once_the_record_is_gone() {
        let transport = FakeTransport::scripted(vec![Ok(json!({}))]);
        let broker = broker(transport.clone());
        let token = OperationToken::Unbind.encode();

        let poll = broker
            .binding_last_operation("instance-1", "binding-1", Some(&token))
            .await
            .expect("the poll should answer");

        assert_eq!(poll.state, OperationState::Succeeded);
        assert_eq!(poll.description.as_deref(), Some("service binding deleted"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn unbind_poll_hides_a_failed_condition() {
        let transport = FakeTransport::scripted(vec![Ok(binding_record("FAILED"))]);
        let broker = broker(transport);
        let token = OperationToken::Unbind.encode();

        let poll = broker
            .binding_last_operation("instance-1", "binding-1", Some(&token))
            .await
            .expect("the poll should answer");

        assert_eq!(poll.state, OperationState::InProgress);
    }

    #[tokio::test]
    async fn bind_poll_follows_the_condition() {
        let transport = FakeTransport::scripted(vec![Ok(binding_record("SUCCEEDED"))]);
        let broker = broker(transport);
        let token = OperationToken::Bind.encode();

        let poll = broker
            .binding_last_operation("instance-1", "binding-1", Some(&token))
            .await
            .expect("the poll should answer");

        assert_eq!(poll.state, OperationState::Succeeded);
        assert_eq!(poll.description.as_deref(), Some("from the backend"));
    }

    #[tokio::test]
    async fn binding_poll_rejects_instance_tokens() {
        let transport = FakeTransport::scripted(vec![]);
        let broker = broker(transport);
        let token = OperationToken::Provision(InstanceOperation {
            service_id: "app-1".into(),
            plan_id: "bundle-1".into(),
            auth_id: "instance-1".into(),
        })
        .encode();

        let err = broker
            .binding_last_operation("instance-1", "binding-1", Some(&token))
            .await
            .expect_err("instance tokens do not belong here");

        assert!(matches!(err, BrokerError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn get_binding_is_not_ready_while_pending() {
        let transport = FakeTransport::scripted(vec![Ok(json!({
            "result": {
                "instanceAuth": {
                    "id": "binding-1",
                    "context": "{\"instance_id\": \"instance-1\", \"binding_id\": \"binding-1\"}",
                    "status": {"condition": "PENDING"}
                }
            }
        }))]);
        let broker = broker(transport);

        let err = broker
            .get_binding("instance-1", "binding-1")
            .await
            .expect_err("pending credentials are not handed out");

        assert!(matches!(err, BrokerError::BindingNotReady));
    }

    #[tokio::test]
    async fn get_binding_returns_credentials_once_succeeded() {
        let transport = FakeTransport::scripted(vec![Ok(json!({
            "result": {
                "apiDefinitions": {
                    "data": [
                        {"name": "payments", "targetURL": "https://api.example.com/payments"}
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
        let broker = broker(transport);

        let response = broker
            .get_binding("instance-1", "binding-1")
            .await
            .expect("finished bindings hand out credentials");

        assert_eq!(
            response.credentials.target_urls.get("payments").map(String::as_str),
            Some("https://api.example.com/payments")
        );
        assert_eq!(
            response.credentials.auth_details["credential"]["username"],
            json!("user")
        );
    }

    #[tokio::test]
    async fn get_binding_of_a_missing_record_is_not_ready() {
        let transport = FakeTransport::scripted(vec![Ok(json!({}))]);
        let broker = broker(transport);

        let err = broker
            .get_binding("instance-1", "binding-1")
            .await
            .expect_err("missing bindings read as not ready");

        assert!(matches!(err, BrokerError::BindingNotReady));
    }
}
