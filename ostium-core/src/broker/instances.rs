//! Provision, deprovision and the instance-scoped operation poll.

use tracing::{debug, info};

use crate::broker::error::BrokerError;
use crate::broker::osb::{LastOperationResponse, ProvisionRequest};
use crate::broker::state::{OperationState, map_condition};
use crate::broker::token::{InstanceOperation, OperationToken, OperationType};
use crate::broker::{
    AcceptedOperation, Broker, map_missing, require_condition, status_message,
    validate_parameters,
};
use crate::graph::client::AuthCreationInput;
use crate::graph::types::{AuthCoordinates, AuthStatusCondition};

impl Broker {
    /// Provisions a service instance by requesting a credential against
    /// the plan's bundle, with the instance ID doubling as the
    /// credential ID. A record that already exists for these
    /// coordinates makes the call an idempotent retry.
    pub async fn provision(
        &self,
        instance_id: &str,
        request: &ProvisionRequest,
        async_allowed: bool,
    ) -> Result<AcceptedOperation, BrokerError> {
        if !async_allowed {
            return Err(BrokerError::AsyncRequired);
        }
        let coordinates = AuthCoordinates::instance(instance_id);
        let operation = OperationToken::Provision(InstanceOperation {
            service_id: request.service_id.clone(),
            plan_id: request.plan_id.clone(),
            auth_id: instance_id.to_owned(),
        })
        .encode();
        match self.client.instance_auth(instance_id, &coordinates).await {
            Ok(_) => {
                debug!(instance_id, "instance credential already exists, reusing");
                Ok(AcceptedOperation {
                    operation,
                    already_exists: true,
                })
            }
            Err(err) if err.is_not_found() => {
                let input_params = validate_parameters(request.parameters.as_ref())?;
                info!(
                    instance_id,
                    plan_id = %request.plan_id,
                    "requesting instance credential creation"
                );
                self.client
                    .request_auth_creation(&AuthCreationInput {
                        bundle_id: request.plan_id.clone(),
                        auth_id: instance_id.to_owned(),
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

    /// Deprovisions an instance by requesting deletion of its
    /// credential. A credential already in the `UNUSED` condition is
    /// mid-deletion; no second deletion request is issued for it.
    pub async fn deprovision(
        &self,
        instance_id: &str,
        service_id: &str,
        plan_id: &str,
        async_allowed: bool,
    ) -> Result<String, BrokerError> {
        if !async_allowed {
            return Err(BrokerError::AsyncRequired);
        }
        let coordinates = AuthCoordinates::instance(instance_id);
        let auth = self
            .client
            .instance_auth(instance_id, &coordinates)
            .await
            .map_err(|err| map_missing(err, BrokerError::InstanceNotFound))?;
        let operation = OperationToken::Deprovision(InstanceOperation {
            service_id: service_id.to_owned(),
            plan_id: plan_id.to_owned(),
            auth_id: instance_id.to_owned(),
        })
        .encode();
        if require_condition(&auth)? == AuthStatusCondition::Unused {
            debug!(instance_id, "instance credential already deleting");
            return Ok(operation);
        }
        info!(instance_id, "requesting instance credential deletion");
        self.client
            .request_auth_deletion(instance_id)
            .await
            .map_err(|err| map_missing(err, BrokerError::InstanceNotFound))?;
        Ok(operation)
    }

    /// Polls an instance operation. The token supplies the credential
    /// coordinates; the record's current condition is translated by the
    /// status mapper, and a record that has disappeared during a
    /// deprovision reads as terminal success.
    pub async fn instance_last_operation(
        &self,
        instance_id: &str,
        operation: Option<&str>,
    ) -> Result<LastOperationResponse, BrokerError> {
        let token = operation
            .ok_or_else(|| BrokerError::InvalidToken("missing from the request".into()))?;
        let coordinates = AuthCoordinates::instance(instance_id);
        match OperationToken::decode(token)? {
            OperationToken::Provision(op) => {
                let auth = self
                    .client
                    .instance_auth(&op.auth_id, &coordinates)
                    .await
                    .map_err(|err| map_missing(err, BrokerError::InstanceNotFound))?;
                let (state, _) =
                    map_condition(OperationType::Provision, require_condition(&auth)?)?;
                Ok(LastOperationResponse {
                    state,
                    description: status_message(&auth),
                })
            }
            OperationToken::Deprovision(op) => {
                match self.client.instance_auth(&op.auth_id, &coordinates).await {
                    Ok(auth) => {
                        let (state, _) =
                            map_condition(OperationType::Deprovision, require_condition(&auth)?)?;
                        Ok(LastOperationResponse {
                            state,
                            description: status_message(&auth),
                        })
                    }
                    Err(err) if err.is_not_found() => Ok(LastOperationResponse {
                        state: OperationState::Succeeded,
                        description: Some("service instance deleted".into()),
                    }),
                    Err(err) => Err(err.into()),
                }
            }
            OperationToken::Bind | OperationToken::Unbind => Err(BrokerError::InvalidToken(
                "binding operation polled at the instance endpoint".into(),
            )),
        }
    }
}
