//! Translation from the remote credential vocabulary to OSB operation
//! states.

use serde::Serialize;

use crate::broker::error::BrokerError;
use crate::broker::token::OperationType;
use crate::graph::types::AuthStatusCondition;

/// The three states the OSB polling protocol understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

/// Maps a remote credential condition onto `(state, terminal)` for the
/// operation being polled.
///
/// Create operations follow the condition directly. Delete operations
/// always read as in-progress regardless of condition: a deletion only
/// completes when the record disappears, and the poll endpoints detect
/// that through the not-found answer.
///
/// `UNUSED` while polling a create operation has no documented meaning
/// and maps to its own error instead of a state.
pub fn map_condition(
    op: OperationType,
    condition: AuthStatusCondition,
) -> Result<(OperationState, bool), BrokerError> {
    match op {
        OperationType::Provision | OperationType::Bind => match condition {
            AuthStatusCondition::Succeeded => Ok((OperationState::Succeeded, true)),
            AuthStatusCondition::Pending => Ok((OperationState::InProgress, false)),
            AuthStatusCondition::Failed => Ok((OperationState::Failed, true)),
            AuthStatusCondition::Unused => Err(BrokerError::UnexpectedUnusedCredential),
        },
        OperationType::Deprovision | OperationType::Unbind => {
            Ok((OperationState::InProgress, false))
        }
    }
}
