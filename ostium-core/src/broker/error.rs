use thiserror::Error;

use crate::graph::GraphError;

/// Failures surfaced by the OSB endpoint state machines.
///
/// The variants are the protocol-level answers the HTTP layer maps onto
/// status codes; anything the endpoints do not translate themselves
/// passes through as [`BrokerError::Graph`].
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The platform refused asynchronous completion, which every
    /// mutating operation of this broker requires.
    #[error("asynchronous support required")]
    AsyncRequired,

    #[error("instance does not exist")]
    InstanceNotFound,

    #[error("binding does not exist")]
    BindingNotFound,

    /// The binding exists remotely but its credentials have not reached
    /// a terminal `SUCCEEDED` condition yet.
    #[error("binding credentials are not ready")]
    BindingNotReady,

    #[error("malformed request parameters: {0}")]
    MalformedParameters(String),

    /// The platform presented a token this broker never issued, or one
    /// issued under an incompatible format. Fatal, never retryable.
    #[error("invalid operation token: {0}")]
    InvalidToken(String),

    /// A credential reported `UNUSED` while a create operation was being
    /// polled. The remote lifecycle does not document this transition;
    /// it is surfaced as its own variant instead of being folded into
    /// failed or in-progress.
    #[error("credential is in the UNUSED condition during a create operation")]
    UnexpectedUnusedCredential,

    #[error("while unmarshaling JSON schema: {0}")]
    InvalidSchema(String),

    #[error("unknown spec format {0}")]
    UnknownSpecFormat(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
