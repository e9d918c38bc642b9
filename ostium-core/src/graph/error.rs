use thiserror::Error;

/// Failures raised while talking to the graph backend.
///
/// `NotFound` is a capability in its own right: callers branch on
/// [`GraphError::is_not_found`] to turn missing remote records into
/// protocol-level "does not exist" answers instead of failures.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("graph backend rejected the request: {0}")]
    Backend(String),

    #[error("while decoding graph response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("while unmarshaling auth context: {0}")]
    AuthContext(#[source] serde_json::Error),

    #[error("found binding with mismatched context coordinates")]
    ContextMismatch,

    #[error("while {context}: {source}")]
    Fetch {
        context: String,
        #[source]
        source: Box<GraphError>,
    },

    #[error("graph protocol violation: {0}")]
    Protocol(String),
}

impl GraphError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn protocol(what: impl Into<String>) -> Self {
        Self::Protocol(what.into())
    }

    /// Wraps an error with the operation it interrupted, keeping the
    /// original as the source so `is_not_found` still sees through it.
    pub fn while_doing(self, context: impl Into<String>) -> Self {
        Self::Fetch {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True when the error, at any wrapping depth, reports a missing
    /// remote object.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Fetch { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
