//! Stateless operation tokens.
//!
//! The broker keeps no operation store: everything a later poll needs is
//! carried inside the token handed to the platform. Provisioning tokens
//! embed the full instance coordinates; binding tokens carry only the
//! operation kind, because the binding ID in the poll URL already
//! identifies the credential.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::broker::error::BrokerError;

const DELIMITER: char = ':';

/// The four operation kinds a token can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Provision,
    Deprovision,
    Bind,
    Unbind,
}

impl OperationType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Deprovision => "deprovision",
            Self::Bind => "bind",
            Self::Unbind => "unbind",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinates of an in-flight instance operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceOperation {
    pub service_id: String,
    pub plan_id: String,
    pub auth_id: String,
}

/// Decoded form of the opaque token returned to the platform.
///
/// Invariant: `decode(encode(t)) == t` for every value; a token that
/// does not round-trip was never issued by this broker and decoding it
/// is a fatal protocol error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationToken {
    Provision(InstanceOperation),
    Deprovision(InstanceOperation),
    Bind,
    Unbind,
}

impl OperationToken {
    pub fn op_type(&self) -> OperationType {
        match self {
            Self::Provision(_) => OperationType::Provision,
            Self::Deprovision(_) => OperationType::Deprovision,
            Self::Bind => OperationType::Bind,
            Self::Unbind => OperationType::Unbind,
        }
    }

    /// Renders the token as an opaque, URL-safe string.
    pub fn encode(&self) -> String {
        let joined = match self {
            Self::Provision(op) | Self::Deprovision(op) => [
                self.op_type().as_str(),
                &op.service_id,
                &op.plan_id,
                &op.auth_id,
            ]
            .join(&DELIMITER.to_string()),
            Self::Bind | Self::Unbind => self.op_type().as_str().to_owned(),
        };
        URL_SAFE_NO_PAD.encode(joined)
    }

    /// Recovers the tuple an earlier [`OperationToken::encode`] produced.
    /// Field-count or operation-kind mismatches mean the platform sent
    /// back something this broker never issued.
    pub fn decode(token: &str) -> Result<Self, BrokerError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| BrokerError::InvalidToken("not url-safe base64".into()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| BrokerError::InvalidToken("not valid UTF-8".into()))?;
        let fields: Vec<&str> = text.split(DELIMITER).collect();
        match fields.as_slice() {
            ["provision", service_id, plan_id, auth_id] => {
                Ok(Self::Provision(InstanceOperation {
                    service_id: (*service_id).to_owned(),
                    plan_id: (*plan_id).to_owned(),
                    auth_id: (*auth_id).to_owned(),
                }))
            }
            ["deprovision", service_id, plan_id, auth_id] => {
                Ok(Self::Deprovision(InstanceOperation {
                    service_id: (*service_id).to_owned(),
                    plan_id: (*plan_id).to_owned(),
                    auth_id: (*auth_id).to_owned(),
                }))
            }
            ["bind"] => Ok(Self::Bind),
            ["unbind"] => Ok(Self::Unbind),
            _ => Err(BrokerError::InvalidToken(
                "unrecognized operation tuple".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinates() -> InstanceOperation {
        InstanceOperation {
            service_id: "app-1".into(),
            plan_id: "bundle-1".into(),
            auth_id: "instance-1".into(),
        }
    }

    #[test]
    fn provision_tokens_round_trip() {
        let token = OperationToken::Provision(coordinates());
        let decoded = OperationToken::decode(&token.encode()).expect("token should decode");
        assert_eq!(decoded, token);
    }

    #[test]
    fn deprovision_tokens_round_trip() {
        let token = OperationToken::Deprovision(coordinates());
        let decoded = OperationToken::decode(&token.encode()).expect("token should decode");
        assert_eq!(decoded, token);
    }

    #[test]
    fn binding_tokens_carry_only_the_kind() {
        for token in [OperationToken::Bind, OperationToken::Unbind] {
            let decoded = OperationToken::decode(&token.encode()).expect("token should decode");
            assert_eq!(decoded, token);
        }
    }

    #[test]
    fn encoded_tokens_use_a_url_safe_alphabet() {
        let encoded = OperationToken::Provision(coordinates()).encode();
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn garbage_is_a_fatal_token_error() {
        let err = OperationToken::decode("!!! not base64 !!!").expect_err("garbage should fail");
        assert!(matches!(err, BrokerError::InvalidToken(_)));
    }

    #[test]
    fn wrong_field_count_is_a_fatal_token_error() {
        let truncated = URL_SAFE_NO_PAD.encode("provision:app-1:bundle-1");
        let err = OperationToken::decode(&truncated).expect_err("short tuple should fail");
        assert!(matches!(err, BrokerError::InvalidToken(_)));
    }

    #[test]
    fn unknown_operation_kind_is_a_fatal_token_error() {
        let forged = URL_SAFE_NO_PAD.encode("destroy:app-1:bundle-1:instance-1");
        let err = OperationToken::decode(&forged).expect_err("unknown kind should fail");
        assert!(matches!(err, BrokerError::InvalidToken(_)));
    }
}
