//! Field selections for the backend schema, one provider per object type.
//! Query builders in [`super::queries`] splice these into full documents.

pub(crate) fn application() -> &'static str {
    "id name providerName description labels"
}

pub(crate) fn bundle() -> &'static str {
    "id name description instanceAuthRequestInputSchema"
}

pub(crate) fn api_definition() -> String {
    format!("id name description targetURL spec {{ {} }}", definition_spec())
}

pub(crate) fn event_definition() -> String {
    format!("id name description spec {{ {} }}", definition_spec())
}

pub(crate) fn definition_spec() -> &'static str {
    "data format type"
}

pub(crate) fn document() -> &'static str {
    "id title displayName description format data"
}

pub(crate) fn auth_status() -> &'static str {
    "condition timestamp message reason"
}

pub(crate) fn instance_auth() -> String {
    format!("id context status {{ {} }}", auth_status())
}

/// Full auth payload, credential union expanded per concrete type.
pub(crate) fn auth() -> String {
    let credential = "credential { \
... on BasicCredentialData { username password } \
... on OAuthCredentialData { clientId clientSecret url } }";
    format!(
        "{credential} additionalHeaders additionalQueryParams \
requestAuth {{ csrf {{ tokenEndpointURL {credential} \
additionalHeaders additionalQueryParams }} }}"
    )
}

pub(crate) fn page_info() -> &'static str {
    "startCursor endCursor hasNextPage"
}

/// Wraps item fields into the connection envelope every collection query
/// returns.
pub(crate) fn connection(item_fields: &str) -> String {
    format!(
        "data {{ {item_fields} }} pageInfo {{ {} }} totalCount",
        page_info()
    )
}
