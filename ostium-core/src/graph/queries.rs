//! Query and mutation builders. Every argument is inlined into the
//! document text; operations that page carry `first`/`after` arguments
//! produced from [`PageArgs`].

use serde_json::Value;

use crate::graph::fields;
use crate::graph::paginator::{PageArgs, PagedQuery};
use crate::graph::types::{ApiDefinition, Application, Bundle, Document, EventDefinition};

/// Renders a string as a document-safe quoted literal.
fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

/// Renders an arbitrary JSON value as a quoted literal holding its
/// serialized form, the shape the auth mutations expect for `context`
/// and `inputParams`.
fn quoted_json(value: &Value) -> String {
    let text = value.to_string();
    quoted(&text)
}

fn page_arguments(page: &PageArgs<'_>) -> String {
    match page.after {
        Some(cursor) => format!("first: {}, after: {}", page.first, quoted(cursor)),
        None => format!("first: {}", page.first),
    }
}

pub(crate) fn applications(page: &PageArgs<'_>) -> String {
    format!(
        "query {{ result: applications({args}) {{ {conn} }} }}",
        args = page_arguments(page),
        conn = fields::connection(fields::application()),
    )
}

pub(crate) fn bundles(application_id: &str, page: &PageArgs<'_>) -> String {
    format!(
        "query {{ result: application(id: {id}) {{ bundles({args}) {{ {conn} }} }} }}",
        id = quoted(application_id),
        args = page_arguments(page),
        conn = fields::connection(fields::bundle()),
    )
}

fn bundle_collection(
    application_id: &str,
    bundle_id: &str,
    collection: &str,
    page: &PageArgs<'_>,
    item_fields: &str,
) -> String {
    format!(
        "query {{ result: application(id: {app}) {{ bundle(id: {bundle}) \
{{ {collection}({args}) {{ {conn} }} }} }} }}",
        app = quoted(application_id),
        bundle = quoted(bundle_id),
        args = page_arguments(page),
        conn = fields::connection(item_fields),
    )
}

pub(crate) fn instance_auth(auth_id: &str) -> String {
    format!(
        "query {{ result: bundleInstanceAuth(id: {id}) {{ {fields} }} }}",
        id = quoted(auth_id),
        fields = fields::instance_auth(),
    )
}

pub(crate) fn bundle_by_auth(auth_id: &str) -> String {
    let id = quoted(auth_id);
    format!(
        "query {{ result: bundleByInstanceAuth(authID: {id}) {{ \
apiDefinitions {{ data {{ name targetURL }} }} \
instanceAuth(id: {id}) {{ id context inputParams auth {{ {auth} }} \
status {{ {status} }} }} }} }}",
        auth = fields::auth(),
        status = fields::auth_status(),
    )
}

pub(crate) fn request_auth_creation(
    bundle_id: &str,
    auth_id: &str,
    context: &Value,
    input_params: &Value,
) -> String {
    format!(
        "mutation {{ result: requestBundleInstanceAuthCreation(bundleID: {bundle}, \
in: {{ id: {id}, context: {context}, inputParams: {params} }}) \
{{ status {{ {status} }} }} }}",
        bundle = quoted(bundle_id),
        id = quoted(auth_id),
        context = quoted_json(context),
        params = quoted_json(input_params),
        status = fields::auth_status(),
    )
}

pub(crate) fn request_auth_deletion(auth_id: &str) -> String {
    format!(
        "mutation {{ result: requestBundleInstanceAuthDeletion(authID: {id}) \
{{ id status {{ {status} }} }} }}",
        id = quoted(auth_id),
        status = fields::auth_status(),
    )
}

pub(crate) fn specification(application_id: &str, bundle_id: &str, definition_id: &str) -> String {
    let def = quoted(definition_id);
    format!(
        "query {{ result: application(id: {app}) {{ bundle(id: {bundle}) {{ \
apiDefinition(id: {def}) {{ name spec {{ {spec} }} }} \
eventDefinition(id: {def}) {{ name spec {{ {spec} }} }} }} }} }}",
        app = quoted(application_id),
        bundle = quoted(bundle_id),
        spec = fields::definition_spec(),
    )
}

/// Root application listing.
#[derive(Debug, Clone, Copy)]
pub struct ApplicationsQuery;

impl PagedQuery for ApplicationsQuery {
    type Item = Application;

    fn query(&self, page: &PageArgs<'_>) -> String {
        applications(page)
    }

    fn path(&self) -> &[&'static str] {
        &["result"]
    }
}

/// Bundles of one application.
#[derive(Debug, Clone)]
pub struct BundlesQuery {
    pub application_id: String,
}

impl PagedQuery for BundlesQuery {
    type Item = Bundle;

    fn query(&self, page: &PageArgs<'_>) -> String {
        bundles(&self.application_id, page)
    }

    fn path(&self) -> &[&'static str] {
        &["result", "bundles"]
    }
}

/// API definitions of one bundle.
#[derive(Debug, Clone)]
pub struct ApiDefinitionsQuery {
    pub application_id: String,
    pub bundle_id: String,
}

impl PagedQuery for ApiDefinitionsQuery {
    type Item = ApiDefinition;

    fn query(&self, page: &PageArgs<'_>) -> String {
        bundle_collection(
            &self.application_id,
            &self.bundle_id,
            "apiDefinitions",
            page,
            &fields::api_definition(),
        )
    }

    fn path(&self) -> &[&'static str] {
        &["result", "bundle", "apiDefinitions"]
    }
}

/// Event definitions of one bundle.
#[derive(Debug, Clone)]
pub struct EventDefinitionsQuery {
    pub application_id: String,
    pub bundle_id: String,
}

impl PagedQuery for EventDefinitionsQuery {
    type Item = EventDefinition;

    fn query(&self, page: &PageArgs<'_>) -> String {
        bundle_collection(
            &self.application_id,
            &self.bundle_id,
            "eventDefinitions",
            page,
            &fields::event_definition(),
        )
    }

    fn path(&self) -> &[&'static str] {
        &["result", "bundle", "eventDefinitions"]
    }
}

/// Documents of one bundle.
#[derive(Debug, Clone)]
pub struct DocumentsQuery {
    pub application_id: String,
    pub bundle_id: String,
}

impl PagedQuery for DocumentsQuery {
    type Item = Document;

    fn query(&self, page: &PageArgs<'_>) -> String {
        bundle_collection(
            &self.application_id,
            &self.bundle_id,
            "documents",
            page,
            fields::document(),
        )
    }

    fn path(&self) -> &[&'static str] {
        &["result", "bundle", "documents"]
    }
}
