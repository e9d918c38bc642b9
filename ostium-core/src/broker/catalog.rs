//! Catalog assembly: the resource graph mapped to OSB service
//! offerings, one service per application and one plan per bundle.

use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::broker::Broker;
use crate::broker::error::BrokerError;
use crate::broker::osb::{
    CatalogResponse, InstanceSchemas, Plan, PlanMetadata, PlanSchemas, SchemaParameters, Service,
    ServiceMetadata,
};
use crate::graph::pipeline::{ApplicationGraph, BundleGraph};
use crate::graph::types::{ApiDefinition, EventDefinition, SpecificationOutput};

impl Broker {
    /// Walks the backend graph and converts it into the service catalog.
    pub async fn catalog(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CatalogResponse, BrokerError> {
        let graphs = self.fetcher.fetch_graph(cancel).await?;
        let services = graphs
            .iter()
            .map(|graph| convert_application(graph, &self.settings.spec_base_url))
            .collect::<Result<Vec<_>, _>>()?;
        info!(services = services.len(), "assembled catalog");
        Ok(CatalogResponse { services })
    }

    /// Resolves one definition's specification document for the URL
    /// embedded in catalog metadata.
    pub async fn specification(
        &self,
        application_id: &str,
        bundle_id: &str,
        definition_id: &str,
    ) -> Result<SpecificationOutput, BrokerError> {
        self.client
            .find_specification(application_id, bundle_id, definition_id)
            .await
            .map_err(Into::into)
    }
}

fn convert_application(
    graph: &ApplicationGraph,
    spec_base_url: &str,
) -> Result<Service, BrokerError> {
    let app = &graph.application;
    let description = app.description.clone().unwrap_or_else(|| {
        format!("service generated from application with name {}", app.name)
    });
    let plans = graph
        .bundles
        .iter()
        .map(|bundle| convert_bundle(&app.id, bundle, spec_base_url))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Service {
        id: app.id.clone(),
        name: app.name.clone(),
        description,
        bindable: true,
        instances_retrievable: false,
        bindings_retrievable: true,
        plan_updateable: false,
        plans,
        metadata: Some(ServiceMetadata {
            display_name: app.name.clone(),
            provider_display_name: app.provider_name.clone(),
            additional: app.labels.clone().unwrap_or_default(),
        }),
    })
}

fn convert_bundle(
    application_id: &str,
    graph: &BundleGraph,
    spec_base_url: &str,
) -> Result<Plan, BrokerError> {
    let bundle = &graph.bundle;
    let description = bundle
        .description
        .clone()
        .unwrap_or_else(|| format!("plan generated from bundle with name {}", bundle.name));
    let schemas = bundle
        .instance_auth_request_input_schema
        .as_deref()
        .map(parse_creation_schema)
        .transpose()?;
    let api_specs = graph
        .api_definitions
        .iter()
        .map(|def| api_spec_entry(spec_base_url, application_id, &bundle.id, def))
        .collect::<Result<Vec<_>, _>>()?;
    let event_specs = graph
        .event_definitions
        .iter()
        .map(|def| event_spec_entry(spec_base_url, application_id, &bundle.id, def))
        .collect::<Result<Vec<_>, _>>()?;
    let mut additional = Map::new();
    additional.insert("api_specs".into(), Value::Array(api_specs));
    additional.insert("event_specs".into(), Value::Array(event_specs));
    Ok(Plan {
        id: bundle.id.clone(),
        name: bundle.name.clone(),
        description,
        bindable: Some(true),
        metadata: Some(PlanMetadata { additional }),
        schemas,
    })
}

/// The bundle's creation input schema becomes the plan's
/// create-instance schema. Schema text that is not JSON is an error,
/// not a silently dropped field.
fn parse_creation_schema(raw: &str) -> Result<PlanSchemas, BrokerError> {
    let parameters: Value =
        serde_json::from_str(raw).map_err(|_| BrokerError::InvalidSchema(raw.to_owned()))?;
    Ok(PlanSchemas {
        service_instance: InstanceSchemas {
            create: SchemaParameters { parameters },
        },
        service_binding: Default::default(),
    })
}

fn api_spec_entry(
    base: &str,
    application_id: &str,
    bundle_id: &str,
    def: &ApiDefinition,
) -> Result<Value, BrokerError> {
    let mut entry = json!({
        "id": def.id,
        "name": def.name,
        "description": def.description,
        "target_url": def.target_url,
    });
    if let Some(spec) = &def.spec {
        entry["specification"] = json!({
            "type": spec.spec_type,
            "format": spec_content_type(spec.format.as_deref())?,
            "url": specification_url(base, application_id, bundle_id, &def.id),
        });
    }
    Ok(entry)
}

fn event_spec_entry(
    base: &str,
    application_id: &str,
    bundle_id: &str,
    def: &EventDefinition,
) -> Result<Value, BrokerError> {
    let mut entry = json!({
        "id": def.id,
        "name": def.name,
        "description": def.description,
    });
    if let Some(spec) = &def.spec {
        entry["specification"] = json!({
            "type": spec.spec_type,
            "format": spec_content_type(spec.format.as_deref())?,
            "url": specification_url(base, application_id, bundle_id, &def.id),
        });
    }
    Ok(entry)
}

fn specification_url(
    base: &str,
    application_id: &str,
    bundle_id: &str,
    definition_id: &str,
) -> String {
    format!(
        "{base}/specifications?app_id={application_id}&bundle_id={bundle_id}&definition_id={definition_id}"
    )
}

/// Content type for a spec format as the backend names it. Shared
/// between catalog metadata and the specifications endpoint.
pub fn spec_content_type(format: Option<&str>) -> Result<&'static str, BrokerError> {
    match format.unwrap_or_default() {
        "JSON" => Ok("application/json"),
        "YAML" => Ok("text/yaml"),
        "XML" => Ok("application/xml"),
        other => Err(BrokerError::UnknownSpecFormat(other.to_owned())),
    }
}
