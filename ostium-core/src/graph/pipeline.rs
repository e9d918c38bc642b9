//! Concurrent assembly of the application resource graph.
//!
//! Applications are listed on the calling task; everything below fans
//! out through a [`Scheduler`]: one task per application drains its
//! bundles, then three tasks per bundle drain API definitions, event
//! definitions and documents. Results land in write-once slots, so no
//! task ever waits on a sibling.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::graph::error::{GraphError, Result};
use crate::graph::paginator::{PagedQuery, Paginator};
use crate::graph::queries::{
    ApiDefinitionsQuery, ApplicationsQuery, BundlesQuery, DocumentsQuery, EventDefinitionsQuery,
};
use crate::graph::transport::Transport;
use crate::graph::types::{ApiDefinition, Application, Bundle, Document, EventDefinition};
use crate::scheduler::Scheduler;

/// Fully resolved view of one application.
#[derive(Debug, Clone)]
pub struct ApplicationGraph {
    pub application: Application,
    pub bundles: Vec<BundleGraph>,
}

/// Fully resolved view of one bundle.
#[derive(Debug, Clone)]
pub struct BundleGraph {
    pub bundle: Bundle,
    pub api_definitions: Vec<ApiDefinition>,
    pub event_definitions: Vec<EventDefinition>,
    pub documents: Vec<Document>,
}

/// Walks the whole backend graph under a fixed concurrency budget.
#[derive(Clone)]
pub struct GraphFetcher {
    transport: Arc<dyn Transport>,
    page_size: u32,
    parallelism: usize,
}

impl std::fmt::Debug for GraphFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphFetcher")
            .field("page_size", &self.page_size)
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

struct AppSlot {
    application: Application,
    bundles: OnceLock<Arc<Vec<BundleSlot>>>,
}

struct BundleSlot {
    bundle: Bundle,
    api_definitions: OnceLock<Vec<ApiDefinition>>,
    event_definitions: OnceLock<Vec<EventDefinition>>,
    documents: OnceLock<Vec<Document>>,
}

impl GraphFetcher {
    pub fn new(transport: Arc<dyn Transport>, page_size: u32, parallelism: usize) -> Self {
        Self {
            transport,
            page_size,
            parallelism,
        }
    }

    /// Resolves every application together with its bundles and their
    /// definition collections.
    ///
    /// The first fetch failure cancels all outstanding work and becomes
    /// the overall error. External cancellation through `cancel` is not
    /// an error: whatever resolved before the token fired is returned,
    /// and unresolved collections read as empty.
    #[instrument(skip_all, fields(parallelism = self.parallelism), err)]
    pub async fn fetch_graph(&self, cancel: &CancellationToken) -> Result<Vec<ApplicationGraph>> {
        let applications = Paginator::new(Arc::clone(&self.transport), ApplicationsQuery, self.page_size)
            .list_all()
            .await
            .map_err(|err| err.while_doing("fetching applications"))?;
        debug!(applications = applications.len(), "listed applications");

        let scheduler = Scheduler::new(cancel, self.parallelism);
        let slots: Vec<Arc<AppSlot>> = applications
            .into_iter()
            .map(|application| {
                Arc::new(AppSlot {
                    application,
                    bundles: OnceLock::new(),
                })
            })
            .collect();
        for slot in &slots {
            let fetcher = self.clone();
            let handle = scheduler.clone();
            let slot = Arc::clone(slot);
            scheduler.schedule(async move { fetcher.fetch_bundles(handle, slot).await });
        }
        scheduler
            .wait()
            .await
            .map_err(|err| err.while_doing("assembling resource graph"))?;

        slots
            .into_iter()
            .map(|slot| {
                let slot = Arc::into_inner(slot).ok_or_else(|| {
                    GraphError::protocol("application slot still shared after wait")
                })?;
                assemble(slot)
            })
            .collect()
    }

    /// Application-level task: drains the bundle collection, publishes
    /// the bundle slots and fans out one task per definition collection.
    async fn fetch_bundles(
        &self,
        scheduler: Scheduler<GraphError>,
        slot: Arc<AppSlot>,
    ) -> std::result::Result<(), GraphError> {
        let application_id = slot.application.id.clone();
        let bundles = Paginator::new(
            Arc::clone(&self.transport),
            BundlesQuery {
                application_id: application_id.clone(),
            },
            self.page_size,
        )
        .list_all()
        .await
        .map_err(|err| {
            err.while_doing(format!("fetching bundles of application {application_id}"))
        })?;
        debug!(
            application = %application_id,
            bundles = bundles.len(),
            "listed bundles"
        );

        let bundle_slots: Arc<Vec<BundleSlot>> = Arc::new(
            bundles
                .into_iter()
                .map(|bundle| BundleSlot {
                    bundle,
                    api_definitions: OnceLock::new(),
                    event_definitions: OnceLock::new(),
                    documents: OnceLock::new(),
                })
                .collect(),
        );
        // This task is the slot's only writer.
        let _ = slot.bundles.set(Arc::clone(&bundle_slots));

        for index in 0..bundle_slots.len() {
            let bundle_id = bundle_slots[index].bundle.id.clone();
            scheduler.schedule(self.collect(
                ApiDefinitionsQuery {
                    application_id: application_id.clone(),
                    bundle_id: bundle_id.clone(),
                },
                "API definitions",
                Arc::clone(&bundle_slots),
                index,
                |slot| &slot.api_definitions,
            ));
            scheduler.schedule(self.collect(
                EventDefinitionsQuery {
                    application_id: application_id.clone(),
                    bundle_id: bundle_id.clone(),
                },
                "event definitions",
                Arc::clone(&bundle_slots),
                index,
                |slot| &slot.event_definitions,
            ));
            scheduler.schedule(self.collect(
                DocumentsQuery {
                    application_id: application_id.clone(),
                    bundle_id,
                },
                "documents",
                Arc::clone(&bundle_slots),
                index,
                |slot| &slot.documents,
            ));
        }
        Ok(())
    }

    /// Builds the leaf task draining one definition collection into its
    /// write-once slot. Returned detached from `self` so it can outlive
    /// the scheduling call.
    fn collect<Q>(
        &self,
        query: Q,
        what: &'static str,
        slots: Arc<Vec<BundleSlot>>,
        index: usize,
        select: fn(&BundleSlot) -> &OnceLock<Vec<Q::Item>>,
    ) -> impl Future<Output = std::result::Result<(), GraphError>> + Send + 'static
    where
        Q: PagedQuery + 'static,
    {
        let paginator = Paginator::new(Arc::clone(&self.transport), query, self.page_size);
        async move {
            let bundle_id = slots[index].bundle.id.clone();
            let items = paginator
                .list_all()
                .await
                .map_err(|err| err.while_doing(format!("fetching {what} of bundle {bundle_id}")))?;
            let _ = select(&slots[index]).set(items);
            Ok(())
        }
    }
}

/// Folds a finished slot tree into the public graph shape. Slots left
/// unwritten by a cancelled task read as empty collections.
fn assemble(slot: AppSlot) -> Result<ApplicationGraph> {
    let AppSlot {
        application,
        bundles,
    } = slot;
    let bundle_slots = match bundles.into_inner() {
        Some(shared) => Arc::into_inner(shared)
            .ok_or_else(|| GraphError::protocol("bundle slots still shared after wait"))?,
        None => Vec::new(),
    };
    let bundles = bundle_slots
        .into_iter()
        .map(|slot| {
            let BundleSlot {
                bundle,
                api_definitions,
                event_definitions,
                documents,
            } = slot;
            BundleGraph {
                bundle,
                api_definitions: api_definitions.into_inner().unwrap_or_default(),
                event_definitions: event_definitions.into_inner().unwrap_or_default(),
                documents: documents.into_inner().unwrap_or_default(),
            }
        })
        .collect();
    Ok(ApplicationGraph {
        application,
        bundles,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::graph::testing::{FakeTransport, page};

    fn routed(query: &str) -> std::result::Result<Value, GraphError> {
        if query.contains("result: applications(") {
            Ok(json!({"result": page(
                vec![json!({"id": "app-1", "name": "commerce"})],
                None,
                false,
            )}))
        } else if query.contains("bundles(") {
            Ok(json!({"result": {"bundles": page(
                vec![
                    json!({"id": "bundle-1", "name": "payments"}),
                    json!({"id": "bundle-2", "name": "orders"}),
                ],
                None,
                false,
            )}}))
        } else if query.contains("apiDefinitions(") {
            Ok(json!({"result": {"bundle": {"apiDefinitions": page(
                vec![json!({
                    "id": "api-1",
                    "name": "payments-v1",
                    "targetURL": "https://api.example.com/payments",
                })],
                None,
                false,
            )}}}))
        } else if query.contains("eventDefinitions(") {
            Ok(json!({"result": {"bundle": {"eventDefinitions": page(
                vec![json!({"id": "event-1", "name": "order-events"})],
                None,
                false,
            )}}}))
        } else if query.contains("documents(") {
            Ok(json!({"result": {"bundle": {"documents": page(
                Vec::new(),
                None,
                false,
            )}}}))
        } else {
            Err(GraphError::protocol(format!("unrouted query: {query}")))
        }
    }

    #[tokio::test]
    async fn fetch_graph_resolves_the_full_tree() {
        let transport = FakeTransport::routing(|request| routed(&request.query));
        let fetcher = GraphFetcher::new(transport.clone(), 50, 4);

        let graphs = fetcher
            .fetch_graph(&CancellationToken::new())
            .await
            .expect("the tree should resolve");

        assert_eq!(graphs.len(), 1);
        let app = &graphs[0];
        assert_eq!(app.application.name, "commerce");
        assert_eq!(app.bundles.len(), 2);
        for bundle in &app.bundles {
            assert_eq!(bundle.api_definitions.len(), 1);
            assert_eq!(bundle.event_definitions.len(), 1);
            assert!(bundle.documents.is_empty());
        }
        // 1 application page, 1 bundle page, 3 collections per bundle.
        assert_eq!(transport.call_count(), 8);
    }

    #[tokio::test]
    async fn first_collection_failure_cancels_outstanding_fetches() {
        let transport = FakeTransport::routing(|request| {
            let query = request.query.as_str();
            if query.contains("apiDefinitions(") {
                Err(GraphError::Backend("backend exploded".into()))
            } else if query.contains("bundles(") {
                Ok(json!({"result": {"bundles": page(
                    vec![json!({"id": "bundle-1", "name": "payments"})],
                    None,
                    false,
                )}}))
            } else {
                routed(query)
            }
        });
        let fetcher = GraphFetcher::new(transport.clone(), 50, 1);

        let err = fetcher
            .fetch_graph(&CancellationToken::new())
            .await
            .expect_err("the collection failure should surface");

        let message = err.to_string();
        assert!(message.contains("while assembling resource graph"));
        assert!(message.contains("API definitions of bundle bundle-1"));
        assert!(message.contains("backend exploded"));
        // Applications, bundles, then the failing API definition fetch;
        // the sibling collection tasks are cancelled before they run.
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn cancelled_token_yields_the_resolved_prefix() {
        let transport = FakeTransport::routing(|request| routed(&request.query));
        let fetcher = GraphFetcher::new(transport.clone(), 50, 4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let graphs = fetcher
            .fetch_graph(&cancel)
            .await
            .expect("cancellation is not an error");

        assert_eq!(graphs.len(), 1);
        assert!(graphs[0].bundles.is_empty());
        assert_eq!(transport.call_count(), 1);
    }
}
