//! Scripted transport stand-ins shared by the graph and broker tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::graph::error::{GraphError, Result};
use crate::graph::transport::{GraphRequest, Transport};

type Responder = Box<dyn Fn(&GraphRequest) -> Result<Value> + Send + Sync>;

/// Fake backend recording every request it sees.
pub(crate) struct FakeTransport {
    responder: Responder,
    requests: Mutex<Vec<GraphRequest>>,
}

impl FakeTransport {
    /// Routes responses by inspecting the request, for flows where call
    /// order is not deterministic.
    pub(crate) fn routing(
        responder: impl Fn(&GraphRequest) -> Result<Value> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Plays responses back in order, one per request.
    pub(crate) fn scripted(responses: Vec<Result<Value>>) -> Arc<Self> {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::routing(move |request| {
            queue.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(GraphError::protocol(format!(
                    "unscripted request: {}",
                    request.query
                )))
            })
        })
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.query.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: GraphRequest) -> Result<Value> {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

/// Connection envelope helper for page fixtures.
pub(crate) fn page(items: Vec<Value>, end_cursor: Option<&str>, has_next: bool) -> Value {
    let total = items.len();
    serde_json::json!({
        "data": items,
        "pageInfo": {
            "startCursor": "",
            "endCursor": end_cursor,
            "hasNextPage": has_next,
        },
        "totalCount": total,
    })
}
