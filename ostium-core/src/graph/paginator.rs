use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::graph::error::{GraphError, Result};
use crate::graph::transport::{GraphRequest, Transport};
use crate::graph::types::Connection;

/// Page window handed to a [`PagedQuery`] when rendering one request.
#[derive(Debug, Clone, Copy)]
pub struct PageArgs<'a> {
    pub first: u32,
    pub after: Option<&'a str>,
}

/// One logical collection query, renderable per page.
pub trait PagedQuery: Send + Sync {
    type Item: DeserializeOwned + Send;

    fn query(&self, page: &PageArgs<'_>) -> String;

    /// Path from the response root down to the connection envelope.
    fn path(&self) -> &[&'static str];
}

/// Cursor-driven walker over one collection query.
///
/// Each `next` call issues exactly one remote query. Once the backend
/// reports no further page the paginator goes inert: later calls return
/// `false` without touching the transport.
pub struct Paginator<Q: PagedQuery> {
    transport: Arc<dyn Transport>,
    query: Q,
    page_size: u32,
    cursor: Option<String>,
    exhausted: bool,
}

impl<Q: PagedQuery> Paginator<Q> {
    pub fn new(transport: Arc<dyn Transport>, query: Q, page_size: u32) -> Self {
        Self {
            transport,
            query,
            page_size,
            cursor: None,
            exhausted: false,
        }
    }

    /// Fetches the next page into `out`, returning whether more pages
    /// remain. Any transport or decoding failure aborts immediately and
    /// leaves `out` as it was before the call.
    pub async fn next(&mut self, out: &mut Vec<Q::Item>) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let page = PageArgs {
            first: self.page_size,
            after: self.cursor.as_deref(),
        };
        let data = self
            .transport
            .execute(GraphRequest::new(self.query.query(&page)))
            .await?;
        let node = descend(data, self.query.path())?;
        let connection: Connection<Q::Item> = serde_json::from_value(node)?;
        out.extend(connection.data);
        if connection.page_info.has_next_page {
            match connection.page_info.end_cursor {
                Some(cursor) if !cursor.is_empty() => self.cursor = Some(cursor),
                _ => {
                    return Err(GraphError::protocol(
                        "page reported a successor without an end cursor",
                    ));
                }
            }
        } else {
            self.exhausted = true;
        }
        Ok(!self.exhausted)
    }

    /// Drains the whole collection on the calling task, preserving
    /// encounter order.
    pub async fn list_all(mut self) -> Result<Vec<Q::Item>> {
        let mut items = Vec::new();
        while self.next(&mut items).await? {}
        Ok(items)
    }
}

fn descend(mut value: Value, path: &[&'static str]) -> Result<Value> {
    for segment in path {
        value = match value.get_mut(segment).map(Value::take) {
            Some(next) if !next.is_null() => next,
            _ => return Err(GraphError::not_found(format!("no {segment} in response"))),
        };
    }
    Ok(value)
}
