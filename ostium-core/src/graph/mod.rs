//! Access to the remote graph backend: transport seam, wire types, query
//! builders, cursor pagination, the typed registry client and the
//! concurrent fetch pipeline.

pub mod client;
pub mod error;
pub(crate) mod fields;
pub mod paginator;
pub mod pipeline;
pub mod queries;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{AuthCreationInput, BoundCredentials, RegistryClient};
pub use error::{GraphError, Result};
pub use paginator::{PageArgs, PagedQuery, Paginator};
pub use pipeline::{ApplicationGraph, BundleGraph, GraphFetcher};
pub use transport::{GraphRequest, HttpTransport, Transport};
