//! # Ostium Core
//!
//! Core library for the Ostium service broker, bridging the Open Service
//! Broker protocol onto a paginated graph-query backend.
//!
//! ## Overview
//!
//! `ostium-core` carries the domain logic of the broker:
//!
//! - **Graph access**: a [`graph::Transport`] seam for the remote query
//!   backend, cursor-driven pagination and the concurrent fetch pipeline
//!   that materializes the application → bundle → definition tree
//! - **Scheduling**: a bounded-concurrency task runner with first-error
//!   cancellation, used by every fan-out stage of the pipeline
//! - **Credential lifecycle**: the remote instance-auth vocabulary and the
//!   mapping of its conditions onto broker operation states
//! - **Broker state machines**: provision, deprovision, bind, unbind,
//!   last-operation polling and binding retrieval, all resumable through
//!   stateless operation tokens
//!
//! The crate keeps no durable operation store. Every in-flight operation is
//! identified by an opaque token returned to the platform; polling decodes
//! the token and re-queries the backend for the current state.
//!
//! ## Architecture
//!
//! - [`graph`]: transport, wire types, query builders, paginator, typed
//!   registry client and the fetch pipeline
//! - [`scheduler`]: the concurrency primitive behind the pipeline
//! - [`broker`]: operation tokens, status mapping, catalog conversion and
//!   the endpoint state machines

pub mod broker;
pub mod graph;
pub mod scheduler;

pub use broker::{Broker, BrokerError, BrokerSettings};
pub use graph::{GraphError, Transport};
pub use scheduler::Scheduler;
