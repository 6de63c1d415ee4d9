//! # groupgraph graph
//!
//! Neo4j side of groupgraph: idempotent upserts of GroupMe groups, members
//! and messages, the batch relationship reconciler and the sync driver that
//! ties a [`GroupSource`](groupgraph_core::GroupSource) to a graph store.

pub mod client;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod sync;
pub mod upsert;

pub use client::{GraphClient, GraphConfig, GraphCounts};
pub use reconcile::{reconcile, ReconcileReport};
pub use schema::initialize_schema;
pub use store::{EdgeKind, GraphStore, MemoryGraph, Write};
pub use sync::{FailurePolicy, NoopObserver, SyncDriver, SyncObserver, SyncOptions, SyncReport};
pub use upsert::{GroupUpsert, RetryPolicy, UpsertEngine, UpsertStats};
