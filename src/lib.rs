//! Conference management core: conferences, sessions, registrations and
//! wishlists over a transactional in-memory store, with derived caches kept
//! up to date by a background task worker.
//!
//! # Examples
//!
//! Filtering conferences through the query compiler:
//! ```
//! use std::sync::Arc;
//!
//! use conference_core::{
//!     cache::MemoryCache,
//!     config::{ServiceConfig, StoreConfig},
//!     core::datastore::Datastore,
//!     model::ConferenceDraft,
//!     query::filter::FilterSpec,
//!     service::{Caller, ConferenceCentral},
//!     tasks::queue::{Job, QueueError, TaskQueue},
//! };
//!
//! struct Discard;
//!
//! impl TaskQueue for Discard {
//!     fn enqueue(&self, _job: Job) -> Result<(), QueueError> {
//!         Ok(())
//!     }
//! }
//!
//! let central = ConferenceCentral::new(
//!     Datastore::new(StoreConfig::default()),
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(Discard),
//!     &ServiceConfig::default(),
//! );
//! let alice = Caller::new("alice", "Alice", "alice@example.com");
//! central
//!     .conferences()
//!     .create_conference(
//!         Some(&alice),
//!         ConferenceDraft {
//!             name: "RustConf".to_string(),
//!             city: Some("Portland".to_string()),
//!             max_attendees: Some(100),
//!             ..ConferenceDraft::default()
//!         },
//!     )
//!     .expect("create");
//!
//! let found = central
//!     .conferences()
//!     .query_conferences(&[FilterSpec::new("CITY", "EQ", "Portland")])
//!     .expect("query");
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].organizer_display_name, "Alice");
//! ```
//!
//! With the background worker and a SQLite journal:
//! ```no_run
//! use std::sync::Arc;
//!
//! use conference_core::{
//!     cache::MemoryCache,
//!     config::ServiceConfig,
//!     core::datastore::Datastore,
//!     persist::sqlite::SqliteOpSink,
//!     service::ConferenceCentral,
//!     tasks::worker::LogNotifier,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! conference_core::telemetry::init_tracing("conference_core=info");
//! let config = ServiceConfig::default();
//! let sink = SqliteOpSink::open("conference.db").expect("open sqlite");
//! let datastore = Datastore::open_journaled(sink, config.store.clone()).expect("replay");
//! let (central, worker) = ConferenceCentral::spawn(
//!     datastore,
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(LogNotifier),
//!     &config,
//! );
//! println!("{}", central.get_announcement());
//! worker.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Keyed cache seam and the featured-speaker and announcement entries.
pub mod cache;
/// Service configuration.
pub mod config;
/// Entity store, transactions and the shared datastore handle.
pub mod core;
/// Entity records, drafts and patches.
pub mod model;
/// Journal operation model.
pub mod op;
/// Op journal sinks.
pub mod persist;
/// Filter compilation and query plans.
pub mod query;
/// Request-level services.
pub mod service;
/// Background jobs.
pub mod tasks;
/// Log subscriber bootstrap.
pub mod telemetry;
/// Keys, ids and enums shared across modules.
pub mod types;
