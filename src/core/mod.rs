//! Ancestor-keyed transactional entity store.

/// Shared datastore handle with transparent transaction retry.
pub mod datastore;
/// Parent/child index helpers.
pub mod indices;
/// Authoritative entity tables, versions and snapshots.
pub mod store;
/// Optimistic transaction view and write sets.
pub mod transaction;
