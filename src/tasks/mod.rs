//! Background job queue and the single worker that drains it.

/// Worker event stream payloads.
pub mod events;
/// Job model and the enqueue seam.
pub mod queue;
/// Worker loop and its handle.
pub mod worker;
