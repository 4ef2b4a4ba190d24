//! Worker event stream payloads.

use crate::cache::featured::FeaturedUpdate;

use super::queue::JobKind;

/// Events emitted from the task worker loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A job ran to completion.
    JobCompleted {
        kind: JobKind,
        attempts: u32,
    },
    /// A job failed on every attempt and was dropped.
    JobFailed {
        kind: JobKind,
        attempts: u32,
        message: String,
    },
    /// A featured-speaker job changed (or confirmed) the slot.
    FeaturedSpeaker {
        update: FeaturedUpdate,
    },
    AnnouncementRefreshed {
        /// Whether the slot is now set.
        present: bool,
    },
}
