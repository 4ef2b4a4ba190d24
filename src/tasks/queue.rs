use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::featured::FeaturedSpeakerJob;

/// Enqueue failures. Callers on the request path log these and carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue is at its bound.
    #[error("task queue is full")]
    Full,
    /// The worker has stopped.
    #[error("task queue is closed")]
    Closed,
}

/// Confirmation sent to the organizer of a newly created conference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationEmail {
    pub to: String,
    /// Name of the created conference.
    pub conference_name: String,
}

impl ConfirmationEmail {
    /// Subject line.
    pub const SUBJECT: &'static str = "You created a new Conference!";

    /// Plain-text body.
    pub fn body(&self) -> String {
        format!(
            "Hi, you have created the following conference:\r\n\r\n{}",
            self.conference_name
        )
    }
}

/// Unit of background work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Job {
    /// Fold a newly created session into the featured-speaker slot.
    FeaturedSpeaker(FeaturedSpeakerJob),
    /// Hand a confirmation to the notifier.
    ConfirmationEmail(ConfirmationEmail),
    /// Rebuild the announcement slot now.
    RecomputeAnnouncement,
}

impl Job {
    /// Kind tag used in events and logs.
    pub fn kind(&self) -> JobKind {
        match self {
            Job::FeaturedSpeaker(_) => JobKind::FeaturedSpeaker,
            Job::ConfirmationEmail(_) => JobKind::ConfirmationEmail,
            Job::RecomputeAnnouncement => JobKind::RecomputeAnnouncement,
        }
    }
}

/// Job discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// [`Job::FeaturedSpeaker`].
    FeaturedSpeaker,
    /// [`Job::ConfirmationEmail`].
    ConfirmationEmail,
    /// [`Job::RecomputeAnnouncement`] or the periodic tick.
    RecomputeAnnouncement,
}

impl JobKind {
    /// Stable name.
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::FeaturedSpeaker => "featured_speaker",
            JobKind::ConfirmationEmail => "confirmation_email",
            JobKind::RecomputeAnnouncement => "recompute_announcement",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts jobs for asynchronous, at-least-once execution.
pub trait TaskQueue: Send + Sync {
    /// Submits a job without waiting for it to run.
    fn enqueue(&self, job: Job) -> Result<(), QueueError>;
}
