use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::FeaturedSpeakerMode,
    core::datastore::Datastore,
    types::{ConferenceKey, SessionKey},
};

use super::{get_json, set_json, Cache, CacheError, FEATURED_SPEAKER_KEY};

/// Work item produced when a session with a speaker is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedSpeakerJob {
    /// Speaker of the new session.
    pub speaker: String,
    /// Name of the new session.
    pub session_name: String,
    /// Key of the new session; its parent is the conference to scan.
    pub session_key: SessionKey,
}

/// One session listed under the featured speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedSession {
    pub key: SessionKey,
    pub name: String,
}

/// Contents of the featured-speaker slot. The default value means "nobody yet".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeaturedSpeakerEntry {
    pub speaker: String,
    /// Conference whose sessions are listed.
    pub conference: Option<ConferenceKey>,
    pub sessions: Vec<FeaturedSession>,
}

impl FeaturedSpeakerEntry {
    /// Session names in order.
    pub fn session_names(&self) -> Vec<&str> {
        self.sessions.iter().map(|s| s.name.as_str()).collect()
    }

    /// True when nothing is featured.
    pub fn is_empty(&self) -> bool {
        self.speaker.is_empty() && self.sessions.is_empty()
    }

    fn lists(&self, key: &SessionKey) -> bool {
        self.sessions.iter().any(|s| &s.key == key)
    }
}

/// What a job did to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeaturedUpdate {
    /// The speaker has fewer than two sessions in the conference; slot untouched.
    NotFeatured {
        /// Sessions by the speaker in the conference.
        sessions: usize,
    },
    /// Session appended to the current entry.
    Appended {
        sessions: usize,
    },
    /// The session was already listed and the entry is current; slot untouched.
    AlreadyListed,
    /// Entry rebuilt from a conference scan.
    Rescanned {
        sessions: usize,
    },
}

/// Maintains the featured-speaker slot from session-creation jobs.
#[derive(Clone)]
pub struct FeaturedSpeakerCache {
    datastore: Datastore,
    cache: Arc<dyn Cache>,
    mode: FeaturedSpeakerMode,
}

impl FeaturedSpeakerCache {
    /// Builds the maintainer over a store and the shared cache.
    pub fn new(datastore: Datastore, cache: Arc<dyn Cache>, mode: FeaturedSpeakerMode) -> Self {
        Self {
            datastore,
            cache,
            mode,
        }
    }

    /// Folds one job into the slot.
    ///
    /// The entry is appended to only when it names the same speaker and
    /// conference and already lists every other matching session; anything
    /// else (absent slot, other speaker, replayed or reordered jobs) falls
    /// back to a full rescan, so the slot converges regardless of delivery order.
    pub fn apply(&self, job: &FeaturedSpeakerJob) -> Result<FeaturedUpdate, CacheError> {
        if job.speaker.is_empty() {
            return Ok(FeaturedUpdate::NotFeatured { sessions: 0 });
        }

        let conference = &job.session_key.conference;
        let count = self.datastore.read(|store| {
            store
                .sessions_in(conference)
                .into_iter()
                .filter(|s| s.is_by(&job.speaker))
                .count()
        });
        if count <= 1 {
            return Ok(FeaturedUpdate::NotFeatured { sessions: count });
        }

        if self.mode == FeaturedSpeakerMode::Incremental {
            if let Some(mut entry) = self.read_entry() {
                if entry.speaker == job.speaker && entry.conference.as_ref() == Some(conference) {
                    if entry.lists(&job.session_key) && entry.sessions.len() == count {
                        return Ok(FeaturedUpdate::AlreadyListed);
                    }
                    if !entry.lists(&job.session_key) && entry.sessions.len() + 1 == count {
                        entry.sessions.push(FeaturedSession {
                            key: job.session_key.clone(),
                            name: job.session_name.clone(),
                        });
                        set_json(self.cache.as_ref(), FEATURED_SPEAKER_KEY, &entry)?;
                        debug!(speaker = %job.speaker, sessions = entry.sessions.len(), "featured speaker appended");
                        return Ok(FeaturedUpdate::Appended {
                            sessions: entry.sessions.len(),
                        });
                    }
                }
            }
        }

        let sessions: Vec<FeaturedSession> = self.datastore.read(|store| {
            store
                .sessions_in(conference)
                .into_iter()
                .filter(|s| s.is_by(&job.speaker))
                .map(|s| FeaturedSession {
                    key: s.key.clone(),
                    name: s.name.clone(),
                })
                .collect()
        });
        let entry = FeaturedSpeakerEntry {
            speaker: job.speaker.clone(),
            conference: Some(conference.clone()),
            sessions,
        };
        set_json(self.cache.as_ref(), FEATURED_SPEAKER_KEY, &entry)?;
        debug!(speaker = %job.speaker, sessions = entry.sessions.len(), "featured speaker rescanned");
        Ok(FeaturedUpdate::Rescanned {
            sessions: entry.sessions.len(),
        })
    }

    /// Current entry, or an empty one while no job has populated the slot.
    pub fn current(&self) -> FeaturedSpeakerEntry {
        self.read_entry().unwrap_or_default()
    }

    fn read_entry(&self) -> Option<FeaturedSpeakerEntry> {
        match get_json(self.cache.as_ref(), FEATURED_SPEAKER_KEY) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "discarding undecodable featured speaker entry");
                None
            }
        }
    }
}
