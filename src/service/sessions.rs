use std::sync::Arc;

use chrono::NaiveTime;
use tracing::info;

use crate::{
    cache::featured::{FeaturedSpeakerCache, FeaturedSpeakerEntry, FeaturedSpeakerJob},
    core::datastore::Datastore,
    model::{parse_date, Session, SessionDraft},
    tasks::queue::{Job, TaskQueue},
    types::{ConferenceKey, SessionKey, TypeOfSession},
};

use super::{
    enqueue_logged,
    error::{ServiceError, ServiceResult},
    require_caller, Caller,
};

/// Latest start time a session may have to count as preferred.
pub const PREFERRED_LATEST_START: (u32, u32) = (19, 0);

/// Session formats that count as preferred.
pub const PREFERRED_TYPES: [TypeOfSession; 3] = [
    TypeOfSession::Unknown,
    TypeOfSession::Lecture,
    TypeOfSession::Keynote,
];

/// Session create and read operations.
#[derive(Clone)]
pub struct SessionService {
    datastore: Datastore,
    queue: Arc<dyn TaskQueue>,
    featured: FeaturedSpeakerCache,
}

impl SessionService {
    /// Builds the service.
    pub fn new(datastore: Datastore, queue: Arc<dyn TaskQueue>, featured: FeaturedSpeakerCache) -> Self {
        Self {
            datastore,
            queue,
            featured,
        }
    }

    /// Creates a session in a conference the caller organizes.
    ///
    /// A non-empty speaker queues a featured-speaker job; the job runs later
    /// on the worker, and a failure to queue it does not fail the request.
    pub fn create_session(
        &self,
        caller: Option<&Caller>,
        websafe_conference_key: &str,
        draft: SessionDraft,
    ) -> ServiceResult<SessionKey> {
        let caller = require_caller(caller)?;
        if draft.name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "session 'name' field required".to_string(),
            ));
        }
        let conference_key: ConferenceKey = websafe_conference_key.parse()?;

        let organizer = self
            .datastore
            .read(|store| store.conference(&conference_key).map(|c| c.organizer_user_id.clone()))
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no conference found with key: {websafe_conference_key}"
                ))
            })?;
        if organizer != caller.user_id {
            return Err(ServiceError::Forbidden(
                "only the owner can add sessions to the conference".to_string(),
            ));
        }

        let id = self.datastore.allocate_session_id(&conference_key);
        let session = draft.into_session(SessionKey::new(conference_key, id))?;
        let key = session.key.clone();
        let job = session.speaker.clone().map(|speaker| FeaturedSpeakerJob {
            speaker,
            session_name: session.name.clone(),
            session_key: key.clone(),
        });

        self.datastore.put(session)?;
        info!(session = %key, "session created");

        if let Some(job) = job {
            enqueue_logged(self.queue.as_ref(), Job::FeaturedSpeaker(job));
        }
        Ok(key)
    }

    /// Sessions of one conference, by id.
    pub fn conference_sessions(&self, websafe_conference_key: &str) -> ServiceResult<Vec<Session>> {
        let key: ConferenceKey = websafe_conference_key.parse()?;
        self.datastore.read(|store| {
            if store.conference(&key).is_none() {
                return Err(ServiceError::NotFound(format!(
                    "no conference found with key: {websafe_conference_key}"
                )));
            }
            Ok(store.sessions_in(&key).into_iter().cloned().collect())
        })
    }

    /// Sessions of one conference with the given format.
    pub fn sessions_by_type(
        &self,
        websafe_conference_key: &str,
        type_of_session: TypeOfSession,
    ) -> ServiceResult<Vec<Session>> {
        let mut sessions = self.conference_sessions(websafe_conference_key)?;
        sessions.retain(|s| s.type_of_session == type_of_session);
        Ok(sessions)
    }

    /// Sessions given by `speaker` across all conferences.
    pub fn sessions_by_speaker(&self, speaker: &str) -> Vec<Session> {
        self.datastore.read(|store| {
            store
                .sessions()
                .into_iter()
                .filter(|s| s.is_by(speaker))
                .cloned()
                .collect()
        })
    }

    /// Sessions dated within `[start, end]`, by date.
    pub fn sessions_by_date_range(&self, start: &str, end: &str) -> ServiceResult<Vec<Session>> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        let mut sessions: Vec<Session> = self.datastore.read(|store| {
            store
                .sessions()
                .into_iter()
                .filter(|s| s.date.is_some_and(|d| d >= start && d <= end))
                .cloned()
                .collect()
        });
        sessions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.key.cmp(&b.key)));
        Ok(sessions)
    }

    /// Unknown, lecture and keynote sessions starting at or before 19:00, by
    /// start time.
    pub fn preferred_sessions(&self) -> Vec<Session> {
        let (hour, minute) = PREFERRED_LATEST_START;
        let latest = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        let mut sessions: Vec<Session> = self.datastore.read(|store| {
            store
                .sessions()
                .into_iter()
                .filter(|s| PREFERRED_TYPES.contains(&s.type_of_session))
                .filter(|s| s.start_time.is_some_and(|t| t <= latest))
                .cloned()
                .collect()
        });
        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.key.cmp(&b.key)));
        sessions
    }

    /// Current featured-speaker entry, or an empty one.
    pub fn featured_speaker(&self) -> FeaturedSpeakerEntry {
        self.featured.current()
    }
}
