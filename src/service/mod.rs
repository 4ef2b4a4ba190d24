//! Request-level operations over the store, cache and task queue.

/// Conference create, update and read operations.
pub mod conferences;
/// Service error taxonomy.
pub mod error;
/// Profile read and update.
pub mod profiles;
/// Conference registration.
pub mod registration;
/// Session create and read operations.
pub mod sessions;
/// Session wishlist.
pub mod wishlist;

use std::sync::Arc;

use crate::{
    cache::{
        announcement::AnnouncementCache,
        featured::{FeaturedSpeakerCache, FeaturedSpeakerEntry},
        Cache,
    },
    config::ServiceConfig,
    core::{datastore::Datastore, transaction::Transaction},
    model::Profile,
    tasks::{
        queue::{Job, TaskQueue},
        worker::{spawn_task_worker, JobContext, Notifier, TaskWorkerHandle},
    },
    types::UserId,
};

use self::{
    conferences::ConferenceService, error::ServiceError, error::ServiceResult,
    profiles::ProfileService, registration::RegistrationService, sessions::SessionService,
    wishlist::WishlistService,
};

/// Authenticated identity supplied by the caller's identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Stable user id.
    pub user_id: UserId,
    /// Nickname, used as the initial display name.
    pub nickname: String,
    /// Email, used as the initial main email.
    pub email: String,
}

impl Caller {
    /// Builds an identity.
    pub fn new(
        user_id: impl Into<UserId>,
        nickname: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            nickname: nickname.into(),
            email: email.into(),
        }
    }

    fn new_profile(&self) -> Profile {
        Profile::new(self.user_id.clone(), self.nickname.clone(), self.email.clone())
    }
}

pub(crate) fn require_caller(caller: Option<&Caller>) -> ServiceResult<&Caller> {
    match caller {
        Some(caller) if !caller.user_id.is_empty() => Ok(caller),
        _ => Err(ServiceError::Unauthorized),
    }
}

/// Reads the caller's profile inside `txn`, staging a fresh one when absent.
pub(crate) fn load_or_create_profile(txn: &mut Transaction<'_>, caller: &Caller) -> Profile {
    match txn.get_profile(&caller.user_id) {
        Some(profile) => profile,
        None => {
            let profile = caller.new_profile();
            txn.put(profile.clone());
            profile
        }
    }
}

pub(crate) fn enqueue_logged(queue: &dyn TaskQueue, job: Job) {
    let kind = job.kind();
    if let Err(err) = queue.enqueue(job) {
        tracing::warn!(%kind, error = %err, "job not enqueued; derived cache may go stale");
    }
}

/// Facade bundling every service over one store, cache and queue.
#[derive(Clone)]
pub struct ConferenceCentral {
    profiles: ProfileService,
    conferences: ConferenceService,
    sessions: SessionService,
    registration: RegistrationService,
    wishlist: WishlistService,
    announcements: AnnouncementCache,
}

impl ConferenceCentral {
    /// Wires the services to the given collaborators.
    pub fn new(
        datastore: Datastore,
        cache: Arc<dyn Cache>,
        queue: Arc<dyn TaskQueue>,
        config: &ServiceConfig,
    ) -> Self {
        let featured =
            FeaturedSpeakerCache::new(datastore.clone(), Arc::clone(&cache), config.featured_speaker);
        let announcements = AnnouncementCache::new(datastore.clone(), cache);
        Self {
            profiles: ProfileService::new(datastore.clone()),
            conferences: ConferenceService::new(datastore.clone(), Arc::clone(&queue)),
            sessions: SessionService::new(datastore.clone(), queue, featured),
            registration: RegistrationService::new(datastore.clone()),
            wishlist: WishlistService::new(datastore),
            announcements,
        }
    }

    /// Starts a task worker over the same store and cache and wires the
    /// services to it. Must be called from within a tokio runtime.
    pub fn spawn(
        datastore: Datastore,
        cache: Arc<dyn Cache>,
        notifier: Arc<dyn Notifier>,
        config: &ServiceConfig,
    ) -> (Self, TaskWorkerHandle) {
        let context = JobContext {
            featured: FeaturedSpeakerCache::new(
                datastore.clone(),
                Arc::clone(&cache),
                config.featured_speaker,
            ),
            announcements: AnnouncementCache::new(datastore.clone(), Arc::clone(&cache)),
            notifier,
        };
        let worker = spawn_task_worker(context, config.worker.clone());
        let queue: Arc<dyn TaskQueue> = Arc::new(worker.clone());
        (Self::new(datastore, cache, queue, config), worker)
    }

    /// Profile operations.
    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    /// Conference operations.
    pub fn conferences(&self) -> &ConferenceService {
        &self.conferences
    }

    /// Session operations.
    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    /// Registration operations.
    pub fn registration(&self) -> &RegistrationService {
        &self.registration
    }

    /// Wishlist operations.
    pub fn wishlist(&self) -> &WishlistService {
        &self.wishlist
    }

    /// Announcement maintainer, for callers that recompute on demand.
    pub fn announcements(&self) -> &AnnouncementCache {
        &self.announcements
    }

    /// Current announcement, or `""`.
    pub fn get_announcement(&self) -> String {
        self.announcements.get()
    }

    /// Current featured-speaker entry.
    pub fn featured_speaker(&self) -> FeaturedSpeakerEntry {
        self.sessions.featured_speaker()
    }
}
