use std::sync::Arc;

use chrono::NaiveDate;
use hashbrown::HashMap;
use serde::Serialize;
use tracing::info;

use crate::{
    core::{datastore::Datastore, store::EntityStore},
    model::{Conference, ConferenceDraft, ConferencePatch, Entity, EntityKey},
    query::{
        filter::{compile, FilterSpec},
        plan::{Operator, Property, QueryPlan, Value},
    },
    tasks::queue::{ConfirmationEmail, Job, TaskQueue},
    types::{ConferenceKey, UserId},
};

use super::{
    enqueue_logged,
    error::{ServiceError, ServiceResult},
    load_or_create_profile, require_caller, Caller,
};

/// Conference plus the organizer's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConferenceView {
    /// Stored record.
    pub conference: Conference,
    /// Organizer display name; empty if the profile is missing.
    pub organizer_display_name: String,
}

pub(crate) fn organizer_name(store: &EntityStore, user_id: &str) -> String {
    store
        .profile(user_id)
        .map(|p| p.display_name.clone())
        .unwrap_or_default()
}

/// Joins organizer display names onto `conferences` with one multi-get of
/// the distinct organizer profiles.
pub(crate) fn with_organizers(store: &EntityStore, conferences: Vec<Conference>) -> Vec<ConferenceView> {
    let mut organizers: Vec<EntityKey> = Vec::new();
    for conf in &conferences {
        let key = EntityKey::Profile(conf.organizer_user_id.clone());
        if !organizers.contains(&key) {
            organizers.push(key);
        }
    }

    let names: HashMap<UserId, String> = store
        .get_multi(&organizers)
        .into_iter()
        .flatten()
        .filter_map(|entity| match entity {
            Entity::Profile(p) => Some((p.user_id, p.display_name)),
            _ => None,
        })
        .collect();

    conferences
        .into_iter()
        .map(|conference| {
            let organizer_display_name = names
                .get(&conference.organizer_user_id)
                .cloned()
                .unwrap_or_default();
            ConferenceView {
                conference,
                organizer_display_name,
            }
        })
        .collect()
}

/// Conference create, update and read operations.
#[derive(Clone)]
pub struct ConferenceService {
    datastore: Datastore,
    queue: Arc<dyn TaskQueue>,
}

impl ConferenceService {
    /// Builds the service.
    pub fn new(datastore: Datastore, queue: Arc<dyn TaskQueue>) -> Self {
        Self { datastore, queue }
    }

    /// Creates a conference under the caller's profile and queues the confirmation.
    pub fn create_conference(
        &self,
        caller: Option<&Caller>,
        draft: ConferenceDraft,
    ) -> ServiceResult<ConferenceView> {
        let caller = require_caller(caller)?;
        if draft.name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "conference 'name' field required".to_string(),
            ));
        }

        let id = self.datastore.allocate_conference_id(&caller.user_id);
        let conference = draft.into_conference(ConferenceKey::new(caller.user_id.clone(), id))?;

        let organizer = self.datastore.run_in_transaction(|txn| -> ServiceResult<String> {
            let profile = load_or_create_profile(txn, caller);
            txn.put(conference.clone());
            Ok(profile.display_name)
        })?;

        info!(conference = %conference.key, name = %conference.name, "conference created");
        enqueue_logged(
            self.queue.as_ref(),
            Job::ConfirmationEmail(ConfirmationEmail {
                to: caller.email.clone(),
                conference_name: conference.name.clone(),
            }),
        );

        Ok(ConferenceView {
            conference,
            organizer_display_name: organizer,
        })
    }

    /// Applies `patch` to a conference the caller organizes.
    pub fn update_conference(
        &self,
        caller: Option<&Caller>,
        websafe_key: &str,
        patch: &ConferencePatch,
    ) -> ServiceResult<ConferenceView> {
        let caller = require_caller(caller)?;
        let key: ConferenceKey = websafe_key.parse()?;

        let conference = self.datastore.run_in_transaction(|txn| -> ServiceResult<Conference> {
            let Some(mut conf) = txn.get_conference(&key) else {
                return Err(ServiceError::NotFound(format!(
                    "no conference found with key: {websafe_key}"
                )));
            };
            if conf.organizer_user_id != caller.user_id {
                return Err(ServiceError::Forbidden(
                    "only the owner can update the conference".to_string(),
                ));
            }
            patch.apply_to(&mut conf)?;
            txn.put(conf.clone());
            Ok(conf)
        })?;

        info!(conference = %conference.key, "conference updated");
        Ok(self.view(conference))
    }

    /// Reads one conference.
    pub fn get_conference(&self, websafe_key: &str) -> ServiceResult<ConferenceView> {
        let key: ConferenceKey = websafe_key.parse()?;
        let conf = self
            .datastore
            .read(|store| store.conference(&key).cloned())
            .ok_or_else(|| {
                ServiceError::NotFound(format!("no conference found with key: {websafe_key}"))
            })?;
        Ok(self.view(conf))
    }

    /// Conferences organized by the caller, by name.
    pub fn conferences_created(&self, caller: Option<&Caller>) -> ServiceResult<Vec<ConferenceView>> {
        let caller = require_caller(caller)?;
        Ok(self.datastore.read(|store| {
            let mut confs: Vec<Conference> = store
                .conferences_of(&caller.user_id)
                .into_iter()
                .cloned()
                .collect();
            confs.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.key.cmp(&b.key)));
            with_organizers(store, confs)
        }))
    }

    /// Compiles client filters and runs them.
    pub fn query_conferences(&self, filters: &[FilterSpec]) -> ServiceResult<Vec<ConferenceView>> {
        let plan = compile(filters)?;
        Ok(self
            .datastore
            .read(|store| with_organizers(store, store.query(&plan))))
    }

    /// Conferences running on `today`: started on or before it and ending on or after it.
    pub fn ongoing_conferences(&self, today: NaiveDate) -> Vec<ConferenceView> {
        let plan = QueryPlan::new()
            .filter(Property::StartDate, Operator::Le, Value::Date(today))
            .order(Property::StartDate)
            .order(Property::Name);
        self.datastore.read(|store| {
            let confs = store
                .query(&plan)
                .into_iter()
                .filter(|c| c.end_date.is_some_and(|end| end >= today))
                .collect();
            with_organizers(store, confs)
        })
    }

    fn view(&self, conference: Conference) -> ConferenceView {
        let organizer_display_name = self
            .datastore
            .read(|store| organizer_name(store, &conference.organizer_user_id));
        ConferenceView {
            conference,
            organizer_display_name,
        }
    }
}
