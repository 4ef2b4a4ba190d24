use tracing::info;

use crate::{
    core::datastore::Datastore,
    model::Conference,
    types::ConferenceKey,
};

use super::{
    conferences::{with_organizers, ConferenceView},
    error::{ServiceError, ServiceResult},
    load_or_create_profile, require_caller, Caller,
};

/// Capacity-bounded conference registration.
///
/// Each mutation is one transaction over the caller's profile and the
/// conference; a lost race re-runs the whole check so seat counts never go
/// negative and a profile never lists a conference twice.
#[derive(Clone)]
pub struct RegistrationService {
    datastore: Datastore,
}

impl RegistrationService {
    /// Builds the service.
    pub fn new(datastore: Datastore) -> Self {
        Self { datastore }
    }

    /// Takes a seat for the caller.
    pub fn register(&self, caller: Option<&Caller>, websafe_key: &str) -> ServiceResult<bool> {
        let caller = require_caller(caller)?;
        let key: ConferenceKey = websafe_key.parse()?;

        self.datastore.run_in_transaction(|txn| -> ServiceResult<()> {
            let mut profile = load_or_create_profile(txn, caller);
            let Some(mut conf) = txn.get_conference(&key) else {
                return Err(ServiceError::NotFound(format!(
                    "no conference found with key: {websafe_key}"
                )));
            };
            if profile.is_attending(&key) {
                return Err(ServiceError::AlreadyRegistered(key.clone()));
            }
            if conf.seats_available == 0 {
                return Err(ServiceError::NoSeatsAvailable(key.clone()));
            }

            profile.conferences_to_attend.push(key.clone());
            conf.seats_available -= 1;
            txn.put(profile);
            txn.put(conf);
            Ok(())
        })?;

        info!(user = %caller.user_id, conference = %key, "registered");
        Ok(true)
    }

    /// Gives the caller's seat back. Returns `false`, changing nothing, when
    /// the caller was not registered.
    pub fn unregister(&self, caller: Option<&Caller>, websafe_key: &str) -> ServiceResult<bool> {
        let caller = require_caller(caller)?;
        let key: ConferenceKey = websafe_key.parse()?;

        let removed = self.datastore.run_in_transaction(|txn| -> ServiceResult<bool> {
            let Some(mut conf) = txn.get_conference(&key) else {
                return Err(ServiceError::NotFound(format!(
                    "no conference found with key: {websafe_key}"
                )));
            };
            let Some(mut profile) = txn.get_profile(&caller.user_id) else {
                return Ok(false);
            };
            if !profile.is_attending(&key) {
                return Ok(false);
            }

            profile.conferences_to_attend.retain(|k| k != &key);
            conf.seats_available = (conf.seats_available + 1).min(conf.max_attendees);
            txn.put(profile);
            txn.put(conf);
            Ok(true)
        })?;

        if removed {
            info!(user = %caller.user_id, conference = %key, "unregistered");
        }
        Ok(removed)
    }

    /// Conferences the caller is registered for, in registration order.
    pub fn conferences_to_attend(&self, caller: Option<&Caller>) -> ServiceResult<Vec<ConferenceView>> {
        let caller = require_caller(caller)?;
        Ok(self.datastore.read(|store| {
            let attending = store
                .profile(&caller.user_id)
                .map(|p| p.conferences_to_attend.clone())
                .unwrap_or_default();
            let confs: Vec<Conference> = attending
                .iter()
                .filter_map(|k| store.conference(k).cloned())
                .collect();
            with_organizers(store, confs)
        }))
    }
}
