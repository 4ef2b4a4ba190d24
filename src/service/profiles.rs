use tracing::info;

use crate::{
    core::datastore::Datastore,
    model::{Profile, ProfileUpdate},
};

use super::{error::ServiceResult, load_or_create_profile, require_caller, Caller};

/// Profile read and update.
#[derive(Clone)]
pub struct ProfileService {
    datastore: Datastore,
}

impl ProfileService {
    /// Builds the service.
    pub fn new(datastore: Datastore) -> Self {
        Self { datastore }
    }

    /// Returns the caller's profile, creating it from the caller identity on first access.
    pub fn get_profile(&self, caller: Option<&Caller>) -> ServiceResult<Profile> {
        let caller = require_caller(caller)?;
        self.datastore
            .run_in_transaction(|txn| Ok(load_or_create_profile(txn, caller)))
    }

    /// Applies `update` to the caller's profile.
    pub fn save_profile(
        &self,
        caller: Option<&Caller>,
        update: &ProfileUpdate,
    ) -> ServiceResult<Profile> {
        let caller = require_caller(caller)?;
        let profile = self.datastore.run_in_transaction(|txn| -> ServiceResult<Profile> {
            let mut profile = load_or_create_profile(txn, caller);
            update.apply_to(&mut profile);
            txn.put(profile.clone());
            Ok(profile)
        })?;
        info!(user = %profile.user_id, "profile saved");
        Ok(profile)
    }
}
