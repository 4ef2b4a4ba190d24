use tracing::info;

use crate::{core::datastore::Datastore, model::Session, types::SessionKey};

use super::{
    error::{ServiceError, ServiceResult},
    load_or_create_profile, require_caller, Caller,
};

/// Per-user session wishlist.
#[derive(Clone)]
pub struct WishlistService {
    datastore: Datastore,
}

impl WishlistService {
    /// Builds the service.
    pub fn new(datastore: Datastore) -> Self {
        Self { datastore }
    }

    /// Adds a session to the caller's wishlist.
    pub fn add_to_wishlist(&self, caller: Option<&Caller>, websafe_key: &str) -> ServiceResult<bool> {
        let caller = require_caller(caller)?;
        let key: SessionKey = websafe_key.parse()?;

        self.datastore.run_in_transaction(|txn| -> ServiceResult<()> {
            if txn.get_session(&key).is_none() {
                return Err(ServiceError::NotFound(format!(
                    "no session found with key: {websafe_key}"
                )));
            }
            let mut profile = load_or_create_profile(txn, caller);
            if profile.has_wishlisted(&key) {
                return Err(ServiceError::DuplicateWishlistEntry(key.clone()));
            }
            profile.sessions_wishlist.push(key.clone());
            txn.put(profile);
            Ok(())
        })?;

        info!(user = %caller.user_id, session = %key, "added to wishlist");
        Ok(true)
    }

    /// Removes a session from the caller's wishlist; a miss is an error.
    pub fn remove_from_wishlist(
        &self,
        caller: Option<&Caller>,
        websafe_key: &str,
    ) -> ServiceResult<bool> {
        let caller = require_caller(caller)?;
        let key: SessionKey = websafe_key.parse()?;

        self.datastore.run_in_transaction(|txn| -> ServiceResult<()> {
            if txn.get_session(&key).is_none() {
                return Err(ServiceError::NotFound(format!(
                    "no session found with key: {websafe_key}"
                )));
            }
            let mut profile = match txn.get_profile(&caller.user_id) {
                Some(profile) if profile.has_wishlisted(&key) => profile,
                _ => return Err(ServiceError::NotInWishlist(key.clone())),
            };
            profile.sessions_wishlist.retain(|k| k != &key);
            txn.put(profile);
            Ok(())
        })?;

        info!(user = %caller.user_id, session = %key, "removed from wishlist");
        Ok(true)
    }

    /// Sessions on the caller's wishlist, in the order they were added.
    pub fn sessions_in_wishlist(&self, caller: Option<&Caller>) -> ServiceResult<Vec<Session>> {
        let caller = require_caller(caller)?;
        Ok(self.datastore.read(|store| {
            store
                .profile(&caller.user_id)
                .map(|p| {
                    p.sessions_wishlist
                        .iter()
                        .filter_map(|k| store.session(k).cloned())
                        .collect()
                })
                .unwrap_or_default()
        }))
    }
}
