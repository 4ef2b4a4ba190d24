use thiserror::Error;

use crate::{
    cache::CacheError,
    core::datastore::StoreError,
    model::ValidationError,
    query::filter::FilterError,
    types::{ConferenceKey, KeyParseError, SessionKey},
};

/// Errors returned by the service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad input: a missing required field, an unparsable date or a malformed key.
    #[error("{0}")]
    Validation(String),
    /// Client filters could not be compiled.
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// The referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The caller already attends the conference.
    #[error("you have already registered for conference {0}")]
    AlreadyRegistered(ConferenceKey),
    /// The session is already on the caller's wishlist.
    #[error("session {0} is already in your wishlist")]
    DuplicateWishlistEntry(SessionKey),
    /// The conference is full.
    #[error("there are no seats available for conference {0}")]
    NoSeatsAvailable(ConferenceKey),
    /// The session is not on the caller's wishlist.
    #[error("session {0} is not in your wishlist")]
    NotInWishlist(SessionKey),
    /// No caller identity was supplied.
    #[error("authorization required")]
    Unauthorized,
    /// The caller does not own the target.
    #[error("{0}")]
    Forbidden(String),
    /// Storage failure, including exhausted transaction retries.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value.0)
    }
}

impl From<KeyParseError> for ServiceError {
    fn from(value: KeyParseError) -> Self {
        Self::Validation(value.to_string())
    }
}

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
