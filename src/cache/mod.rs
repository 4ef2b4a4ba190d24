//! Process-wide keyed cache and the derived entries kept in it.

/// Nearly-sold-out announcement slot.
pub mod announcement;
/// Featured-speaker slot and its incremental maintenance.
pub mod featured;

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Slot holding the announcement string.
pub const ANNOUNCEMENTS_KEY: &str = "RECENT_ANNOUNCEMENTS";
/// Slot holding the featured-speaker entry.
pub const FEATURED_SPEAKER_KEY: &str = "FEATURED_SPEAKER";

/// Cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A value could not be encoded or decoded.
    #[error("cache codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Keyed byte cache shared by writers and readers. Reads never block on writers
/// finishing a recompute; an absent slot is simply `None`.
pub trait Cache: Send + Sync {
    /// Current value of `key`.
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    /// Overwrites `key`.
    fn set(&self, key: &str, value: Vec<u8>);
    /// Removes `key`; returns whether it was present.
    fn delete(&self, key: &str) -> bool;
}

/// Reads and decodes a JSON value.
pub fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Result<Option<T>, CacheError> {
    match cache.get(key) {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encodes and writes a JSON value.
pub fn set_json<T: Serialize>(cache: &dyn Cache, key: &str, value: &T) -> Result<(), CacheError> {
    cache.set(key, serde_json::to_vec(value)?);
    Ok(())
}

/// In-process [`Cache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    slots: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// True when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.slots.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.slots.write().insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) -> bool {
        self.slots.write().remove(key).is_some()
    }
}
