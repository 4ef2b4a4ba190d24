use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::{
    model::{Conference, Entity, EntityKey, Profile, Session},
    types::{ConferenceKey, SessionKey, Version},
};

use super::store::EntityStore;

/// Reads observed and writes staged by one transaction attempt.
#[derive(Debug, Default)]
pub struct WriteSet {
    /// Version of every key read from the committed store.
    pub reads: HashMap<EntityKey, Version>,
    /// Staged records in first-write order; later puts of a key replace earlier ones.
    pub writes: Vec<Entity>,
}

/// Optimistic transaction view over a committed [`EntityStore`].
///
/// Each read takes the shared lock only for its own duration, so other
/// writers may commit while the transaction runs. Reads go through to the
/// store (or to this transaction's own staged writes) and record the first
/// version seen; [`EntityStore::prepare_commit`] rejects the write set if any
/// of those versions moved.
pub struct Transaction<'a> {
    store: &'a RwLock<EntityStore>,
    reads: HashMap<EntityKey, Version>,
    staged: HashMap<EntityKey, usize>,
    writes: Vec<Entity>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(store: &'a RwLock<EntityStore>) -> Self {
        Self {
            store,
            reads: HashMap::new(),
            staged: HashMap::new(),
            writes: Vec::new(),
        }
    }

    /// Reads any entity.
    pub fn get(&mut self, key: &EntityKey) -> Option<Entity> {
        if let Some(idx) = self.staged.get(key) {
            return self.writes.get(*idx).cloned();
        }
        let store = self.store.read();
        self.reads
            .entry(key.clone())
            .or_insert_with(|| store.version_of(key));
        store.get(key)
    }

    /// Reads a profile.
    pub fn get_profile(&mut self, user_id: &str) -> Option<Profile> {
        match self.get(&EntityKey::Profile(user_id.to_string())) {
            Some(Entity::Profile(p)) => Some(p),
            _ => None,
        }
    }

    /// Reads a conference.
    pub fn get_conference(&mut self, key: &ConferenceKey) -> Option<Conference> {
        match self.get(&EntityKey::Conference(key.clone())) {
            Some(Entity::Conference(c)) => Some(c),
            _ => None,
        }
    }

    /// Reads a session.
    pub fn get_session(&mut self, key: &SessionKey) -> Option<Session> {
        match self.get(&EntityKey::Session(key.clone())) {
            Some(Entity::Session(s)) => Some(s),
            _ => None,
        }
    }

    /// Stages a write; nothing is visible outside this transaction until commit.
    pub fn put(&mut self, entity: impl Into<Entity>) {
        let entity = entity.into();
        let key = entity.key();
        match self.staged.get(&key) {
            Some(idx) => {
                if let Some(slot) = self.writes.get_mut(*idx) {
                    *slot = entity;
                }
            }
            None => {
                self.staged.insert(key, self.writes.len());
                self.writes.push(entity);
            }
        }
    }

    /// Number of staged writes.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    pub(crate) fn into_write_set(self) -> WriteSet {
        WriteSet {
            reads: self.reads,
            writes: self.writes,
        }
    }
}
