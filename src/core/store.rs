use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    model::{Conference, Entity, EntityKey, Profile, Session},
    op::{Op, StoredOp},
    query::plan::QueryPlan,
    types::{ConferenceId, ConferenceKey, OpSeq, SessionId, SessionKey, UserId, Version},
};

use super::{
    indices::{insert_child, ChildIndex},
    transaction::WriteSet,
};

/// A read in a transaction no longer matches the committed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub key: EntityKey,
    pub read: Version,
    pub current: Version,
}

/// Entity plus the version it was committed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntity {
    /// Commit sequence that last wrote the entity.
    pub version: Version,
    pub entity: Entity,
}

/// Full store image written by checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshotV1 {
    pub next_op_seq: OpSeq,
    /// Every record, profiles first, then conferences, then sessions.
    pub entities: Vec<SnapshotEntity>,
    /// Next conference id per organizer.
    pub next_conference_ids: Vec<(UserId, ConferenceId)>,
    /// Next session id per conference.
    pub next_session_ids: Vec<(ConferenceKey, SessionId)>,
}

#[derive(Debug, Clone)]
struct Versioned<T> {
    version: Version,
    value: T,
}

/// Authoritative in-memory entity tables keyed by ancestor path.
#[derive(Debug, Default)]
pub struct EntityStore {
    profiles: HashMap<UserId, Versioned<Profile>>,
    conferences: HashMap<ConferenceKey, Versioned<Conference>>,
    sessions: HashMap<SessionKey, Versioned<Session>>,
    conferences_by_organizer: ChildIndex<UserId, ConferenceKey>,
    sessions_by_conference: ChildIndex<ConferenceKey, SessionKey>,
    next_conference_id: HashMap<UserId, ConferenceId>,
    next_session_id: HashMap<ConferenceKey, SessionId>,
    next_op_seq: OpSeq,
}

impl EntityStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            next_op_seq: 1,
            ..Self::default()
        }
    }

    /// Rebuilds a store from a checkpoint image.
    pub fn from_snapshot(snapshot: StoreSnapshotV1) -> Self {
        let mut store = Self {
            next_op_seq: snapshot.next_op_seq.max(1),
            ..Self::default()
        };
        for item in snapshot.entities {
            store.insert_entity(item.entity, item.version);
        }
        for (organizer, next) in snapshot.next_conference_ids {
            let slot = store.next_conference_id.entry(organizer).or_insert(1);
            *slot = (*slot).max(next);
        }
        for (conference, next) in snapshot.next_session_ids {
            let slot = store.next_session_id.entry(conference).or_insert(1);
            *slot = (*slot).max(next);
        }
        store
    }

    /// Captures every record and allocator position.
    pub fn export_snapshot(&self) -> StoreSnapshotV1 {
        let mut profiles: Vec<_> = self.profiles.values().collect();
        profiles.sort_by(|a, b| a.value.user_id.cmp(&b.value.user_id));
        let mut conferences: Vec<_> = self.conferences.values().collect();
        conferences.sort_by(|a, b| a.value.key.cmp(&b.value.key));
        let mut sessions: Vec<_> = self.sessions.values().collect();
        sessions.sort_by(|a, b| a.value.key.cmp(&b.value.key));

        let entities = profiles
            .into_iter()
            .map(|v| SnapshotEntity {
                version: v.version,
                entity: Entity::Profile(v.value.clone()),
            })
            .chain(conferences.into_iter().map(|v| SnapshotEntity {
                version: v.version,
                entity: Entity::Conference(v.value.clone()),
            }))
            .chain(sessions.into_iter().map(|v| SnapshotEntity {
                version: v.version,
                entity: Entity::Session(v.value.clone()),
            }))
            .collect();

        let mut next_conference_ids: Vec<_> = self
            .next_conference_id
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        next_conference_ids.sort();
        let mut next_session_ids: Vec<_> = self
            .next_session_id
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        next_session_ids.sort();

        StoreSnapshotV1 {
            next_op_seq: self.next_op_seq,
            entities,
            next_conference_ids,
            next_session_ids,
        }
    }

    /// Reserves the next conference id under `organizer`.
    pub fn allocate_conference_id(&mut self, organizer: &str) -> ConferenceId {
        let slot = self
            .next_conference_id
            .entry(organizer.to_string())
            .or_insert(1);
        let id = *slot;
        *slot += 1;
        id
    }

    /// Reserves the next session id under `conference`.
    pub fn allocate_session_id(&mut self, conference: &ConferenceKey) -> SessionId {
        let slot = self.next_session_id.entry(conference.clone()).or_insert(1);
        let id = *slot;
        *slot += 1;
        id
    }

    /// Profile by user id.
    pub fn profile(&self, user_id: &str) -> Option<&Profile> {
        self.profiles.get(user_id).map(|v| &v.value)
    }

    /// Conference by key.
    pub fn conference(&self, key: &ConferenceKey) -> Option<&Conference> {
        self.conferences.get(key).map(|v| &v.value)
    }

    /// Session by key.
    pub fn session(&self, key: &SessionKey) -> Option<&Session> {
        self.sessions.get(key).map(|v| &v.value)
    }

    /// Any entity by key, cloned.
    pub fn get(&self, key: &EntityKey) -> Option<Entity> {
        match key {
            EntityKey::Profile(id) => self.profile(id).cloned().map(Entity::Profile),
            EntityKey::Conference(k) => self.conference(k).cloned().map(Entity::Conference),
            EntityKey::Session(k) => self.session(k).cloned().map(Entity::Session),
        }
    }

    /// Several entities at once; missing keys yield `None` in place.
    pub fn get_multi(&self, keys: &[EntityKey]) -> Vec<Option<Entity>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    /// Committed version of `key`, 0 when absent.
    pub fn version_of(&self, key: &EntityKey) -> Version {
        match key {
            EntityKey::Profile(id) => self.profiles.get(id).map(|v| v.version),
            EntityKey::Conference(k) => self.conferences.get(k).map(|v| v.version),
            EntityKey::Session(k) => self.sessions.get(k).map(|v| v.version),
        }
        .unwrap_or(0)
    }

    /// All conferences, in no particular order.
    pub fn conferences(&self) -> impl Iterator<Item = &Conference> + '_ {
        self.conferences.values().map(|v| &v.value)
    }

    /// Conferences organized by `organizer`, by id.
    pub fn conferences_of(&self, organizer: &str) -> Vec<&Conference> {
        self.conferences_by_organizer
            .get(organizer)
            .into_iter()
            .flat_map(|keys| keys.iter())
            .filter_map(|k| self.conference(k))
            .collect()
    }

    /// Sessions of `conference`, by id.
    pub fn sessions_in(&self, conference: &ConferenceKey) -> Vec<&Session> {
        self.sessions_by_conference
            .get(conference)
            .into_iter()
            .flat_map(|keys| keys.iter())
            .filter_map(|k| self.session(k))
            .collect()
    }

    /// All sessions, ordered by key.
    pub fn sessions(&self) -> Vec<&Session> {
        let mut out: Vec<&Session> = self.sessions.values().map(|v| &v.value).collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    /// Runs a conference query.
    pub fn query(&self, plan: &QueryPlan) -> Vec<Conference> {
        plan.execute(self.conferences())
    }

    /// Blind single-entity write.
    pub fn put(&mut self, entity: Entity) -> StoredOp {
        let stored = self.prepare_put(entity);
        self.apply_op(stored.clone());
        stored
    }

    /// Sequences a blind write without applying it.
    pub fn prepare_put(&self, entity: Entity) -> StoredOp {
        StoredOp {
            seq: self.next_op_seq.max(1),
            ts_ms: now_ms(),
            op: Op::put(entity),
        }
    }

    /// Validates the read set of a transaction and sequences its writes
    /// without applying them. The ops take consecutive sequences starting at
    /// the next free one, so they must be applied before anything else is
    /// prepared.
    pub fn prepare_commit(&self, write_set: WriteSet) -> Result<Vec<StoredOp>, Conflict> {
        self.check_reads(&write_set.reads)?;
        let first = self.next_op_seq.max(1);
        let ts_ms = now_ms();
        Ok(write_set
            .writes
            .into_iter()
            .zip(first..)
            .map(|(entity, seq)| StoredOp {
                seq,
                ts_ms,
                op: Op::put(entity),
            })
            .collect())
    }

    /// Fails with the first key whose committed version differs from the one read.
    pub fn check_reads(&self, reads: &HashMap<EntityKey, Version>) -> Result<(), Conflict> {
        for (key, read) in reads {
            let current = self.version_of(key);
            if current != *read {
                return Err(Conflict {
                    key: key.clone(),
                    read: *read,
                    current,
                });
            }
        }
        Ok(())
    }

    /// Applies prepared ops in order.
    pub fn apply_ops(&mut self, ops: Vec<StoredOp>) {
        for stored in ops {
            self.apply_op(stored);
        }
    }

    /// Re-applies a journaled op during recovery.
    pub fn apply_replayed_op(&mut self, stored: StoredOp) {
        self.apply_op(stored);
    }

    fn apply_op(&mut self, stored: StoredOp) {
        let seq = stored.seq;
        self.insert_entity(stored.op.into_entity(), seq);
        self.bump_next_seq_from(seq);
    }

    /// Sequence of the most recent write.
    pub fn latest_op_seq(&self) -> OpSeq {
        self.next_op_seq.saturating_sub(1)
    }

    fn insert_entity(&mut self, entity: Entity, version: Version) {
        match entity {
            Entity::Profile(profile) => {
                self.profiles.insert(
                    profile.user_id.clone(),
                    Versioned {
                        version,
                        value: profile,
                    },
                );
            }
            Entity::Conference(conference) => {
                let key = conference.key.clone();
                let slot = self
                    .next_conference_id
                    .entry(key.organizer.clone())
                    .or_insert(1);
                *slot = (*slot).max(key.id.saturating_add(1));
                insert_child(
                    &mut self.conferences_by_organizer,
                    key.organizer.clone(),
                    key.clone(),
                );
                self.conferences.insert(
                    key,
                    Versioned {
                        version,
                        value: conference,
                    },
                );
            }
            Entity::Session(session) => {
                let key = session.key.clone();
                let slot = self
                    .next_session_id
                    .entry(key.conference.clone())
                    .or_insert(1);
                *slot = (*slot).max(key.id.saturating_add(1));
                insert_child(
                    &mut self.sessions_by_conference,
                    key.conference.clone(),
                    key.clone(),
                );
                self.sessions.insert(
                    key,
                    Versioned {
                        version,
                        value: session,
                    },
                );
            }
        }
    }

    fn bump_next_seq_from(&mut self, seq: OpSeq) {
        self.next_op_seq = self.next_op_seq.max(seq.saturating_add(1));
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
