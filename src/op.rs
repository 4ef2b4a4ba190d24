//! Journal operation model and persistence wrappers.

use serde::{Deserialize, Serialize};

use crate::{
    model::{Conference, Entity, EntityKey, Profile, Session},
    types::OpSeq,
};

/// Version number for serialized [`StoredOpEnvelope`] payloads.
pub const OP_FORMAT_VERSION: u16 = 1;

/// Immutable operation appended to the journal. Every committed write is a full put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    PutProfile {
        profile: Profile,
    },
    PutConference {
        conference: Conference,
    },
    PutSession {
        session: Session,
    },
}

impl Op {
    /// Wraps an entity write.
    pub fn put(entity: Entity) -> Self {
        match entity {
            Entity::Profile(profile) => Self::PutProfile { profile },
            Entity::Conference(conference) => Self::PutConference { conference },
            Entity::Session(session) => Self::PutSession { session },
        }
    }

    /// Key of the written entity.
    pub fn entity_key(&self) -> EntityKey {
        match self {
            Self::PutProfile { profile } => EntityKey::Profile(profile.user_id.clone()),
            Self::PutConference { conference } => EntityKey::Conference(conference.key.clone()),
            Self::PutSession { session } => EntityKey::Session(session.key.clone()),
        }
    }

    /// Unwraps the written entity.
    pub fn into_entity(self) -> Entity {
        match self {
            Self::PutProfile { profile } => Entity::Profile(profile),
            Self::PutConference { conference } => Entity::Conference(conference),
            Self::PutSession { session } => Entity::Session(session),
        }
    }
}

/// Journal row metadata plus operation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOp {
    pub seq: OpSeq,
    pub ts_ms: u64,
    pub op: Op,
}

/// Versioned wrapper for stable on-disk payload decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOpEnvelope {
    pub format_version: u16,
    pub stored: StoredOp,
}

impl StoredOpEnvelope {
    /// Constructs an envelope using [`OP_FORMAT_VERSION`].
    pub fn new(stored: StoredOp) -> Self {
        Self {
            format_version: OP_FORMAT_VERSION,
            stored,
        }
    }
}
