//! Shared primitive IDs, entity keys and enums.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable user identifier supplied by the identity layer.
pub type UserId = String;
/// Conference identifier, unique under its organizer profile.
pub type ConferenceId = u64;
/// Session identifier, unique under its conference.
pub type SessionId = u64;
/// Monotonic journal sequence number.
pub type OpSeq = u64;
/// Entity version; the sequence of the op that last wrote the entity, 0 when absent.
pub type Version = u64;

/// Returned when a websafe key string cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed entity key: {0:?}")]
pub struct KeyParseError(pub String);

/// Key of a conference: `Profile(organizer) -> Conference(id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConferenceKey {
    /// Organizer user id (parent profile).
    pub organizer: UserId,
    /// Id allocated under the organizer.
    pub id: ConferenceId,
}

impl ConferenceKey {
    /// Builds a key from its parts.
    pub fn new(organizer: impl Into<UserId>, id: ConferenceId) -> Self {
        Self {
            organizer: organizer.into(),
            id,
        }
    }

    /// Encodes the key in its websafe text form, `"<user>/c/<id>"`.
    pub fn websafe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/c/{}", self.organizer, self.id)
    }
}

impl FromStr for ConferenceKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (parent, id) = split_tagged(s, "c")?;
        if parent.is_empty() {
            return Err(KeyParseError(s.to_string()));
        }
        Ok(Self::new(parent, id))
    }
}

/// Key of a session: `Profile -> Conference -> Session(id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub conference: ConferenceKey,
    /// Id allocated under the conference.
    pub id: SessionId,
}

impl SessionKey {
    /// Builds a key from its parts.
    pub fn new(conference: ConferenceKey, id: SessionId) -> Self {
        Self { conference, id }
    }

    /// Encodes the key in its websafe text form, `"<user>/c/<id>/s/<id>"`.
    pub fn websafe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/s/{}", self.conference, self.id)
    }
}

impl FromStr for SessionKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (parent, id) = split_tagged(s, "s")?;
        let conference = parent
            .parse::<ConferenceKey>()
            .map_err(|_| KeyParseError(s.to_string()))?;
        Ok(Self::new(conference, id))
    }
}

// Splits `"<parent>/<tag>/<id>"` from the right so the parent may contain '/'.
fn split_tagged<'a>(s: &'a str, tag: &str) -> Result<(&'a str, u64), KeyParseError> {
    let mut parts = s.rsplitn(3, '/');
    let (Some(id), Some(found_tag), Some(parent)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(KeyParseError(s.to_string()));
    };
    if found_tag != tag {
        return Err(KeyParseError(s.to_string()));
    }
    let id = id.parse::<u64>().map_err(|_| KeyParseError(s.to_string()))?;
    Ok((parent, id))
}

/// T-shirt size preference kept on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeeShirtSize {
    /// No preference given.
    #[default]
    NotSpecified,
    XsM,
    XsW,
    SM,
    SW,
    MM,
    MW,
    LM,
    LW,
    XlM,
    XlW,
    XxlM,
    XxlW,
    XxxlM,
    XxxlW,
}

/// Session format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TypeOfSession {
    /// Format not given.
    #[default]
    Unknown,
    Lecture,
    Keynote,
    Workshop,
    Panel,
    Other,
}

impl TypeOfSession {
    /// Display name used by clients.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Lecture => "Lecture",
            Self::Keynote => "Keynote",
            Self::Workshop => "Workshop",
            Self::Panel => "Panel",
            Self::Other => "Other",
        }
    }
}
