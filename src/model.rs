//! Profile, conference and session records, plus the drafts and patches that write them.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ConferenceKey, SessionKey, TeeShirtSize, TypeOfSession, UserId};

/// City stored when a conference is created without one.
pub const DEFAULT_CITY: &str = "Default City";

/// Topics stored when a conference is created without any.
pub fn default_topics() -> Vec<String> {
    vec!["Default".to_string(), "Topic".to_string()]
}

/// A malformed or missing required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Per-user profile; attendance and wishlist live here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Immutable user id, also the profile key.
    pub user_id: UserId,
    /// Name shown to other users.
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    /// Conferences the user is registered for; never holds duplicates.
    pub conferences_to_attend: Vec<ConferenceKey>,
    /// Sessions on the user's wishlist; never holds duplicates.
    pub sessions_wishlist: Vec<SessionKey>,
}

impl Profile {
    /// Fresh profile with no registrations.
    pub fn new(
        user_id: impl Into<UserId>,
        display_name: impl Into<String>,
        main_email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            main_email: main_email.into(),
            tee_shirt_size: TeeShirtSize::NotSpecified,
            conferences_to_attend: Vec::new(),
            sessions_wishlist: Vec::new(),
        }
    }

    /// True when `key` is in the attending list.
    pub fn is_attending(&self, key: &ConferenceKey) -> bool {
        self.conferences_to_attend.contains(key)
    }

    /// True when `key` is on the wishlist.
    pub fn has_wishlisted(&self, key: &SessionKey) -> bool {
        self.sessions_wishlist.contains(key)
    }
}

/// Sparse profile update; `None` fields are left alone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
}

impl ProfileUpdate {
    /// Applies the set fields; blank names are ignored.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            profile.display_name = name.to_string();
        }
        if let Some(size) = self.tee_shirt_size {
            profile.tee_shirt_size = size;
        }
    }
}

/// Conference record, child of the organizer's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub key: ConferenceKey,
    pub name: String,
    pub description: Option<String>,
    /// Back-reference to the organizer profile.
    pub organizer_user_id: UserId,
    pub city: String,
    pub topics: Vec<String>,
    pub max_attendees: u32,
    /// Remaining seats, `0 <= seats_available <= max_attendees`.
    pub seats_available: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Month of `start_date` (1-12), 0 without a start date.
    pub month: u32,
}

impl Conference {
    /// Seats already taken.
    pub fn registered(&self) -> u32 {
        self.max_attendees.saturating_sub(self.seats_available)
    }
}

/// Creation payload for a [`Conference`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConferenceDraft {
    pub name: String,
    pub description: Option<String>,
    /// City, defaults to [`DEFAULT_CITY`].
    pub city: Option<String>,
    /// Topics, default to [`default_topics`] when empty.
    pub topics: Vec<String>,
    pub max_attendees: Option<u32>,
    /// `YYYY-MM-DD`, anything past the 10th character is ignored.
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`, anything past the 10th character is ignored.
    pub end_date: Option<String>,
}

impl ConferenceDraft {
    /// Checks required fields, applies defaults and materializes the record.
    pub fn into_conference(self, key: ConferenceKey) -> Result<Conference, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError("conference 'name' field required".to_string()));
        }

        let start_date = parse_optional_date("startDate", self.start_date.as_deref())?;
        let end_date = parse_optional_date("endDate", self.end_date.as_deref())?;
        let max_attendees = self.max_attendees.unwrap_or(0);
        let city = self
            .city
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CITY.to_string());
        let topics = if self.topics.is_empty() {
            default_topics()
        } else {
            self.topics
        };

        Ok(Conference {
            organizer_user_id: key.organizer.clone(),
            key,
            name: self.name,
            description: self.description,
            city,
            topics,
            max_attendees,
            seats_available: max_attendees,
            start_date,
            end_date,
            month: month_of(start_date),
        })
    }
}

/// Sparse conference update; `None` fields are left alone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConferencePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    /// Replacement topics; an empty list is ignored.
    pub topics: Option<Vec<String>>,
    /// New capacity; seats shift by the same delta.
    pub max_attendees: Option<u32>,
    /// Replacement start date; also re-derives `month`.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ConferencePatch {
    /// Applies the patch in place. Nothing is written when validation fails.
    pub fn apply_to(&self, conf: &mut Conference) -> Result<(), ValidationError> {
        let start_date = parse_optional_date("startDate", self.start_date.as_deref())?;
        let end_date = parse_optional_date("endDate", self.end_date.as_deref())?;

        let seats = match self.max_attendees {
            Some(max) => {
                let registered = conf.registered();
                if max < registered {
                    return Err(ValidationError(format!(
                        "maxAttendees {max} is below the {registered} registered attendees"
                    )));
                }
                Some((max, max - registered))
            }
            None => None,
        };

        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            conf.name = name.to_string();
        }
        if let Some(description) = &self.description {
            conf.description = Some(description.clone());
        }
        if let Some(city) = self.city.as_deref().filter(|c| !c.trim().is_empty()) {
            conf.city = city.to_string();
        }
        if let Some(topics) = self.topics.as_ref().filter(|t| !t.is_empty()) {
            conf.topics = topics.clone();
        }
        if let Some((max, seats)) = seats {
            conf.max_attendees = max;
            conf.seats_available = seats;
        }
        if let Some(date) = start_date {
            conf.start_date = Some(date);
            conf.month = month_of(Some(date));
        }
        if let Some(date) = end_date {
            conf.end_date = Some(date);
        }
        Ok(())
    }
}

/// Session record, child of a conference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    pub name: String,
    pub highlights: Option<String>,
    /// Speaker name; no referential integrity.
    pub speaker: Option<String>,
    pub duration_minutes: Option<u32>,
    pub type_of_session: TypeOfSession,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
}

impl Session {
    /// True when the speaker is set and equals `speaker`.
    pub fn is_by(&self, speaker: &str) -> bool {
        self.speaker.as_deref() == Some(speaker)
    }
}

/// Creation payload for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionDraft {
    pub name: String,
    pub highlights: Option<String>,
    pub speaker: Option<String>,
    pub duration_minutes: Option<u32>,
    /// Format, defaults to [`TypeOfSession::Unknown`].
    pub type_of_session: Option<TypeOfSession>,
    /// `YYYY-MM-DD`, anything past the 10th character is ignored.
    pub date: Option<String>,
    /// `HH:MM`, anything past the 5th character is ignored.
    pub start_time: Option<String>,
}

impl SessionDraft {
    /// Checks required fields and materializes the record.
    pub fn into_session(self, key: SessionKey) -> Result<Session, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError("session 'name' field required".to_string()));
        }
        let date = parse_optional_date("date", self.date.as_deref())?;
        let start_time = match self.start_time.as_deref().filter(|t| !t.is_empty()) {
            Some(raw) => Some(parse_time(raw)?),
            None => None,
        };
        Ok(Session {
            key,
            name: self.name,
            highlights: self.highlights,
            speaker: self.speaker.filter(|s| !s.is_empty()),
            duration_minutes: self.duration_minutes,
            type_of_session: self.type_of_session.unwrap_or_default(),
            date,
            start_time,
        })
    }
}

/// Parses `YYYY-MM-DD` from the first 10 characters of `raw`.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .map_err(|e| ValidationError(format!("invalid date {raw:?}: {e}")))
}

/// Parses `HH:MM` from the first 5 characters of `raw`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    let head = raw.get(..5).unwrap_or(raw);
    NaiveTime::parse_from_str(head, "%H:%M")
        .map_err(|e| ValidationError(format!("invalid time {raw:?}: {e}")))
}

fn parse_optional_date(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, ValidationError> {
    match raw.filter(|r| !r.is_empty()) {
        Some(raw) => parse_date(raw)
            .map(Some)
            .map_err(|e| ValidationError(format!("{field}: {e}"))),
        None => Ok(None),
    }
}

fn month_of(date: Option<NaiveDate>) -> u32 {
    date.map(|d| d.month()).unwrap_or(0)
}

/// Key of any stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKey {
    /// Profile keyed by user id.
    Profile(UserId),
    Conference(ConferenceKey),
    Session(SessionKey),
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Profile(id) => write!(f, "{id}"),
            Self::Conference(key) => write!(f, "{key}"),
            Self::Session(key) => write!(f, "{key}"),
        }
    }
}

/// Any stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    Profile(Profile),
    Conference(Conference),
    Session(Session),
}

impl Entity {
    /// Key under which the record is stored.
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Profile(p) => EntityKey::Profile(p.user_id.clone()),
            Self::Conference(c) => EntityKey::Conference(c.key.clone()),
            Self::Session(s) => EntityKey::Session(s.key.clone()),
        }
    }
}

impl From<Profile> for Entity {
    fn from(value: Profile) -> Self {
        Self::Profile(value)
    }
}

impl From<Conference> for Entity {
    fn from(value: Conference) -> Self {
        Self::Conference(value)
    }
}

impl From<Session> for Entity {
    fn from(value: Session) -> Self {
        Self::Session(value)
    }
}
