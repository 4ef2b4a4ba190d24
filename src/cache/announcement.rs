use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    core::datastore::Datastore,
    query::plan::{Operator, Property, QueryPlan, Value},
};

use super::{get_json, set_json, Cache, CacheError, ANNOUNCEMENTS_KEY};

/// Text placed before the comma-separated conference names.
pub const ANNOUNCEMENT_PREFIX: &str =
    "Last chance to attend! The following conferences are nearly sold out: ";

/// Conferences with at most this many seats left (and at least one) are announced.
pub const NEARLY_SOLD_OUT_SEATS: i64 = 5;

/// `0 < seatsAvailable <= 5`, fewest seats first.
pub fn nearly_sold_out_plan() -> QueryPlan {
    QueryPlan::new()
        .filter(Property::SeatsAvailable, Operator::Le, Value::Int(NEARLY_SOLD_OUT_SEATS))
        .filter(Property::SeatsAvailable, Operator::Gt, Value::Int(0))
        .order(Property::SeatsAvailable)
        .order(Property::Name)
}

/// Announcement slot writer and reader.
#[derive(Clone)]
pub struct AnnouncementCache {
    datastore: Datastore,
    cache: Arc<dyn Cache>,
}

impl AnnouncementCache {
    /// Builds the writer/reader over a store and the shared cache.
    pub fn new(datastore: Datastore, cache: Arc<dyn Cache>) -> Self {
        Self { datastore, cache }
    }

    /// Rebuilds the slot: sets it when a conference is nearly sold out, clears it otherwise.
    pub fn recompute(&self) -> Result<String, CacheError> {
        let names: Vec<String> = self
            .datastore
            .query(&nearly_sold_out_plan())
            .into_iter()
            .map(|c| c.name)
            .collect();

        if names.is_empty() {
            self.cache.delete(ANNOUNCEMENTS_KEY);
            return Ok(String::new());
        }

        let announcement = format!("{ANNOUNCEMENT_PREFIX}{}", names.join(", "));
        set_json(self.cache.as_ref(), ANNOUNCEMENTS_KEY, &announcement)?;
        info!(conferences = names.len(), "announcement refreshed");
        Ok(announcement)
    }

    /// Cached announcement, or an empty string when there is none.
    pub fn get(&self) -> String {
        match get_json::<String>(self.cache.as_ref(), ANNOUNCEMENTS_KEY) {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "discarding undecodable announcement");
                String::new()
            }
        }
    }
}
