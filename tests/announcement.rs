use std::sync::Arc;

use conference_core::{
    cache::{
        announcement::{nearly_sold_out_plan, AnnouncementCache, ANNOUNCEMENT_PREFIX},
        Cache, MemoryCache, ANNOUNCEMENTS_KEY,
    },
    config::StoreConfig,
    core::datastore::Datastore,
    model::ConferenceDraft,
    query::plan::Property,
    types::ConferenceKey,
};

fn put_conference(datastore: &Datastore, id: u64, name: &str, max: u32, seats: u32) {
    let mut conf = ConferenceDraft {
        name: name.to_string(),
        max_attendees: Some(max),
        ..ConferenceDraft::default()
    }
    .into_conference(ConferenceKey::new("org", id))
    .expect("draft");
    conf.seats_available = seats;
    datastore.put(conf).expect("put");
}

#[test]
fn plan_orders_by_seats_then_name() {
    let plan = nearly_sold_out_plan();
    assert_eq!(plan.sort_keys(), &[Property::SeatsAvailable, Property::Name]);
    assert_eq!(plan.predicates().len(), 2);
}

#[test]
fn nearly_sold_out_conferences_are_announced_fewest_seats_first() {
    let datastore = Datastore::new(StoreConfig::default());
    let cache = Arc::new(MemoryCache::new());
    let announcements = AnnouncementCache::new(datastore.clone(), cache.clone());

    put_conference(&datastore, 1, "Roomy", 100, 80);
    put_conference(&datastore, 2, "Tight", 10, 3);
    put_conference(&datastore, 3, "Tighter", 10, 1);
    put_conference(&datastore, 4, "Full", 10, 0);
    put_conference(&datastore, 5, "Edge", 10, 5);

    let text = announcements.recompute().expect("recompute");
    assert_eq!(text, format!("{ANNOUNCEMENT_PREFIX}Tighter, Tight, Edge"));
    assert_eq!(announcements.get(), text);
    assert!(cache.get(ANNOUNCEMENTS_KEY).is_some());
}

#[test]
fn slot_is_cleared_when_nothing_qualifies() {
    let datastore = Datastore::new(StoreConfig::default());
    let cache = Arc::new(MemoryCache::new());
    let announcements = AnnouncementCache::new(datastore.clone(), cache.clone());

    put_conference(&datastore, 1, "Tight", 10, 3);
    assert!(announcements.recompute().expect("recompute").contains("Tight"));

    put_conference(&datastore, 1, "Tight", 10, 0);
    assert_eq!(announcements.recompute().expect("recompute"), "");
    assert_eq!(announcements.get(), "");
    assert!(cache.get(ANNOUNCEMENTS_KEY).is_none());
    assert!(cache.is_empty());
}

#[test]
fn empty_cache_reads_as_empty_string() {
    let announcements = AnnouncementCache::new(
        Datastore::new(StoreConfig::default()),
        Arc::new(MemoryCache::new()),
    );
    assert_eq!(announcements.get(), "");
}
