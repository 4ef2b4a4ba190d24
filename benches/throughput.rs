use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use conference_core::{
    cache::MemoryCache,
    config::{ServiceConfig, StoreConfig},
    core::datastore::Datastore,
    model::ConferenceDraft,
    query::filter::{compile, FilterSpec},
    service::{Caller, ConferenceCentral},
    tasks::queue::{Job, QueueError, TaskQueue},
    types::ConferenceKey,
};

const CITIES: [&str; 4] = ["London", "Paris", "Berlin", "Oslo"];

struct NullQueue;

impl TaskQueue for NullQueue {
    fn enqueue(&self, _job: Job) -> Result<(), QueueError> {
        Ok(())
    }
}

fn seeded(n: u64) -> Datastore {
    let datastore = Datastore::new(StoreConfig::default());
    for i in 0..n {
        let conf = ConferenceDraft {
            name: format!("Conf {i:05}"),
            city: Some(CITIES[(i % 4) as usize].to_string()),
            topics: vec![format!("topic-{}", i % 7)],
            max_attendees: Some((i % 500) as u32),
            start_date: Some(format!("2026-{:02}-01", i % 12 + 1)),
            ..ConferenceDraft::default()
        }
        .into_conference(ConferenceKey::new("bench", i + 1))
        .expect("draft");
        datastore.put(conf).expect("put");
    }
    datastore
}

fn bench_filtered_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_query");
    let filters = [
        FilterSpec::new("CITY", "EQ", "London"),
        FilterSpec::new("MAX_ATTENDEES", "GT", "100"),
        FilterSpec::new("MONTH", "EQ", "6"),
    ];

    for n in [100u64, 1_000, 10_000] {
        let datastore = seeded(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let plan = compile(&filters).expect("compile");
                let _ = datastore.query(&plan);
            });
        });
    }

    group.finish();
}

fn bench_register_unregister(c: &mut Criterion) {
    let config = ServiceConfig::default();
    let central = ConferenceCentral::new(
        Datastore::new(config.store.clone()),
        Arc::new(MemoryCache::new()),
        Arc::new(NullQueue),
        &config,
    );
    let organizer = Caller::new("org", "Org", "org@example.com");
    let key = central
        .conferences()
        .create_conference(
            Some(&organizer),
            ConferenceDraft {
                name: "Bench".to_string(),
                max_attendees: Some(1_000),
                ..ConferenceDraft::default()
            },
        )
        .expect("create")
        .conference
        .key
        .websafe();
    let callers: Vec<Caller> = (0..100)
        .map(|i| Caller::new(format!("u{i}"), format!("U{i}"), format!("u{i}@example.com")))
        .collect();

    c.bench_function("register_unregister_100", |b| {
        b.iter(|| {
            for caller in &callers {
                central.registration().register(Some(caller), &key).expect("register");
            }
            for caller in &callers {
                central.registration().unregister(Some(caller), &key).expect("unregister");
            }
        });
    });
}

criterion_group!(benches, bench_filtered_query, bench_register_unregister);
criterion_main!(benches);
