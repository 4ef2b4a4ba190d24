use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
};

use conference_core::{
    cache::MemoryCache,
    config::{ServiceConfig, StoreConfig},
    core::{
        datastore::{Datastore, StoreError},
        store::EntityStore,
    },
    model::ConferenceDraft,
    op::StoredOp,
    persist::{OpSink, PersistError, PersistResult},
    service::{
        error::{ServiceError, ServiceResult},
        Caller, ConferenceCentral,
    },
    tasks::queue::{Job, QueueError, TaskQueue},
    types::{ConferenceKey, OpSeq},
};

#[derive(Default)]
struct RecordingQueue {
    jobs: Mutex<Vec<Job>>,
}

impl TaskQueue for RecordingQueue {
    fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        self.jobs.lock().expect("lock").push(job);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FlakyJournal {
    failing: Arc<AtomicBool>,
    appended: Arc<Mutex<Vec<OpSeq>>>,
}

impl OpSink for FlakyJournal {
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistError::Message("disk full".to_string()));
        }
        let mut appended = self.appended.lock().expect("lock");
        appended.extend(ops.iter().map(|o| o.seq));
        Ok(appended.last().copied().unwrap_or(0))
    }
}

fn user(id: &str) -> Caller {
    Caller::new(id, id.to_uppercase(), format!("{id}@example.com"))
}

fn setup(max_attendees: u32, attempts: u32) -> (ConferenceCentral, Datastore, ConferenceKey) {
    let config = ServiceConfig {
        store: StoreConfig {
            max_transaction_attempts: attempts,
        },
        ..ServiceConfig::default()
    };
    let datastore = Datastore::new(config.store.clone());
    let central = ConferenceCentral::new(
        datastore.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(RecordingQueue::default()),
        &config,
    );
    let key = central
        .conferences()
        .create_conference(
            Some(&user("organizer")),
            ConferenceDraft {
                name: "Capacity Conf".to_string(),
                max_attendees: Some(max_attendees),
                ..ConferenceDraft::default()
            },
        )
        .expect("create")
        .conference
        .key;
    (central, datastore, key)
}

fn seats(datastore: &Datastore, key: &ConferenceKey) -> u32 {
    datastore.read(|store| store.conference(key).map(|c| c.seats_available).expect("conference"))
}

#[test]
fn one_seat_goes_to_the_first_caller_only() {
    let (central, datastore, key) = setup(1, 3);
    let reg = central.registration();
    let websafe = key.websafe();

    assert!(reg.register(Some(&user("u1")), &websafe).expect("first register"));
    assert_eq!(seats(&datastore, &key), 0);

    assert!(matches!(
        reg.register(Some(&user("u1")), &websafe),
        Err(ServiceError::AlreadyRegistered(k)) if k == key
    ));
    assert!(matches!(
        reg.register(Some(&user("u2")), &websafe),
        Err(ServiceError::NoSeatsAvailable(k)) if k == key
    ));
    assert_eq!(seats(&datastore, &key), 0);

    let u2 = central.profiles().get_profile(Some(&user("u2"))).expect("profile");
    assert!(u2.conferences_to_attend.is_empty());
}

#[test]
fn unregister_without_registration_returns_false_and_changes_nothing() {
    let (central, datastore, key) = setup(5, 3);
    let before = datastore.read(|store| store.latest_op_seq());

    let removed = central
        .registration()
        .unregister(Some(&user("stranger")), &key.websafe())
        .expect("unregister");
    assert!(!removed);
    assert_eq!(seats(&datastore, &key), 5);
    assert_eq!(datastore.read(|store| store.latest_op_seq()), before);
}

#[test]
fn register_then_unregister_restores_state() {
    let (central, datastore, key) = setup(3, 3);
    let reg = central.registration();
    let alice = user("alice");

    assert!(reg.register(Some(&alice), &key.websafe()).expect("register"));
    assert_eq!(seats(&datastore, &key), 2);
    let attending = reg.conferences_to_attend(Some(&alice)).expect("attending");
    assert_eq!(attending.len(), 1);
    assert_eq!(attending[0].conference.key, key);
    assert_eq!(attending[0].organizer_display_name, "ORGANIZER");

    assert!(reg.unregister(Some(&alice), &key.websafe()).expect("unregister"));
    assert_eq!(seats(&datastore, &key), 3);
    assert!(reg.conferences_to_attend(Some(&alice)).expect("attending").is_empty());
}

#[test]
fn eleventh_registration_fails_at_capacity_ten() {
    let (central, datastore, key) = setup(10, 3);
    for i in 0..10 {
        central
            .registration()
            .register(Some(&user(&format!("u{i}"))), &key.websafe())
            .expect("within capacity");
    }
    assert!(matches!(
        central.registration().register(Some(&user("late")), &key.websafe()),
        Err(ServiceError::NoSeatsAvailable(_))
    ));
    assert_eq!(seats(&datastore, &key), 0);
}

#[test]
fn missing_conference_and_missing_caller_are_errors() {
    let (central, _, key) = setup(1, 3);
    let missing = ConferenceKey::new(key.organizer.clone(), key.id + 100).websafe();

    assert!(matches!(
        central.registration().register(Some(&user("u1")), &missing),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        central.registration().unregister(Some(&user("u1")), &missing),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        central.registration().register(None, &key.websafe()),
        Err(ServiceError::Unauthorized)
    ));
    assert!(matches!(
        central.registration().register(Some(&user("u1")), "not-a-key"),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn concurrent_registrations_never_oversell() {
    let (central, datastore, key) = setup(3, 16);
    let websafe = key.websafe();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let central = central.clone();
            let websafe = websafe.clone();
            thread::spawn(move || {
                central
                    .registration()
                    .register(Some(&user(&format!("t{i}"))), &websafe)
            })
        })
        .collect();

    let mut won = 0;
    for handle in handles {
        match handle.join().expect("thread") {
            Ok(true) => won += 1,
            Err(ServiceError::NoSeatsAvailable(_)) => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(won, 3);
    assert_eq!(seats(&datastore, &key), 0);
    let attendees = datastore.read(|store| {
        (0..8)
            .filter(|i| {
                store
                    .profile(&format!("t{i}"))
                    .is_some_and(|p| p.is_attending(&key))
            })
            .count()
    });
    assert_eq!(attendees, 3);
}

#[test]
fn journal_failure_applies_nothing_and_retry_succeeds() {
    let journal = FlakyJournal::default();
    let datastore = Datastore::with_journal(
        EntityStore::new(),
        Box::new(journal.clone()),
        StoreConfig::default(),
    );
    let central = ConferenceCentral::new(
        datastore.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(RecordingQueue::default()),
        &ServiceConfig::default(),
    );
    let key = central
        .conferences()
        .create_conference(
            Some(&user("organizer")),
            ConferenceDraft {
                name: "Journaled".to_string(),
                max_attendees: Some(1),
                ..ConferenceDraft::default()
            },
        )
        .expect("create")
        .conference
        .key;
    let before = datastore.read(|store| store.latest_op_seq());

    journal.failing.store(true, Ordering::SeqCst);
    assert!(matches!(
        central.registration().register(Some(&user("u1")), &key.websafe()),
        Err(ServiceError::Store(StoreError::Journal(_)))
    ));
    assert_eq!(seats(&datastore, &key), 1);
    assert!(datastore.read(|store| store.profile("u1").is_none()));
    assert_eq!(datastore.read(|store| store.latest_op_seq()), before);

    let mut renamed = datastore.read(|store| store.conference(&key).cloned()).expect("conference");
    renamed.name = "Renamed".to_string();
    assert!(matches!(datastore.put(renamed), Err(StoreError::Journal(_))));
    assert_eq!(
        datastore.read(|store| store.conference(&key).map(|c| c.name.clone())),
        Some("Journaled".to_string())
    );

    journal.failing.store(false, Ordering::SeqCst);
    assert!(central
        .registration()
        .register(Some(&user("u1")), &key.websafe())
        .expect("retry"));
    assert_eq!(seats(&datastore, &key), 0);

    // Rejected writes never consumed a sequence number.
    let appended = journal.appended.lock().expect("lock").clone();
    let expected: Vec<OpSeq> = (1..=appended.len() as OpSeq).collect();
    assert_eq!(appended, expected);
}

#[test]
fn contention_beyond_the_attempt_limit_fails_without_writing() {
    for attempts in [1, 3] {
        let (_central, datastore, key) = setup(5, attempts);
        let rival = datastore.clone();
        let mut runs = 0;

        let result = datastore.run_in_transaction(|txn| -> ServiceResult<()> {
            runs += 1;
            let Some(mut conf) = txn.get_conference(&key) else {
                return Err(ServiceError::NotFound(key.websafe()));
            };
            let mut competing = conf.clone();
            competing.description = Some(format!("rival write {runs}"));
            rival.put(competing)?;
            conf.seats_available -= 1;
            txn.put(conf);
            Ok(())
        });

        assert!(
            matches!(
                result,
                Err(ServiceError::Store(StoreError::TransactionFailed { attempts: a })) if a == attempts
            ),
            "unexpected result {result:?}"
        );
        assert_eq!(runs, attempts);
        assert_eq!(seats(&datastore, &key), 5);
    }
}

#[test]
fn a_lost_race_is_retried_transparently() {
    let (_central, datastore, key) = setup(5, 2);
    let rival = datastore.clone();
    let mut runs = 0;

    datastore
        .run_in_transaction(|txn| -> ServiceResult<()> {
            runs += 1;
            let Some(mut conf) = txn.get_conference(&key) else {
                return Err(ServiceError::NotFound(key.websafe()));
            };
            if runs == 1 {
                let mut competing = conf.clone();
                competing.description = Some("rival write".to_string());
                rival.put(competing)?;
            }
            conf.seats_available -= 1;
            txn.put(conf);
            Ok(())
        })
        .expect("second attempt commits");

    assert_eq!(runs, 2);
    let conf = datastore.read(|store| store.conference(&key).cloned()).expect("conference");
    assert_eq!(conf.seats_available, 4);
    assert_eq!(conf.description.as_deref(), Some("rival write"));
}
