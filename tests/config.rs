use conference_core::{
    config::{ConfigError, FeaturedSpeakerMode, ServiceConfig},
    telemetry::init_tracing,
};

#[test]
fn defaults_are_valid() {
    let config = ServiceConfig::default();
    config.validate().expect("defaults validate");
    assert_eq!(config.store.max_transaction_attempts, 3);
    assert_eq!(config.worker.job_max_attempts, 3);
    assert_eq!(config.featured_speaker, FeaturedSpeakerMode::Incremental);
}

#[test]
fn partial_documents_fill_in_defaults() {
    let config = ServiceConfig::from_json_str(
        r#"{ "worker": { "queue_bound": 8 }, "featured_speaker": "always_rescan" }"#,
    )
    .expect("parse");
    assert_eq!(config.worker.queue_bound, 8);
    assert_eq!(config.worker.announcement_interval_ms, 60_000);
    assert_eq!(config.store.max_transaction_attempts, 3);
    assert_eq!(config.featured_speaker, FeaturedSpeakerMode::AlwaysRescan);

    assert_eq!(ServiceConfig::from_json_str("{}").expect("empty"), ServiceConfig::default());
}

#[test]
fn zero_limits_are_rejected() {
    for doc in [
        r#"{ "store": { "max_transaction_attempts": 0 } }"#,
        r#"{ "worker": { "queue_bound": 0 } }"#,
        r#"{ "worker": { "job_max_attempts": 0 } }"#,
        r#"{ "worker": { "event_capacity": 0 } }"#,
    ] {
        assert!(
            matches!(ServiceConfig::from_json_str(doc), Err(ConfigError::Invalid(_))),
            "{doc} should be invalid"
        );
    }

    let ticking_off = ServiceConfig::from_json_str(r#"{ "worker": { "announcement_interval_ms": 0 } }"#)
        .expect("a zero interval disables the tick");
    assert_eq!(ticking_off.worker.announcement_interval_ms, 0);
}

#[test]
fn malformed_documents_fail_to_parse() {
    assert!(matches!(
        ServiceConfig::from_json_str("{ not json"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        ServiceConfig::from_json_str(r#"{ "featured_speaker": "sometimes" }"#),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn tracing_installs_once() {
    let _ = init_tracing("conference_core=debug");
    assert!(!init_tracing("conference_core=debug"));
}
