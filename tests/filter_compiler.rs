use proptest::prelude::*;

use conference_core::{
    core::store::EntityStore,
    model::{Conference, ConferenceDraft, Entity},
    query::{
        filter::{compile, Field, FilterError, FilterSpec},
        plan::{Operator, Property, Value},
    },
    types::ConferenceKey,
};

fn conference(id: u64, name: &str, city: &str, topics: &[&str], max: u32, start: &str) -> Conference {
    ConferenceDraft {
        name: name.to_string(),
        city: Some(city.to_string()),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        max_attendees: Some(max),
        start_date: (!start.is_empty()).then(|| start.to_string()),
        ..ConferenceDraft::default()
    }
    .into_conference(ConferenceKey::new("org", id))
    .expect("valid draft")
}

fn seeded_store() -> EntityStore {
    let mut store = EntityStore::new();
    for conf in [
        conference(1, "Zeta Summit", "London", &["Rust", "Web"], 500, "2026-06-10"),
        conference(2, "Alpha Days", "Paris", &["Go"], 50, "2026-03-02"),
        conference(3, "Mid Conf", "London", &["Web"], 50, "2026-06-01"),
        conference(4, "Beta Fest", "Berlin", &["Rust"], 10, ""),
    ] {
        let _ = store.put(Entity::Conference(conf));
    }
    store
}

fn names(rows: &[Conference]) -> Vec<&str> {
    rows.iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn two_inequality_fields_are_rejected() {
    let err = compile(&[
        FilterSpec::new("MONTH", "GT", "3"),
        FilterSpec::new("MAX_ATTENDEES", "LT", "100"),
    ])
    .expect_err("must reject");
    assert_eq!(
        err,
        FilterError::MultipleInequalityFields {
            first: Field::Month,
            second: Field::MaxAttendees,
        }
    );
}

#[test]
fn inequality_field_leads_the_sort_order() {
    let plan = compile(&[
        FilterSpec::new("CITY", "EQ", "London"),
        FilterSpec::new("MAX_ATTENDEES", "GTEQ", "20"),
    ])
    .expect("compile");
    assert_eq!(plan.sort_keys(), &[Property::MaxAttendees, Property::Name]);
    assert_eq!(plan.predicates().len(), 2);
    assert_eq!(plan.predicates()[1].op, Operator::Ge);
    assert_eq!(plan.predicates()[1].value, Value::Int(20));
}

#[test]
fn equality_only_plans_sort_by_name() {
    let plan = compile(&[FilterSpec::new("TOPIC", "EQ", "Rust")]).expect("compile");
    assert_eq!(plan.sort_keys(), &[Property::Name]);

    let empty = compile(&[]).expect("compile");
    assert_eq!(empty.sort_keys(), &[Property::Name]);
    assert!(empty.predicates().is_empty());
}

#[test]
fn range_on_one_field_is_allowed() {
    let plan = compile(&[
        FilterSpec::new("MONTH", "GTEQ", "3"),
        FilterSpec::new("MONTH", "LT", "7"),
    ])
    .expect("compile");
    assert_eq!(plan.sort_keys(), &[Property::Month, Property::Name]);
}

#[test]
fn unknown_names_and_bad_numbers_are_reported() {
    assert!(matches!(
        compile(&[FilterSpec::new("COLOR", "EQ", "red")]),
        Err(FilterError::InvalidFilter { .. })
    ));
    assert!(matches!(
        compile(&[FilterSpec::new("CITY", "LIKE", "Lon")]),
        Err(FilterError::InvalidFilter { .. })
    ));
    assert_eq!(
        compile(&[FilterSpec::new("MONTH", "EQ", "june")]),
        Err(FilterError::InvalidValue {
            field: Field::Month,
            value: "june".to_string(),
        })
    );
}

#[test]
fn execution_filters_and_orders_by_inequality_then_name() {
    let store = seeded_store();
    let plan = compile(&[FilterSpec::new("MAX_ATTENDEES", "GTEQ", "50")]).expect("compile");
    assert_eq!(
        names(&store.query(&plan)),
        vec!["Alpha Days", "Mid Conf", "Zeta Summit"]
    );
}

#[test]
fn topics_match_when_any_element_matches() {
    let store = seeded_store();
    let plan = compile(&[FilterSpec::new("TOPIC", "EQ", "Web")]).expect("compile");
    assert_eq!(names(&store.query(&plan)), vec!["Mid Conf", "Zeta Summit"]);
}

#[test]
fn not_equal_on_city_orders_by_city() {
    let store = seeded_store();
    let plan = compile(&[FilterSpec::new("CITY", "NE", "London")]).expect("compile");
    assert_eq!(names(&store.query(&plan)), vec!["Beta Fest", "Alpha Days"]);
}

#[test]
fn month_filters_use_the_derived_month() {
    let store = seeded_store();
    let plan = compile(&[FilterSpec::new("MONTH", "EQ", "6")]).expect("compile");
    assert_eq!(names(&store.query(&plan)), vec!["Mid Conf", "Zeta Summit"]);

    let plan = compile(&[FilterSpec::new("MONTH", "LT", "6")]).expect("compile");
    // Beta Fest has month 0.
    assert_eq!(names(&store.query(&plan)), vec!["Beta Fest", "Alpha Days"]);
}

fn field_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("CITY"), Just("TOPIC"), Just("MONTH"), Just("MAX_ATTENDEES")]
}

fn operator_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("EQ"),
        Just("GT"),
        Just("GTEQ"),
        Just("LT"),
        Just("LTEQ"),
        Just("NE")
    ]
}

fn spec_strategy() -> impl Strategy<Value = FilterSpec> {
    (field_strategy(), operator_strategy(), 0u32..20)
        .prop_map(|(field, op, value)| FilterSpec::new(field, op, value.to_string()))
}

proptest! {
    #[test]
    fn compile_accepts_exactly_single_inequality_field(specs in prop::collection::vec(spec_strategy(), 0..8)) {
        let mut inequality_fields: Vec<&str> = Vec::new();
        for spec in &specs {
            if spec.operator != "EQ" && !inequality_fields.contains(&spec.field.as_str()) {
                inequality_fields.push(spec.field.as_str());
            }
        }

        match compile(&specs) {
            Ok(plan) => {
                prop_assert!(inequality_fields.len() <= 1);
                let expected_lead = match inequality_fields.first() {
                    Some(field) => Field::from_wire(field).map(Field::property),
                    None => Some(Property::Name),
                };
                prop_assert_eq!(plan.sort_keys().first().copied(), expected_lead);
                prop_assert_eq!(plan.sort_keys().last().copied(), Some(Property::Name));
                prop_assert_eq!(plan.predicates().len(), specs.len());
            }
            Err(FilterError::MultipleInequalityFields { .. }) => {
                prop_assert!(inequality_fields.len() > 1);
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    #[test]
    fn query_results_are_sorted_and_satisfy_the_plan(threshold in 0u32..600) {
        let store = seeded_store();
        let plan = compile(&[FilterSpec::new("MAX_ATTENDEES", "LTEQ", threshold.to_string())])
            .expect("compile");
        let rows = store.query(&plan);
        for row in &rows {
            prop_assert!(row.max_attendees <= threshold);
        }
        for pair in rows.windows(2) {
            let ordered = (pair[0].max_attendees, &pair[0].name) <= (pair[1].max_attendees, &pair[1].name);
            prop_assert!(ordered);
        }
    }
}
