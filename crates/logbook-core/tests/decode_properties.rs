//! Property tests for the decoder: totality, passthrough preservation and
//! sequence ordering.

use logbook_core::event::{EventData, EventKind, EventType, PassthroughReason};
use logbook_core::record::RawRecord;
use logbook_core::registry::Decoder;
use proptest::prelude::*;
use serde_json::{Map, Value};

use generators::*;

#[test]
fn minimal_record_of_every_builtin_tag_decodes_typed() {
    let mut decoder = Decoder::builtin();
    for et in EventType::ALL {
        let line = line(et.as_str(), "2023-01-01T00:00:00Z", &mandatory_fields(et));
        let event = decoder.decode_line(&line).expect("record");
        assert_eq!(event.kind(), &EventKind::Known(et), "{et}");
        assert!(!event.is_passthrough(), "{et} fell back to passthrough");
    }
}

#[test]
fn empty_record_of_every_builtin_tag_never_panics() {
    let mut decoder = Decoder::builtin();
    for et in EventType::ALL {
        let line = line(et.as_str(), "2023-01-01T00:00:00Z", &Map::new());
        let event = decoder.decode_line(&line).expect("record");
        assert_eq!(event.tag(), et.as_str());
        if event.is_passthrough() {
            let EventData::Passthrough(p) = event.data() else {
                panic!("passthrough without passthrough data");
            };
            assert!(matches!(p.reason, PassthroughReason::Malformed { .. }));
            assert_eq!(event.kind(), &EventKind::Unknown(et.as_str().to_string()));
        }
    }
}

fn passthrough_body(line: &str) -> String {
    let mut decoder = Decoder::builtin();
    let event = decoder.decode_line(line).expect("record");
    let EventData::Passthrough(p) = event.data() else {
        panic!("expected passthrough for {line}");
    };
    p.to_json().expect("serialize")
}

#[test]
fn unknown_tag_keeps_number_text_verbatim() {
    let body = passthrough_body(
        r#"{"timestamp":"2023-01-01T10:00:00Z","event":"FuelScoopX","Scooped":0.498700,"Total":16.000000,"Big":1e3,"Name":"café"}"#,
    );
    assert_eq!(body, r#"{"Scooped":0.498700,"Total":16.000000,"Big":1e3,"Name":"café"}"#);
}

#[test]
fn unknown_tag_keeps_exponents_and_wide_integers() {
    let body = passthrough_body(
        r#"{"timestamp":"2023-01-01T10:00:00Z","event":"CarrierLedger","Balance":-2.50E+10,"Tiny":1.0e-7,"CarrierID":18446744073709551616,"Owner":"Jürgen 星"}"#,
    );
    assert_eq!(
        body,
        r#"{"Balance":-2.50E+10,"Tiny":1.0e-7,"CarrierID":18446744073709551616,"Owner":"Jürgen 星"}"#
    );
}

#[test]
fn malformed_record_keeps_number_text_verbatim() {
    // Docked requires StationName.
    let body = passthrough_body(
        r#"{"timestamp":"2023-01-01T10:00:00Z","event":"Docked","Dist":12.500000,"StarSystem":"Ñandú"}"#,
    );
    assert_eq!(body, r#"{"Dist":12.500000,"StarSystem":"Ñandú"}"#);
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn builtin_decode_is_total(
        et in arb_event_type(),
        ts in arb_timestamp(),
        extra in arb_extra_fields(),
    ) {
        let mut fields = mandatory_fields(et);
        for (key, value) in extra {
            fields.insert(key, value);
        }
        let mut decoder = Decoder::builtin();
        let event = decoder.decode_line(&line(et.as_str(), &ts, &fields));
        prop_assert!(event.is_ok());
        let event = event.expect("checked");
        prop_assert_eq!(event.tag(), et.as_str());
        prop_assert_eq!(event.sequence_id(), 0);
    }

    #[test]
    fn unknown_tag_content_round_trips(
        tag in arb_unregistered_tag(),
        ts in arb_timestamp(),
        extra in arb_extra_fields(),
    ) {
        let fields: Map<String, Value> = extra.into_iter().collect();
        let mut decoder = Decoder::builtin();
        let event = decoder.decode_line(&line(&tag, &ts, &fields)).expect("record");
        prop_assert_eq!(event.kind(), &EventKind::Unknown(tag.clone()));
        let EventData::Passthrough(p) = event.data() else {
            return Err(TestCaseError::fail("expected passthrough"));
        };
        prop_assert_eq!(&p.reason, &PassthroughReason::Unknown);
        let expected = Value::Object(fields).to_string();
        prop_assert_eq!(p.to_json().expect("serialize"), expected);
    }

    #[test]
    fn sequence_ids_follow_input_order(tags in prop::collection::vec(arb_event_type(), 1..32)) {
        let mut decoder = Decoder::builtin();
        let ids: Vec<u64> = tags
            .iter()
            .map(|et| {
                let line = line(et.as_str(), "2023-01-01T00:00:00Z", &mandatory_fields(*et));
                decoder.decode_line(&line).expect("record").sequence_id()
            })
            .collect();
        let expected: Vec<u64> = (0..tags.len() as u64).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn arbitrary_objects_never_panic(extra in arb_extra_fields(), tag in "[A-Za-z]{1,20}") {
        let fields: Map<String, Value> = extra.into_iter().collect();
        let record = RawRecord::parse_line(&line(&tag, "2023-01-01T00:00:00Z", &fields))
            .expect("record");
        let mut decoder = Decoder::builtin();
        let event = decoder.decode(record);
        prop_assert_eq!(event.tag(), tag.as_str());
    }
}
