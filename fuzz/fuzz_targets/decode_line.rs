#![no_main]

use libfuzzer_sys::fuzz_target;
use logbook_core::event::EventData;
use logbook_core::{Decoder, RawRecord};

// Record parsing and line decoding agree on which lines are records. A
// record decodes to exactly one event, and passthrough content always
// re-serializes to the record's payload.
fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    let parsed = RawRecord::parse_line(line);
    let payload = parsed
        .as_ref()
        .ok()
        .map(|record| serde_json::to_string(&record.payload()).expect("payload serializes"));

    let mut decoder = Decoder::builtin();
    let before = decoder.next_sequence_id();
    match decoder.decode_line(line) {
        Ok(event) => {
            assert!(parsed.is_ok(), "decoded a line that is not a record");
            assert_eq!(event.sequence_id(), before);
            assert_eq!(decoder.next_sequence_id(), before + 1);
            if let EventData::Passthrough(p) = event.data() {
                let json = p.to_json().expect("passthrough content re-serializes");
                let _: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
                assert_eq!(Some(json), payload);
            }
            let _ = serde_json::to_string(&event).expect("event serializes");
        }
        Err(_) => {
            assert!(parsed.is_err(), "record rejected by the decoder");
            assert_eq!(decoder.next_sequence_id(), before);
        }
    }

    if let Ok(record) = parsed {
        let mut decoder = Decoder::builtin();
        let event = decoder.decode(record);
        assert_eq!(event.sequence_id(), 0);
    }
});
