//! Sidecar completion against real files in a temporary journal directory.

use logbook_core::completion::{
    CancelToken, CompletionOutcome, FileSidecarReader, Rejection, RetryPolicy, SharedEvent,
    SidecarKind, complete_with_retry,
};
use logbook_core::event::EventData;
use fs2::FileExt;
use logbook_core::registry::Decoder;
use std::fs;
use std::thread;
use std::time::Duration;

const MARKET_EVENT: &str = r#"{"timestamp":"2023-01-01T10:00:00Z","event":"Market","MarketID":128016640,"StationName":"Abraham Lincoln","StarSystem":"Sol"}"#;

fn market_sidecar(timestamp: &str, market_id: i64, buy_price: i64) -> String {
    format!(
        r#"{{"timestamp":"{timestamp}","event":"Market","MarketID":{market_id},"StationName":"Abraham Lincoln","StationType":"Orbis","StarSystem":"Sol","Items":[{{"id":128049152,"Name":"$platinum_name;","Name_Localised":"Platinum","Category":"$MARKET_category_metals;","Category_Localised":"Metals","BuyPrice":{buy_price},"SellPrice":180000,"MeanPrice":170000,"StockBracket":0,"DemandBracket":3,"Stock":0,"Demand":42,"Consumer":true,"Producer":false,"Rare":false}}]}}"#
    )
}

#[test]
fn market_completes_once_sidecar_is_fresh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reader = FileSidecarReader::new(dir.path());
    let mut decoder = Decoder::builtin();
    let mut event = decoder.decode_line(MARKET_EVENT).expect("record");
    assert!(event.needs_completion());

    assert_eq!(
        decoder.complete(&mut event, &reader),
        CompletionOutcome::NotYetAvailable
    );

    fs::write(
        dir.path().join("Market.json"),
        market_sidecar("2023-01-01T09:59:00Z", 128_016_640, 1),
    )
    .expect("write");
    assert_eq!(
        decoder.complete(&mut event, &reader),
        CompletionOutcome::NotYetAvailable
    );
    assert!(event.needs_completion());

    fs::write(
        dir.path().join("Market.json"),
        market_sidecar("2023-01-01T10:00:01Z", 128_016_640, 1),
    )
    .expect("write");
    assert_eq!(
        decoder.complete(&mut event, &reader),
        CompletionOutcome::Completed
    );
    let EventData::Market(market) = event.data() else {
        panic!("expected market");
    };
    let items = &market.items.as_ref().expect("items").entries;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].commodity.id, "platinum");
    assert_eq!(items[0].commodity.text, "Platinum");
    assert_eq!(market.header.station_type.as_deref(), Some("Orbis"));
}

#[test]
fn repeated_completion_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("Market.json"),
        market_sidecar("2023-01-01T10:00:01Z", 128_016_640, 5),
    )
    .expect("write");
    let reader = FileSidecarReader::new(dir.path());
    let mut decoder = Decoder::builtin();
    let mut event = decoder.decode_line(MARKET_EVENT).expect("record");

    assert_eq!(decoder.complete(&mut event, &reader), CompletionOutcome::Completed);
    let first = event.clone();
    assert_eq!(decoder.complete(&mut event, &reader), CompletionOutcome::Completed);
    assert_eq!(event, first);
}

#[test]
fn rescan_replaces_listing_wholesale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Market.json");
    let reader = FileSidecarReader::new(dir.path());
    let mut decoder = Decoder::builtin();
    let mut event = decoder.decode_line(MARKET_EVENT).expect("record");

    fs::write(&path, market_sidecar("2023-01-01T10:00:01Z", 128_016_640, 5)).expect("write");
    decoder.complete(&mut event, &reader);
    fs::write(&path, market_sidecar("2023-01-01T10:00:09Z", 128_016_640, 7)).expect("write");
    assert_eq!(decoder.complete(&mut event, &reader), CompletionOutcome::Completed);

    let EventData::Market(market) = event.data() else {
        panic!("expected market");
    };
    let body = market.items.as_ref().expect("items");
    assert_eq!(body.entries.len(), 1);
    assert_eq!(body.entries[0].buy_price, 7);
}

#[test]
fn other_market_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("Market.json"),
        market_sidecar("2023-01-01T10:00:01Z", 3_228_342_528, 5),
    )
    .expect("write");
    let reader = FileSidecarReader::new(dir.path());
    let mut decoder = Decoder::builtin();
    let mut event = decoder.decode_line(MARKET_EVENT).expect("record");

    let outcome = decoder.complete(&mut event, &reader);
    assert_eq!(
        outcome,
        CompletionOutcome::Rejected {
            rejection: Rejection::IdentityMismatch {
                expected: 128_016_640,
                found: 3_228_342_528
            }
        }
    );
    assert!(outcome.is_retryable());
    assert!(event.needs_completion());
}

#[test]
fn locked_sidecar_is_not_yet_available() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(SidecarKind::Market.file_name());
    fs::write(&path, market_sidecar("2023-01-01T10:00:01Z", 128_016_640, 5)).expect("write");
    let reader = FileSidecarReader::new(dir.path()).with_lock_timeout(Duration::from_millis(30));
    let mut decoder = Decoder::builtin();
    let mut event = decoder.decode_line(MARKET_EVENT).expect("record");

    let writer = fs::OpenOptions::new().write(true).open(&path).expect("open");
    writer.lock_exclusive().expect("lock");
    assert_eq!(
        decoder.complete(&mut event, &reader),
        CompletionOutcome::NotYetAvailable
    );
    FileExt::unlock(&writer).expect("unlock");
    assert_eq!(decoder.complete(&mut event, &reader), CompletionOutcome::Completed);
}

#[test]
fn retry_picks_up_a_late_sidecar() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Market.json");
    let reader = FileSidecarReader::new(dir.path());
    let mut decoder = Decoder::builtin();
    let shared = SharedEvent::new(decoder.decode_line(MARKET_EVENT).expect("record"));

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        fs::write(&path, market_sidecar("2023-01-01T10:00:01Z", 128_016_640, 5))
            .expect("write");
    });

    let outcome = complete_with_retry(
        &shared,
        &reader,
        decoder.tables(),
        RetryPolicy::from_millis(3000, 20),
        &CancelToken::new(),
    );
    producer.join().expect("producer");
    assert_eq!(outcome, CompletionOutcome::Completed);
    assert!(!shared.needs_completion());
}

#[test]
fn cancelled_retry_leaves_event_incomplete() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reader = FileSidecarReader::new(dir.path());
    let mut decoder = Decoder::builtin();
    let shared = SharedEvent::new(decoder.decode_line(MARKET_EVENT).expect("record"));
    let cancel = CancelToken::new();

    let canceller = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            cancel.cancel();
        })
    };
    let outcome = complete_with_retry(
        &shared,
        &reader,
        decoder.tables(),
        RetryPolicy::from_millis(10_000, 20),
        &cancel,
    );
    canceller.join().expect("canceller");
    assert_eq!(outcome, CompletionOutcome::NotYetAvailable);
    assert!(shared.needs_completion());
}

#[test]
fn nav_route_sidecar_feeds_route_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("NavRoute.json"),
        r#"{"timestamp":"2023-01-01T10:00:02Z","event":"NavRoute","Route":[
            {"StarSystem":"Sol","SystemAddress":10477373803,"StarPos":[0.0,0.0,0.0],"StarClass":"G"},
            {"StarSystem":"Alpha Centauri","SystemAddress":1,"StarPos":[3.03,-0.09,3.16],"StarClass":"K"},
            {"StarSystem":"Barnard's Star","SystemAddress":2,"StarPos":[-3.03,1.38,4.94],"StarClass":"M"}
        ]}"#,
    )
    .expect("write");
    let reader = FileSidecarReader::new(dir.path());
    let mut decoder = Decoder::builtin();
    let mut event = decoder
        .decode_line(r#"{"timestamp":"2023-01-01T10:00:00Z","event":"NavRoute"}"#)
        .expect("record");
    assert!(event.needs_completion());
    assert_eq!(decoder.complete(&mut event, &reader), CompletionOutcome::Completed);

    let EventData::NavRoute(route) = event.data() else {
        panic!("expected nav route");
    };
    let summary = route.summary().expect("summary");
    assert_eq!(summary.jumps, 2);
    assert_eq!(summary.destination.as_deref(), Some("Barnard's Star"));
    assert_eq!(summary.scoopable_stars, 2);
}

#[test]
fn non_completable_kind_is_not_applicable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reader = FileSidecarReader::new(dir.path());
    let mut decoder = Decoder::builtin();
    let mut event = decoder
        .decode_line(r#"{"timestamp":"2023-01-01T10:00:00Z","event":"Shutdown"}"#)
        .expect("record");
    assert_eq!(decoder.complete(&mut event, &reader), CompletionOutcome::NotApplicable);
}
