//! Decoded journal events.
//!
//! A [`DecodedEvent`] is the owned result of decoding one journal record. Its
//! kind and sequence id are fixed at construction. The only in-place changes
//! an event ever sees are sidecar completion (which replaces a listing body
//! wholesale) and surface-mapping updates on scans, both of which go through
//! the payload's own methods so derived values are invalidated with them.

pub mod combat;
pub mod commerce;
pub mod data;
pub mod exploration;
pub mod session;
pub mod social;
pub mod travel;
pub mod types;

pub use data::{EventData, GenericData, PassthroughData, PassthroughReason};
pub use exploration::{
    BaseValueEstimator, EstimatedValue, RouteSummary, SaaScanCompleteData, ScanData,
    ScanValueInputs, ValueEstimator,
};
pub use types::{EventKind, EventType, UnknownEventType};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::completion::Completable;
use crate::derived::DerivedValue;
use crate::record::RawRecord;

/// One decoded journal event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedEvent {
    event_time_utc: DateTime<Utc>,
    kind: EventKind,
    sequence_id: u64,
    data: EventData,
    /// The record this event was decoded from. Kept only for
    /// completion-capable kinds, and only when enabled. The event owns it:
    /// the decoder keeps no handle, clones of the event share it, and it is
    /// freed with the last clone or by [`DecodedEvent::release_source`].
    #[serde(skip)]
    source: Option<Arc<RawRecord>>,
}

impl DecodedEvent {
    pub(crate) const fn new(
        event_time_utc: DateTime<Utc>,
        kind: EventKind,
        sequence_id: u64,
        data: EventData,
        source: Option<Arc<RawRecord>>,
    ) -> Self {
        Self {
            event_time_utc,
            kind,
            sequence_id,
            data,
            source,
        }
    }

    /// Record timestamp, or the Unix epoch when the record had none.
    #[must_use]
    pub const fn event_time_utc(&self) -> DateTime<Utc> {
        self.event_time_utc
    }

    /// What the record resolved to.
    #[must_use]
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Stream-local, strictly increasing decode order.
    #[must_use]
    pub const fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    /// The payload.
    #[must_use]
    pub const fn data(&self) -> &EventData {
        &self.data
    }

    /// The retained source record, if any.
    #[must_use]
    pub fn source(&self) -> Option<&RawRecord> {
        self.source.as_deref()
    }

    /// Detach the retained source record, e.g. once completion is settled.
    pub fn release_source(&mut self) -> Option<Arc<RawRecord>> {
        self.source.take()
    }

    /// The journal tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        self.kind.tag()
    }

    /// True for unknown, withdrawn and malformed records.
    #[must_use]
    pub const fn is_passthrough(&self) -> bool {
        matches!(self.data, EventData::Passthrough(_))
    }

    /// True while a completion-capable event still lacks its body.
    #[must_use]
    pub fn needs_completion(&self) -> bool {
        self.data
            .completable()
            .is_some_and(Completable::needs_completion)
    }

    pub(crate) fn completable_mut(&mut self) -> Option<&mut dyn Completable> {
        self.data.completable_mut()
    }

    /// Whether this event is a `Scan` of the body `saa` mapped.
    #[must_use]
    pub fn is_scan_of(&self, saa: &SaaScanCompleteData) -> bool {
        matches!(&self.data, EventData::Scan(scan) if same_body(scan, saa))
    }

    /// Apply a `SAAScanComplete` to this event if it is the scan of the
    /// same body. Returns `true` when the scan's value inputs changed.
    pub fn apply_mapping(&mut self, saa: &SaaScanCompleteData) -> bool {
        match &mut self.data {
            EventData::Scan(scan) if same_body(scan, saa) => {
                scan.mark_mapped(saa.is_efficient())
            }
            _ => false,
        }
    }

    /// The derived value of this event, computed on first call.
    ///
    /// `None` for kinds without one and for a route that is not known yet.
    pub fn derived(&self, estimator: &dyn ValueEstimator) -> Option<DerivedValue<'_>> {
        match &self.data {
            EventData::Scan(scan) => Some(DerivedValue::ScanValue(scan.estimated_value(estimator))),
            EventData::NavRoute(route) => route.summary().map(DerivedValue::Route),
            _ => None,
        }
    }
}

fn same_body(scan: &ScanData, saa: &SaaScanCompleteData) -> bool {
    match (scan.system_address, saa.system_address, scan.body_id, saa.body_id) {
        (Some(a), Some(b), Some(x), Some(y)) => a == b && x == y,
        _ => scan.body_name == saa.body_name,
    }
}

impl fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {}",
            self.sequence_id,
            self.event_time_utc.format("%Y-%m-%dT%H:%M:%SZ"),
            self.kind
        )?;
        let error = match &self.data {
            EventData::Passthrough(p) => p.error(),
            _ => None,
        };
        if let Some(error) = error {
            write!(f, " [{error}]")?;
        }
        if self.needs_completion() {
            f.write_str(" (incomplete)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Decoder;

    fn decode(line: &str) -> DecodedEvent {
        Decoder::builtin().decode_line(line).expect("record")
    }

    #[test]
    fn display_summarizes() {
        let e = decode(r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Market","MarketID":1}"#);
        assert_eq!(e.to_string(), "#0 2023-01-01T00:00:00Z Market (incomplete)");
        let e = decode(r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Docked"}"#);
        assert_eq!(
            e.to_string(),
            "#0 2023-01-01T00:00:00Z Docked (unknown) [mandatory field `StationName` is missing]"
        );
    }

    #[test]
    fn mapping_applies_only_to_same_body() {
        let mut scan = decode(
            r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Scan","BodyName":"Sol 3","BodyID":3,"SystemAddress":10477373803,"PlanetClass":"Earthlike body","MassEM":1.0}"#,
        );
        let other = SaaScanCompleteData {
            body_name: "Sol 4".into(),
            body_id: Some(4),
            system_address: Some(10_477_373_803),
            probes_used: 5,
            efficiency_target: 6,
        };
        assert!(!scan.is_scan_of(&other));
        assert!(!scan.apply_mapping(&other));
        let same = SaaScanCompleteData {
            body_id: Some(3),
            body_name: "Sol 3".into(),
            ..other
        };
        let before = scan.derived(&BaseValueEstimator).map(|d| match d {
            DerivedValue::ScanValue(v) => v.credits,
            DerivedValue::Route(_) => 0,
        });
        assert!(scan.is_scan_of(&same));
        assert!(scan.apply_mapping(&same));
        let after = scan.derived(&BaseValueEstimator).map(|d| match d {
            DerivedValue::ScanValue(v) => v.credits,
            DerivedValue::Route(_) => 0,
        });
        assert!(after > before);
    }

    #[test]
    fn source_retained_for_completion_capable_only() {
        let market = decode(r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Market","MarketID":1}"#);
        assert!(market.source().is_some());
        let docked = decode(
            r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Docked","StationName":"X"}"#,
        );
        assert!(docked.source().is_none());
    }

    #[test]
    fn released_source_leaves_clones_their_share() {
        let mut market =
            decode(r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Market","MarketID":1}"#);
        let copy = market.clone();
        let record = market.release_source().expect("retained");
        assert!(market.source().is_none());
        assert_eq!(Arc::strong_count(&record), 2);
        drop(copy);
        assert_eq!(Arc::strong_count(&record), 1);
        assert!(market.release_source().is_none());
    }

    #[test]
    fn serializes_without_source() {
        let e = decode(r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Shutdown"}"#);
        let json = serde_json::to_value(&e).expect("serialize");
        assert_eq!(json["kind"]["tag"], "Shutdown");
        assert_eq!(json["sequence_id"], 0);
        assert!(json.get("source").is_none());
    }
}
