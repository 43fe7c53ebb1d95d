//! `lgb replay`: correlate a journal session by session.

use clap::Args;
use logbook_core::config::ProjectConfig;
use logbook_core::correlate::{EndReason, MergeShape, SubjectKey};
use logbook_core::derived::DerivedValue;
use logbook_core::event::{BaseValueEstimator, ValueEstimator};
use logbook_core::{Correlation, CorrelationGroup, Correlator, DecodedEvent, EventData};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

use crate::cmd::open_journal;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `lgb replay`.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Journal file to replay.
    pub file: PathBuf,
}

/// One correlation group, summarized.
#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub group: u64,
    #[serde(flatten)]
    pub subject: SubjectKey,
    pub shape: MergeShape,
    pub members: usize,
    pub head_sequence_id: u64,
    pub head: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended: Option<EndReason>,
}

impl GroupSummary {
    fn of(group: &CorrelationGroup) -> Self {
        Self {
            group: group.id(),
            subject: group.subject().clone(),
            shape: group.shape(),
            members: group.len(),
            head_sequence_id: group.head().sequence_id(),
            head: group.head().to_string(),
            ended: group.ended(),
        }
    }
}

/// Groups of one session.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub session: String,
    pub events: u64,
    pub groups: Vec<GroupSummary>,
}

impl SessionReport {
    const fn named(session: String) -> Self {
        Self {
            session,
            events: 0,
            groups: Vec::new(),
        }
    }
}

/// Exploration value totals over every scanned body.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ExplorationTotals {
    pub bodies: u64,
    pub mapped: u64,
    pub first_discoveries: u64,
    pub credits: i64,
}

impl ExplorationTotals {
    fn add(&mut self, scan: &DecodedEvent, estimator: &dyn ValueEstimator) {
        let Some(DerivedValue::ScanValue(value)) = scan.derived(estimator) else {
            return;
        };
        self.bodies += 1;
        self.credits += value.credits;
        if value.mapped {
            self.mapped += 1;
        }
        if value.first_discovery {
            self.first_discoveries += 1;
        }
    }
}

/// Report payload for `lgb replay`.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub file: String,
    pub sessions: Vec<SessionReport>,
    pub exploration: ExplorationTotals,
}

/// Walks a decoded stream, cutting sessions at `LoadGame`/`Shutdown`.
///
/// A session's groups are summarized and dropped from the correlator as
/// soon as it ends.
struct Replay {
    correlator: Correlator,
    sessions: Vec<SessionReport>,
    closed: bool,
    scans: Vec<DecodedEvent>,
}

impl Replay {
    fn new() -> Self {
        Self {
            correlator: Correlator::new(),
            sessions: vec![SessionReport::named(session_name(1))],
            closed: false,
            scans: Vec::new(),
        }
    }

    fn current(&self) -> &str {
        self.sessions.last().map_or("", |s| s.session.as_str())
    }

    fn collect_groups(&mut self) {
        let Some(report) = self.sessions.last_mut() else {
            return;
        };
        report.groups = self
            .correlator
            .take_session(&report.session)
            .iter()
            .map(GroupSummary::of)
            .collect();
    }

    fn end_session(&mut self) {
        let name = self.current().to_string();
        self.correlator.reset_session(&name);
        self.collect_groups();
        self.closed = true;
    }

    fn push(&mut self, event: DecodedEvent) {
        let starts_session = matches!(event.data(), EventData::LoadGame(_));
        let ends_session = matches!(event.data(), EventData::Shutdown);

        let seen = self.sessions.last().map_or(0, |s| s.events);
        if starts_session && seen > 0 && !self.closed {
            self.end_session();
        }
        if self.closed {
            let next = session_name(self.sessions.len() + 1);
            self.sessions.push(SessionReport::named(next));
            self.closed = false;
        }
        if let Some(report) = self.sessions.last_mut() {
            report.events += 1;
        }

        // Only the latest scan of a body takes the mapping.
        if let EventData::SaaScanComplete(saa) = event.data() {
            let mapped = self
                .scans
                .iter_mut()
                .rev()
                .find(|scan| scan.is_scan_of(saa))
                .is_some_and(|scan| scan.apply_mapping(saa));
            debug!(body = %saa.body_name, mapped, "surface mapping applied");
        }

        let session = self.current().to_string();
        if let Correlation::Independent(event) = self.correlator.correlate(&session, event) {
            if matches!(event.data(), EventData::Scan(_)) {
                self.scans.push(event);
            }
        }

        if ends_session {
            self.end_session();
        }
    }

    fn report(mut self, file: String) -> ReplayReport {
        if !self.closed {
            self.collect_groups();
        }
        let estimator = BaseValueEstimator;
        let mut exploration = ExplorationTotals::default();
        for scan in &self.scans {
            exploration.add(scan, &estimator);
        }
        let sessions = self
            .sessions
            .into_iter()
            .filter(|s| s.events > 0)
            .collect();
        ReplayReport {
            file,
            sessions,
            exploration,
        }
    }
}

fn session_name(n: usize) -> String {
    format!("session-{n}")
}

/// Execute `lgb replay`.
pub fn run_replay(
    args: &ReplayArgs,
    output: OutputMode,
    project: &ProjectConfig,
) -> anyhow::Result<()> {
    let mut reader = open_journal(&args.file, project, output)?;
    let mut replay = Replay::new();
    for event in reader.by_ref() {
        replay.push(event?);
    }
    let report = replay.report(args.file.display().to_string());

    render_mode(
        output,
        &report,
        |report, w| {
            for session in &report.sessions {
                for group in &session.groups {
                    writeln!(
                        w,
                        "{}  {}  {}  {}  {}",
                        session.session,
                        group.group,
                        group.subject,
                        group.members,
                        ended_label(group.ended)
                    )?;
                }
            }
            let totals = &report.exploration;
            writeln!(
                w,
                "exploration  bodies={}  mapped={}  first_discoveries={}  credits={}",
                totals.bodies, totals.mapped, totals.first_discoveries, totals.credits
            )
        },
        |report, w| {
            for session in &report.sessions {
                pretty_section(
                    w,
                    &format!("{} ({} events)", session.session, session.events),
                )?;
                if session.groups.is_empty() {
                    writeln!(w, "no correlation groups")?;
                }
                for group in &session.groups {
                    writeln!(
                        w,
                        "[{}] {}  members={}  {}",
                        group.group,
                        group.subject,
                        group.members,
                        ended_label(group.ended)
                    )?;
                    writeln!(w, "    head: {}", group.head)?;
                }
                writeln!(w)?;
            }
            pretty_section(w, "Exploration")?;
            let totals = &report.exploration;
            pretty_kv(w, "bodies", totals.bodies.to_string())?;
            pretty_kv(w, "mapped", totals.mapped.to_string())?;
            pretty_kv(w, "first disc.", totals.first_discoveries.to_string())?;
            pretty_kv(w, "credits", totals.credits.to_string())
        },
    )
}

const fn ended_label(ended: Option<EndReason>) -> &'static str {
    match ended {
        None => "open",
        Some(EndReason::SessionEnded) => "session_ended",
        Some(EndReason::Terminated) => "terminated",
        Some(EndReason::Superseded) => "superseded",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logbook_core::Decoder;

    fn replay(lines: &[&str]) -> ReplayReport {
        let mut decoder = Decoder::builtin();
        let mut replay = Replay::new();
        for line in lines {
            replay.push(decoder.decode_line(line).expect("record"));
        }
        replay.report("test".into())
    }

    #[test]
    fn shutdown_and_load_game_cut_sessions() {
        let report = replay(&[
            r#"{"timestamp":"2023-01-01T00:00:00Z","event":"UnderAttack","Target":"You"}"#,
            r#"{"timestamp":"2023-01-01T00:00:01Z","event":"Shutdown"}"#,
            r#"{"timestamp":"2023-01-01T01:00:00Z","event":"UnderAttack","Target":"You"}"#,
            r#"{"timestamp":"2023-01-01T01:00:01Z","event":"LoadGame","Commander":"Jameson","FID":"F1"}"#,
            r#"{"timestamp":"2023-01-01T01:00:02Z","event":"UnderAttack","Target":"You"}"#,
        ]);
        let names: Vec<&str> = report.sessions.iter().map(|s| s.session.as_str()).collect();
        assert_eq!(names, ["session-1", "session-2", "session-3"]);

        let first = &report.sessions[0];
        assert_eq!(first.events, 2);
        assert_eq!(first.groups.len(), 1);
        assert_eq!(first.groups[0].ended, Some(EndReason::SessionEnded));

        assert_eq!(report.sessions[1].groups[0].ended, Some(EndReason::SessionEnded));
        assert_eq!(report.sessions[2].groups[0].ended, None);
    }

    #[test]
    fn leading_load_game_does_not_open_an_empty_session() {
        let report = replay(&[
            r#"{"timestamp":"2023-01-01T01:00:01Z","event":"LoadGame","Commander":"Jameson","FID":"F1"}"#,
            r#"{"timestamp":"2023-01-01T01:00:02Z","event":"UnderAttack","Target":"You"}"#,
        ]);
        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.sessions[0].events, 2);
    }

    #[test]
    fn mapping_raises_scan_value() {
        let scan = r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Scan","BodyName":"A 1","BodyID":1,"SystemAddress":7,"PlanetClass":"Water world","MassEM":0.5,"WasDiscovered":true,"WasMapped":false}"#;
        let saa = r#"{"timestamp":"2023-01-01T00:01:00Z","event":"SAAScanComplete","BodyName":"A 1","BodyID":1,"SystemAddress":7,"ProbesUsed":4,"EfficiencyTarget":6}"#;

        let unmapped = replay(&[scan]).exploration;
        let mapped = replay(&[scan, saa]).exploration;
        assert_eq!(unmapped.bodies, 1);
        assert_eq!(unmapped.mapped, 0);
        assert_eq!(mapped.mapped, 1);
        assert!(mapped.credits > unmapped.credits);
    }

    #[test]
    fn mapping_goes_to_the_latest_scan_of_a_body() {
        let scan = r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Scan","BodyName":"A 1","BodyID":1,"SystemAddress":7,"PlanetClass":"Water world","MassEM":0.5,"WasDiscovered":true,"WasMapped":false}"#;
        let rescan = r#"{"timestamp":"2023-01-01T00:00:30Z","event":"Scan","BodyName":"A 1","BodyID":1,"SystemAddress":7,"PlanetClass":"Water world","MassEM":0.5,"WasDiscovered":true,"WasMapped":false}"#;
        let saa = r#"{"timestamp":"2023-01-01T00:01:00Z","event":"SAAScanComplete","BodyName":"A 1","BodyID":1,"SystemAddress":7,"ProbesUsed":4,"EfficiencyTarget":6}"#;

        let totals = replay(&[scan, rescan, saa, saa]).exploration;
        assert_eq!(totals.bodies, 2);
        assert_eq!(totals.mapped, 1);
    }

    #[test]
    fn ended_sessions_keep_their_groups() {
        let report = replay(&[
            r#"{"timestamp":"2023-01-01T00:00:00Z","event":"UnderAttack","Target":"You"}"#,
            r#"{"timestamp":"2023-01-01T00:00:01Z","event":"Shutdown"}"#,
        ]);
        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.sessions[0].groups.len(), 1);
        assert_eq!(report.sessions[0].groups[0].ended, Some(EndReason::SessionEnded));
    }
}
