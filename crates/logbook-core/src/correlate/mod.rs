//! Session-scoped correlation of repeated events.
//!
//! A [`CorrelationGroup`] owns every event folded into it. Its head is the
//! current authoritative state and its history is the ordered list of all
//! retained members, head included. Groups end on a session reset or on a
//! terminating event for their subject; ended groups stay queryable but
//! are never extended again.
//!
//! The [`Correlator`] keeps one group table per session id. It is not
//! meant to be shared between threads: each session's table belongs to a
//! single worker.

pub mod rules;

pub use rules::{MergeShape, SubjectKey};

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::event::DecodedEvent;
use rules::{Rule, stage_of};

/// Why a group stopped accepting members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The caller reset the session.
    SessionEnded,
    /// A terminating event arrived (target lost).
    Terminated,
    /// A different subject of the same exclusive family took over (a new
    /// target was locked).
    Superseded,
}

/// What a call to [`Correlator::correlate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// A new group was opened with this event as its head.
    Started,
    /// Appended to history and made the head.
    Appended,
    /// Same status as the previous member; discarded.
    Duplicate,
    /// A stage at or above the head's; appended and made the head.
    Advanced,
    /// A stage below the head's; appended to history, head unchanged.
    Retained,
    /// Appended as the terminating member; the group is now ended.
    Terminated,
}

/// Result of correlating one event.
#[derive(Debug)]
pub enum Correlation<'a> {
    /// The event joined (or was folded into) a group.
    Grouped {
        group: &'a CorrelationGroup,
        effect: Effect,
    },
    /// The event is not correlatable and is handed back.
    Independent(DecodedEvent),
}

impl Correlation<'_> {
    /// The effect, for grouped events.
    #[must_use]
    pub const fn effect(&self) -> Option<Effect> {
        match self {
            Self::Grouped { effect, .. } => Some(*effect),
            Self::Independent(_) => None,
        }
    }
}

/// Same-subject events folded together within one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationGroup {
    id: u64,
    subject: SubjectKey,
    shape: MergeShape,
    members: Vec<DecodedEvent>,
    head: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    ended: Option<EndReason>,
    #[serde(skip)]
    last_status: Option<String>,
}

impl CorrelationGroup {
    fn start(id: u64, subject: SubjectKey, shape: MergeShape, event: DecodedEvent) -> Self {
        Self {
            id,
            subject,
            shape,
            members: vec![event],
            head: 0,
            ended: None,
            last_status: None,
        }
    }

    /// Session-local group id, in creation order.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// What this group tracks.
    #[must_use]
    pub const fn subject(&self) -> &SubjectKey {
        &self.subject
    }

    /// How members fold.
    #[must_use]
    pub const fn shape(&self) -> MergeShape {
        self.shape
    }

    /// The current authoritative state.
    #[must_use]
    pub fn head(&self) -> &DecodedEvent {
        &self.members[self.head]
    }

    /// Every retained member in arrival order, head included.
    #[must_use]
    pub fn history(&self) -> &[DecodedEvent] {
        &self.members
    }

    /// Number of retained members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; a group is created with its first member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Why the group ended, or `None` while it is open.
    #[must_use]
    pub const fn ended(&self) -> Option<EndReason> {
        self.ended
    }

    /// True once the group can no longer be extended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended.is_some()
    }

    fn accumulate(&mut self, event: DecodedEvent, status: String) -> Effect {
        if self.last_status.as_deref() == Some(status.as_str()) {
            return Effect::Duplicate;
        }
        self.members.push(event);
        self.head = self.members.len() - 1;
        self.last_status = Some(status);
        Effect::Appended
    }

    fn stage(&mut self, event: DecodedEvent, stage: i64) -> Effect {
        let advances = stage >= stage_of(self.head());
        self.members.push(event);
        if advances {
            self.head = self.members.len() - 1;
            Effect::Advanced
        } else {
            Effect::Retained
        }
    }

    fn terminate(&mut self, event: DecodedEvent) -> Effect {
        self.members.push(event);
        self.ended = Some(EndReason::Terminated);
        Effect::Terminated
    }
}

/// Group table of one session.
#[derive(Debug, Default)]
struct SessionGroups {
    groups: Vec<CorrelationGroup>,
    open: HashMap<SubjectKey, usize>,
}

impl SessionGroups {
    fn end(&mut self, subject: &SubjectKey, reason: EndReason) {
        if let Some(index) = self.open.remove(subject) {
            self.groups[index].ended = Some(reason);
        }
    }

    fn open_target_lock(&self) -> Option<SubjectKey> {
        self.open.keys().find(|s| s.is_target_lock()).cloned()
    }

    fn start(&mut self, subject: SubjectKey, shape: MergeShape, event: DecodedEvent) -> usize {
        let index = self.groups.len();
        self.groups.push(CorrelationGroup::start(
            index as u64,
            subject.clone(),
            shape,
            event,
        ));
        self.open.insert(subject, index);
        index
    }
}

/// Per-session correlation engine.
#[derive(Debug, Default)]
pub struct Correlator {
    sessions: HashMap<String, SessionGroups>,
}

impl Correlator {
    /// An engine with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `event` into the matching group of `session`.
    ///
    /// Events of kinds that are never grouped come back as
    /// [`Correlation::Independent`]. So does a target-lost event with no
    /// open lock to end.
    pub fn correlate(&mut self, session: &str, event: DecodedEvent) -> Correlation<'_> {
        let Some(rule) = Rule::classify(&event) else {
            return Correlation::Independent(event);
        };
        let shape = rule.shape();
        let table = self.sessions.entry(session.to_string()).or_default();

        let (index, effect) = match rule {
            Rule::Unlock => {
                let Some(subject) = table.open_target_lock() else {
                    return Correlation::Independent(event);
                };
                let Some(index) = table.open.remove(&subject) else {
                    return Correlation::Independent(event);
                };
                (index, table.groups[index].terminate(event))
            }
            Rule::Stage { subject, stage } => {
                if let Some(current) = table.open_target_lock() {
                    if current != subject {
                        table.end(&current, EndReason::Superseded);
                    }
                }
                match table.open.get(&subject).copied() {
                    Some(index) => (index, table.groups[index].stage(event, stage)),
                    None => (table.start(subject, shape, event), Effect::Started),
                }
            }
            Rule::Accumulate { subject, status } => match table.open.get(&subject).copied() {
                Some(index) => (index, table.groups[index].accumulate(event, status)),
                None => {
                    let index = table.start(subject, shape, event);
                    table.groups[index].last_status = Some(status);
                    (index, Effect::Started)
                }
            },
        };

        let group = &table.groups[index];
        debug!(
            session,
            subject = %group.subject,
            ?effect,
            members = group.len(),
            "correlated"
        );
        Correlation::Grouped { group, effect }
    }

    /// End every open group of `session`. Later events start new groups.
    pub fn reset_session(&mut self, session: &str) {
        if let Some(table) = self.sessions.get_mut(session) {
            let open: Vec<SubjectKey> = table.open.keys().cloned().collect();
            for subject in &open {
                table.end(subject, EndReason::SessionEnded);
            }
            debug!(session, ended = open.len(), "session reset");
        }
    }

    /// Forget `session`, handing back its groups in creation order. Open
    /// groups stay open; call [`Correlator::reset_session`] first to end
    /// them.
    pub fn take_session(&mut self, session: &str) -> Vec<CorrelationGroup> {
        let groups = self
            .sessions
            .remove(session)
            .map(|table| table.groups)
            .unwrap_or_default();
        debug!(session, groups = groups.len(), "session dropped");
        groups
    }

    /// Every group of `session`, open or ended, in creation order.
    pub fn groups(&self, session: &str) -> impl Iterator<Item = &CorrelationGroup> {
        self.sessions
            .get(session)
            .into_iter()
            .flat_map(|table| table.groups.iter())
    }

    /// The open group for `subject` in `session`.
    #[must_use]
    pub fn open_group(&self, session: &str, subject: &SubjectKey) -> Option<&CorrelationGroup> {
        let table = self.sessions.get(session)?;
        table.open.get(subject).map(|&index| &table.groups[index])
    }

    /// Known session ids, sorted.
    #[must_use]
    pub fn sessions(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sessions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventData;
    use crate::registry::Decoder;

    fn attack(decoder: &mut Decoder, target: &str) -> DecodedEvent {
        decoder
            .decode_line(&format!(
                r#"{{"timestamp":"2023-01-01T00:00:00Z","event":"UnderAttack","Target":"{target}"}}"#
            ))
            .expect("record")
    }

    fn targeted(decoder: &mut Decoder, ship: &str, stage: i64) -> DecodedEvent {
        decoder
            .decode_line(&format!(
                r#"{{"timestamp":"2023-01-01T00:00:00Z","event":"ShipTargeted","TargetLocked":true,"Ship":"{ship}","ScanStage":{stage}}}"#
            ))
            .expect("record")
    }

    fn target_of(event: &DecodedEvent) -> &str {
        match event.data() {
            EventData::UnderAttack(ua) => ua.target_or_player(),
            _ => "",
        }
    }

    #[test]
    fn accumulate_dedups_consecutive_repeats() {
        let mut decoder = Decoder::builtin();
        let mut correlator = Correlator::new();
        let effects: Vec<Option<Effect>> = ["Fighter", "Fighter", "Mothership"]
            .into_iter()
            .map(|t| {
                let e = attack(&mut decoder, t);
                correlator.correlate("s1", e).effect()
            })
            .collect();
        assert_eq!(
            effects,
            [
                Some(Effect::Started),
                Some(Effect::Duplicate),
                Some(Effect::Appended)
            ]
        );
        let group = correlator
            .open_group("s1", &SubjectKey::Attack)
            .expect("group");
        let history: Vec<&str> = group.history().iter().map(target_of).collect();
        assert_eq!(history, ["Fighter", "Mothership"]);
        assert_eq!(target_of(group.head()), "Mothership");
    }

    #[test]
    fn non_consecutive_repeat_is_kept() {
        let mut decoder = Decoder::builtin();
        let mut correlator = Correlator::new();
        for t in ["You", "Fighter", "You"] {
            let e = attack(&mut decoder, t);
            correlator.correlate("s1", e);
        }
        let group = correlator.groups("s1").next().expect("group");
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn stage_overwrite_keeps_highest_head() {
        let mut decoder = Decoder::builtin();
        let mut correlator = Correlator::new();
        let mut effects = Vec::new();
        for stage in [0, 1, 3, 2] {
            let e = targeted(&mut decoder, "python", stage);
            effects.push(correlator.correlate("s1", e).effect());
        }
        assert_eq!(
            effects,
            [
                Some(Effect::Started),
                Some(Effect::Advanced),
                Some(Effect::Advanced),
                Some(Effect::Retained)
            ]
        );
        let group = correlator
            .open_group("s1", &SubjectKey::TargetLock("python".into()))
            .expect("group");
        assert_eq!(stage_of(group.head()), 3);
        let stages: Vec<i64> = group.history().iter().map(stage_of).collect();
        assert_eq!(stages, [0, 1, 3, 2]);
    }

    #[test]
    fn new_ship_supersedes_and_unlock_terminates() {
        let mut decoder = Decoder::builtin();
        let mut correlator = Correlator::new();
        let e = targeted(&mut decoder, "python", 0);
        correlator.correlate("s1", e);
        let e = targeted(&mut decoder, "vulture", 0);
        correlator.correlate("s1", e);
        let lost = decoder
            .decode_line(r#"{"timestamp":"2023-01-01T00:00:00Z","event":"ShipTargeted","TargetLocked":false}"#)
            .expect("record");
        assert_eq!(
            correlator.correlate("s1", lost).effect(),
            Some(Effect::Terminated)
        );

        let ended: Vec<Option<EndReason>> =
            correlator.groups("s1").map(CorrelationGroup::ended).collect();
        assert_eq!(
            ended,
            [Some(EndReason::Superseded), Some(EndReason::Terminated)]
        );

        let lost_again = decoder
            .decode_line(r#"{"timestamp":"2023-01-01T00:00:00Z","event":"ShipTargeted","TargetLocked":false}"#)
            .expect("record");
        assert!(matches!(
            correlator.correlate("s1", lost_again),
            Correlation::Independent(_)
        ));
    }

    #[test]
    fn reset_ends_groups_and_starts_fresh() {
        let mut decoder = Decoder::builtin();
        let mut correlator = Correlator::new();
        let e = attack(&mut decoder, "You");
        correlator.correlate("s1", e);
        correlator.reset_session("s1");
        assert!(correlator.open_group("s1", &SubjectKey::Attack).is_none());

        let e = attack(&mut decoder, "You");
        assert_eq!(
            correlator.correlate("s1", e).effect(),
            Some(Effect::Started)
        );
        let ended: Vec<bool> = correlator.groups("s1").map(CorrelationGroup::is_ended).collect();
        assert_eq!(ended, [true, false]);
    }

    #[test]
    fn sessions_are_isolated() {
        let mut decoder = Decoder::builtin();
        let mut correlator = Correlator::new();
        let e = attack(&mut decoder, "You");
        correlator.correlate("a", e);
        let e = attack(&mut decoder, "You");
        assert_eq!(
            correlator.correlate("b", e).effect(),
            Some(Effect::Started)
        );
        assert_eq!(correlator.sessions(), ["a", "b"]);
    }

    #[test]
    fn independent_events_are_handed_back() {
        let mut decoder = Decoder::builtin();
        let mut correlator = Correlator::new();
        let e = decoder
            .decode_line(r#"{"timestamp":"2023-01-01T00:00:00Z","event":"Shutdown"}"#)
            .expect("record");
        let Correlation::Independent(back) = correlator.correlate("s1", e) else {
            panic!("expected independent");
        };
        assert_eq!(back.sequence_id(), 0);
        assert!(correlator.sessions().is_empty());
    }

    #[test]
    fn taken_session_is_forgotten() {
        let mut decoder = Decoder::builtin();
        let mut correlator = Correlator::new();
        for (session, target) in [("a", "You"), ("a", "Fighter"), ("b", "You")] {
            let e = attack(&mut decoder, target);
            correlator.correlate(session, e);
        }
        correlator.reset_session("a");
        let groups = correlator.take_session("a");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0].ended(), Some(EndReason::SessionEnded));
        assert_eq!(correlator.sessions(), ["b"]);
        assert_eq!(correlator.groups("a").count(), 0);
        assert!(correlator.take_session("a").is_empty());

        let e = attack(&mut decoder, "You");
        assert_eq!(
            correlator.correlate("a", e).effect(),
            Some(Effect::Started)
        );
    }
}
