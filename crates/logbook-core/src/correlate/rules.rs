//! Per-kind classification for the correlation engine.
//!
//! Each correlatable event maps to a subject and one of the two merge
//! shapes. Everything else is independent and never grouped.

use serde::Serialize;
use std::fmt;

use crate::event::{DecodedEvent, EventData};

/// Identity of the thing a group tracks within one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "subject", content = "id", rename_all = "snake_case")]
pub enum SubjectKey {
    /// Incoming fire on the player's side.
    Attack,
    /// One friend's status.
    Friend(String),
    /// One target lock, keyed by the canonical ship id.
    TargetLock(String),
}

impl SubjectKey {
    /// True for the target-lock subject of any ship.
    #[must_use]
    pub const fn is_target_lock(&self) -> bool {
        matches!(self, Self::TargetLock(_))
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attack => f.write_str("attack"),
            Self::Friend(name) => write!(f, "friend:{name}"),
            Self::TargetLock(ship) => write!(f, "target:{ship}"),
        }
    }
}

/// How repeated events for one subject fold together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeShape {
    /// Every new status is appended and becomes the head; exact repeats of
    /// the previous status are discarded.
    Accumulate,
    /// A higher or equal stage replaces the head; lower stages are kept in
    /// history only.
    StageOverwrite,
}

/// What an incoming event means to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rule {
    Accumulate { subject: SubjectKey, status: String },
    Stage { subject: SubjectKey, stage: i64 },
    /// Ends the open target lock, whatever the ship.
    Unlock,
}

impl Rule {
    pub(crate) fn classify(event: &DecodedEvent) -> Option<Self> {
        match event.data() {
            EventData::UnderAttack(ua) => Some(Self::Accumulate {
                subject: SubjectKey::Attack,
                status: ua.target_or_player().to_string(),
            }),
            EventData::Friends(friend) => Some(Self::Accumulate {
                subject: SubjectKey::Friend(friend.name.clone()),
                status: friend.status.clone(),
            }),
            EventData::ShipTargeted(st) if !st.target_locked => Some(Self::Unlock),
            EventData::ShipTargeted(st) => Some(Self::Stage {
                subject: SubjectKey::TargetLock(
                    st.ship
                        .as_ref()
                        .map_or_else(|| "unknown".to_string(), |s| s.id.clone()),
                ),
                stage: st.scan_stage.unwrap_or(0),
            }),
            _ => None,
        }
    }

    pub(crate) const fn shape(&self) -> MergeShape {
        match self {
            Self::Accumulate { .. } => MergeShape::Accumulate,
            Self::Stage { .. } | Self::Unlock => MergeShape::StageOverwrite,
        }
    }
}

/// Stage ordinal of a target-lock member; 0 for anything else.
pub(crate) fn stage_of(event: &DecodedEvent) -> i64 {
    match event.data() {
        EventData::ShipTargeted(st) => st.scan_stage.unwrap_or(0),
        _ => 0,
    }
}
