//! Built-in event type catalog and the resolved event kind.
//!
//! [`EventType`] enumerates the tags this build decodes into typed payloads.
//! The string form is the journal `event` tag, compared case-sensitively.
//! [`EventKind`] is what a decoded event actually resolved to: a built-in
//! type, a runtime extension, or one of the passthrough outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Journal tags with a built-in decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    /// First record of every journal file.
    Fileheader,
    /// Commander name, written at game start.
    Commander,
    /// Ship, credits and mode on game load.
    LoadGame,
    /// Current position on game load or respawn.
    Location,
    /// Arrival in a new system.
    FsdJump,
    /// Next-jump target selected.
    FsdTarget,
    /// Docked at a station.
    Docked,
    /// Left a station.
    Undocked,
    /// Landed on a planet surface.
    Touchdown,
    /// Lifted off from a planet surface.
    Liftoff,
    /// Commodity market opened; items in `Market.json`.
    Market,
    /// Outfitting opened; modules in `Outfitting.json`.
    Outfitting,
    /// Shipyard opened; ships in `Shipyard.json`.
    Shipyard,
    /// Route plotted; route in `NavRoute.json`.
    NavRoute,
    /// Plotted route cleared.
    NavRouteClear,
    /// Body scanned.
    Scan,
    /// Surface mapping finished.
    SaaScanComplete,
    /// Target lock and scan progress.
    ShipTargeted,
    /// Player or fighter under fire.
    UnderAttack,
    /// Friend status changed.
    Friends,
    /// Player ship destroyed.
    Died,
    /// Bounty voucher awarded.
    Bounty,
    /// Chat or NPC message received.
    ReceiveText,
    /// Game exited.
    Shutdown,
    /// Soundtrack change.
    Music,
    /// Mining reservoir topped up.
    ReservoirReplenished,
    /// Signal source found by the full spectrum scanner.
    FssSignalDiscovered,
}

/// Error returned when parsing a tag outside the built-in catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    /// The unrecognised tag.
    pub raw: String,
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a built-in journal event tag", self.raw)
    }
}

impl std::error::Error for UnknownEventType {}

impl EventType {
    /// All built-in types in catalog order.
    pub const ALL: [Self; 27] = [
        Self::Fileheader,
        Self::Commander,
        Self::LoadGame,
        Self::Location,
        Self::FsdJump,
        Self::FsdTarget,
        Self::Docked,
        Self::Undocked,
        Self::Touchdown,
        Self::Liftoff,
        Self::Market,
        Self::Outfitting,
        Self::Shipyard,
        Self::NavRoute,
        Self::NavRouteClear,
        Self::Scan,
        Self::SaaScanComplete,
        Self::ShipTargeted,
        Self::UnderAttack,
        Self::Friends,
        Self::Died,
        Self::Bounty,
        Self::ReceiveText,
        Self::Shutdown,
        Self::Music,
        Self::ReservoirReplenished,
        Self::FssSignalDiscovered,
    ];

    /// The journal tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fileheader => "Fileheader",
            Self::Commander => "Commander",
            Self::LoadGame => "LoadGame",
            Self::Location => "Location",
            Self::FsdJump => "FSDJump",
            Self::FsdTarget => "FSDTarget",
            Self::Docked => "Docked",
            Self::Undocked => "Undocked",
            Self::Touchdown => "Touchdown",
            Self::Liftoff => "Liftoff",
            Self::Market => "Market",
            Self::Outfitting => "Outfitting",
            Self::Shipyard => "Shipyard",
            Self::NavRoute => "NavRoute",
            Self::NavRouteClear => "NavRouteClear",
            Self::Scan => "Scan",
            Self::SaaScanComplete => "SAAScanComplete",
            Self::ShipTargeted => "ShipTargeted",
            Self::UnderAttack => "UnderAttack",
            Self::Friends => "Friends",
            Self::Died => "Died",
            Self::Bounty => "Bounty",
            Self::ReceiveText => "ReceiveText",
            Self::Shutdown => "Shutdown",
            Self::Music => "Music",
            Self::ReservoirReplenished => "ReservoirReplenished",
            Self::FssSignalDiscovered => "FSSSignalDiscovered",
        }
    }

    /// True for types whose body may arrive later in a sidecar file.
    #[must_use]
    pub const fn is_completion_capable(self) -> bool {
        matches!(
            self,
            Self::Market | Self::Outfitting | Self::Shipyard | Self::NavRoute
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|et| et.as_str() == s)
            .ok_or_else(|| UnknownEventType { raw: s.to_string() })
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// What a record resolved to. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "status", content = "tag", rename_all = "snake_case")]
pub enum EventKind {
    /// A built-in type.
    Known(EventType),
    /// A tag registered at runtime outside the built-in catalog.
    Extension(String),
    /// A tag the game no longer writes; content kept verbatim.
    Withdrawn(String),
    /// An unregistered tag, or a registered one whose mandatory fields were
    /// missing; content kept verbatim.
    Unknown(String),
}

impl EventKind {
    /// The journal tag this kind came from.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Known(et) => et.as_str(),
            Self::Extension(tag) | Self::Withdrawn(tag) | Self::Unknown(tag) => tag,
        }
    }

    /// The built-in type, if any.
    #[must_use]
    pub const fn event_type(&self) -> Option<EventType> {
        match self {
            Self::Known(et) => Some(*et),
            _ => None,
        }
    }

    /// True when the event carries its original content instead of a typed
    /// payload.
    #[must_use]
    pub const fn is_passthrough(&self) -> bool {
        matches!(self, Self::Withdrawn(_) | Self::Unknown(_))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(et) => write!(f, "{et}"),
            Self::Extension(tag) => write!(f, "{tag}"),
            Self::Withdrawn(tag) => write!(f, "{tag} (withdrawn)"),
            Self::Unknown(tag) => write!(f, "{tag} (unknown)"),
        }
    }
}
