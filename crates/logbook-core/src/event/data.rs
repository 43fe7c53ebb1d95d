//! The unified payload enum and the untyped payloads.
//!
//! Each built-in type decodes into its own struct (see the sibling modules).
//! Extension tags decode into [`GenericData`]. Records that cannot be typed
//! at all keep their original content in [`PassthroughData`].

use serde::Serialize;
use serde_json::{Map, Value};

use super::combat::{BountyData, DiedData, ShipTargetedData, UnderAttackData};
use super::commerce::{MarketData, OutfittingData, ShipyardData};
use super::exploration::{NavRouteData, SaaScanCompleteData, ScanData};
use super::session::{CommanderData, FileheaderData, LoadGameData};
use super::social::{FriendsData, ReceiveTextData};
use super::travel::{
    DockedData, FsdJumpData, FsdTargetData, LocationData, SurfaceData, UndockedData,
};
use crate::completion::Completable;
use crate::record::{FieldError, Fields};

// ---------------------------------------------------------------------------
// EventData
// ---------------------------------------------------------------------------

/// Typed payload of a decoded event. The discriminant mirrors the event
/// kind, which lives on the event itself.
///
/// `EventData` serializes as the inner payload alone; unit variants
/// serialize as `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    Fileheader(FileheaderData),
    Commander(CommanderData),
    LoadGame(LoadGameData),
    Location(LocationData),
    FsdJump(FsdJumpData),
    FsdTarget(FsdTargetData),
    Docked(DockedData),
    Undocked(UndockedData),
    Touchdown(SurfaceData),
    Liftoff(SurfaceData),
    Market(MarketData),
    Outfitting(OutfittingData),
    Shipyard(ShipyardData),
    NavRoute(NavRouteData),
    NavRouteClear,
    Scan(ScanData),
    SaaScanComplete(SaaScanCompleteData),
    ShipTargeted(ShipTargetedData),
    UnderAttack(UnderAttackData),
    Friends(FriendsData),
    Died(DiedData),
    Bounty(BountyData),
    ReceiveText(ReceiveTextData),
    Shutdown,
    /// Known tag without a dedicated struct, or a runtime extension.
    Generic(GenericData),
    /// Unknown, withdrawn or malformed record kept verbatim.
    Passthrough(PassthroughData),
}

impl EventData {
    /// The completion-capable payload, if this is one.
    #[must_use]
    pub fn completable(&self) -> Option<&dyn Completable> {
        match self {
            Self::Market(d) => Some(d),
            Self::Outfitting(d) => Some(d),
            Self::Shipyard(d) => Some(d),
            Self::NavRoute(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn completable_mut(&mut self) -> Option<&mut dyn Completable> {
        match self {
            Self::Market(d) => Some(d),
            Self::Outfitting(d) => Some(d),
            Self::Shipyard(d) => Some(d),
            Self::NavRoute(d) => Some(d),
            _ => None,
        }
    }

    /// Serialize the payload to a [`serde_json::Value`].
    ///
    /// # Errors
    ///
    /// Returns an error if a payload fails to serialize (should not happen
    /// with decoded data).
    pub fn to_json_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Serialize for EventData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Fileheader(d) => d.serialize(serializer),
            Self::Commander(d) => d.serialize(serializer),
            Self::LoadGame(d) => d.serialize(serializer),
            Self::Location(d) => d.serialize(serializer),
            Self::FsdJump(d) => d.serialize(serializer),
            Self::FsdTarget(d) => d.serialize(serializer),
            Self::Docked(d) => d.serialize(serializer),
            Self::Undocked(d) => d.serialize(serializer),
            Self::Touchdown(d) | Self::Liftoff(d) => d.serialize(serializer),
            Self::Market(d) => d.serialize(serializer),
            Self::Outfitting(d) => d.serialize(serializer),
            Self::Shipyard(d) => d.serialize(serializer),
            Self::NavRoute(d) => d.serialize(serializer),
            Self::Scan(d) => d.serialize(serializer),
            Self::SaaScanComplete(d) => d.serialize(serializer),
            Self::ShipTargeted(d) => d.serialize(serializer),
            Self::UnderAttack(d) => d.serialize(serializer),
            Self::Friends(d) => d.serialize(serializer),
            Self::Died(d) => d.serialize(serializer),
            Self::Bounty(d) => d.serialize(serializer),
            Self::ReceiveText(d) => d.serialize(serializer),
            Self::Generic(d) => d.serialize(serializer),
            Self::Passthrough(d) => d.serialize(serializer),
            Self::NavRouteClear | Self::Shutdown => serializer.serialize_unit(),
        }
    }
}

// ---------------------------------------------------------------------------
// GenericData
// ---------------------------------------------------------------------------

/// Payload of a known tag with no dedicated struct: its fields, minus the
/// `event`/`timestamp` envelope, in original order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GenericData {
    pub fields: Map<String, Value>,
}

impl GenericData {
    /// Decoder used for generic built-in tags. Keeps every field.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn decode(f: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            fields: f
                .map()
                .iter()
                .filter(|(key, _)| {
                    key.as_str() != crate::record::TAG_KEY
                        && key.as_str() != crate::record::TIMESTAMP_KEY
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        })
    }

    /// Typed access to the kept fields.
    #[must_use]
    pub const fn fields(&self) -> Fields<'_> {
        Fields::new(&self.fields)
    }
}

// ---------------------------------------------------------------------------
// PassthroughData
// ---------------------------------------------------------------------------

/// Why a record was kept verbatim instead of typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PassthroughReason {
    /// No decoder is registered for the tag.
    Unknown,
    /// The tag is no longer written by the game.
    Withdrawn,
    /// A decoder exists but a mandatory field was unusable.
    Malformed { error: FieldError },
}

/// Original content of a record that could not be typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassthroughData {
    #[serde(flatten)]
    pub reason: PassthroughReason,
    /// Every field except `event` and `timestamp`, in original order.
    pub content: Map<String, Value>,
}

impl PassthroughData {
    /// Re-serialize the preserved content. For a compact input line this
    /// reproduces the original bytes minus the envelope. Numbers keep
    /// their written text (`16.000000`, `1e3`) since `serde_json` is built
    /// with `arbitrary_precision`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (should not happen for
    /// content that was parsed from JSON).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.content)
    }

    /// The decode error, for malformed records.
    #[must_use]
    pub const fn error(&self) -> Option<&FieldError> {
        match &self.reason {
            PassthroughReason::Malformed { error } => Some(error),
            _ => None,
        }
    }
}
