//! Tag registry and the record decoder.
//!
//! The [`Registry`] maps journal tags to decoders. It is filled once at
//! startup; every insertion goes through the same duplicate check, and a
//! duplicate is a [`RegistryError`] the caller is expected to treat as
//! fatal before any record is read.
//!
//! The [`Decoder`] owns a registry, the name tables and the sequence
//! counter. Every record yields exactly one [`DecodedEvent`]:
//!
//! | Lookup | Decode | Result |
//! |--------|--------|--------|
//! | registered | ok | typed event |
//! | registered | field error, or bad timestamp | `Unknown` passthrough, reason `Malformed` |
//! | withdrawn | - | `Withdrawn` passthrough |
//! | unregistered | - | `Unknown` passthrough |

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::completion::{self, CompletionOutcome, SidecarReader};
use crate::error::ErrorCode;
use crate::event::combat::{BountyData, DiedData, ShipTargetedData, UnderAttackData};
use crate::event::commerce::{MarketData, OutfittingData, ShipyardData};
use crate::event::exploration::{NavRouteData, SaaScanCompleteData, ScanData};
use crate::event::session::{CommanderData, FileheaderData, LoadGameData};
use crate::event::social::{FriendsData, ReceiveTextData};
use crate::event::travel::{
    DockedData, FsdJumpData, FsdTargetData, LocationData, SurfaceData, UndockedData,
};
use crate::event::{
    DecodedEvent, EventData, EventKind, EventType, GenericData, PassthroughData,
    PassthroughReason,
};
use crate::normalize::NameTables;
use crate::record::{FieldError, Fields, RawRecord, RecordError, TIMESTAMP_KEY};

/// Decoder for a runtime-registered tag.
pub type DecodeFn = for<'a> fn(&Fields<'a>, &NameTables) -> Result<EventData, FieldError>;

/// Tags the game stopped writing. Old journals still contain them.
pub const BUILTIN_WITHDRAWN: [&str; 2] = ["EngineerApply", "PowerplayVoucher"];

/// Registry misconfiguration. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("journal tag `{tag}` is registered twice")]
    DuplicateTagRegistration { tag: String },
}

impl RegistryError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::DuplicateTagRegistration
    }
}

#[derive(Debug, Clone, Copy)]
enum Decode {
    Builtin(EventType),
    Extension(DecodeFn),
}

/// How a tag is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
    /// Built-in typed decoder.
    Builtin,
    /// Runtime extension.
    Extension,
    /// Withdrawn; kept verbatim.
    Withdrawn,
}

/// One entry of [`Registry::tags`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagInfo {
    pub tag: String,
    pub status: TagStatus,
    /// The body of this tag may arrive in a sidecar file.
    pub completion_capable: bool,
}

enum Lookup<'r> {
    Registered(&'r Decode),
    Withdrawn,
    Unknown,
}

/// Tag → decoder table plus the withdrawn set.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    decoders: BTreeMap<String, Decode>,
    withdrawn: BTreeSet<String>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in type plus the built-in withdrawn tags.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for et in EventType::ALL {
            registry
                .decoders
                .insert(et.as_str().to_string(), Decode::Builtin(et));
        }
        for tag in BUILTIN_WITHDRAWN {
            registry.withdrawn.insert(tag.to_string());
        }
        registry
    }

    fn check_free(&self, tag: &str) -> Result<(), RegistryError> {
        if self.decoders.contains_key(tag) || self.withdrawn.contains(tag) {
            return Err(RegistryError::DuplicateTagRegistration {
                tag: tag.to_string(),
            });
        }
        Ok(())
    }

    /// Register the built-in decoder of `event_type`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateTagRegistration`] when the tag is taken.
    pub fn register_builtin(&mut self, event_type: EventType) -> Result<(), RegistryError> {
        self.check_free(event_type.as_str())?;
        self.decoders
            .insert(event_type.as_str().to_string(), Decode::Builtin(event_type));
        Ok(())
    }

    /// Register a runtime extension tag.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateTagRegistration`] when the tag is taken.
    pub fn register_extension(
        &mut self,
        tag: &str,
        decode: DecodeFn,
    ) -> Result<(), RegistryError> {
        self.check_free(tag)?;
        self.decoders
            .insert(tag.to_string(), Decode::Extension(decode));
        Ok(())
    }

    /// Mark `tag` as withdrawn. Withdrawing an already withdrawn tag is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateTagRegistration`] when the tag has a
    /// decoder.
    pub fn withdraw(&mut self, tag: &str) -> Result<(), RegistryError> {
        if self.withdrawn.contains(tag) {
            return Ok(());
        }
        self.check_free(tag)?;
        self.withdrawn.insert(tag.to_string());
        Ok(())
    }

    /// Registered and withdrawn tags, sorted.
    #[must_use]
    pub fn tags(&self) -> Vec<TagInfo> {
        let mut tags: Vec<TagInfo> = self
            .decoders
            .iter()
            .map(|(tag, decode)| match decode {
                Decode::Builtin(et) => TagInfo {
                    tag: tag.clone(),
                    status: TagStatus::Builtin,
                    completion_capable: et.is_completion_capable(),
                },
                Decode::Extension(_) => TagInfo {
                    tag: tag.clone(),
                    status: TagStatus::Extension,
                    completion_capable: false,
                },
            })
            .chain(self.withdrawn.iter().map(|tag| TagInfo {
                tag: tag.clone(),
                status: TagStatus::Withdrawn,
                completion_capable: false,
            }))
            .collect();
        tags.sort_by(|a, b| a.tag.cmp(&b.tag));
        tags
    }

    /// Number of registered and withdrawn tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len() + self.withdrawn.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, tag: &str) -> Lookup<'_> {
        if let Some(decode) = self.decoders.get(tag) {
            Lookup::Registered(decode)
        } else if self.withdrawn.contains(tag) {
            Lookup::Withdrawn
        } else {
            Lookup::Unknown
        }
    }
}

/// Run the built-in decoder for `event_type`.
fn decode_builtin(
    event_type: EventType,
    f: &Fields<'_>,
    t: &NameTables,
) -> Result<EventData, FieldError> {
    Ok(match event_type {
        EventType::Fileheader => EventData::Fileheader(FileheaderData::decode(f, t)?),
        EventType::Commander => EventData::Commander(CommanderData::decode(f, t)?),
        EventType::LoadGame => EventData::LoadGame(LoadGameData::decode(f, t)?),
        EventType::Location => EventData::Location(LocationData::decode(f, t)?),
        EventType::FsdJump => EventData::FsdJump(FsdJumpData::decode(f, t)?),
        EventType::FsdTarget => EventData::FsdTarget(FsdTargetData::decode(f, t)?),
        EventType::Docked => EventData::Docked(DockedData::decode(f, t)?),
        EventType::Undocked => EventData::Undocked(UndockedData::decode(f, t)?),
        EventType::Touchdown => EventData::Touchdown(SurfaceData::decode(f, t)?),
        EventType::Liftoff => EventData::Liftoff(SurfaceData::decode(f, t)?),
        EventType::Market => EventData::Market(MarketData::decode(f, t)?),
        EventType::Outfitting => EventData::Outfitting(OutfittingData::decode(f, t)?),
        EventType::Shipyard => EventData::Shipyard(ShipyardData::decode(f, t)?),
        EventType::NavRoute => EventData::NavRoute(NavRouteData::decode(f, t)?),
        EventType::NavRouteClear => EventData::NavRouteClear,
        EventType::Scan => EventData::Scan(ScanData::decode(f, t)?),
        EventType::SaaScanComplete => {
            EventData::SaaScanComplete(SaaScanCompleteData::decode(f, t)?)
        }
        EventType::ShipTargeted => EventData::ShipTargeted(ShipTargetedData::decode(f, t)?),
        EventType::UnderAttack => EventData::UnderAttack(UnderAttackData::decode(f, t)?),
        EventType::Friends => EventData::Friends(FriendsData::decode(f, t)?),
        EventType::Died => EventData::Died(DiedData::decode(f, t)?),
        EventType::Bounty => EventData::Bounty(BountyData::decode(f, t)?),
        EventType::ReceiveText => EventData::ReceiveText(ReceiveTextData::decode(f, t)?),
        EventType::Shutdown => EventData::Shutdown,
        EventType::Music | EventType::ReservoirReplenished | EventType::FssSignalDiscovered => {
            EventData::Generic(GenericData::decode(f)?)
        }
    })
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Sequential record decoder for one stream.
#[derive(Debug, Clone)]
pub struct Decoder {
    registry: Registry,
    tables: NameTables,
    next_sequence: u64,
    retain_source: bool,
}

impl Decoder {
    /// Decoder over a registry and name tables. Sequence ids start at 0.
    #[must_use]
    pub const fn new(registry: Registry, tables: NameTables) -> Self {
        Self {
            registry,
            tables,
            next_sequence: 0,
            retain_source: true,
        }
    }

    /// Built-in registry and tables.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(Registry::with_builtin(), NameTables::builtin())
    }

    /// Keep (or drop) the source record on completion-capable events.
    #[must_use]
    pub const fn with_retain_source(mut self, retain: bool) -> Self {
        self.retain_source = retain;
        self
    }

    /// The registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The name tables used for normalization.
    #[must_use]
    pub const fn tables(&self) -> &NameTables {
        &self.tables
    }

    /// The sequence id the next record will get.
    #[must_use]
    pub const fn next_sequence_id(&self) -> u64 {
        self.next_sequence
    }

    /// Decode one record. Never fails: records that cannot be typed come
    /// back as passthrough events carrying their original content.
    pub fn decode(&mut self, record: RawRecord) -> DecodedEvent {
        let sequence_id = self.next_sequence;
        self.next_sequence += 1;
        let tag = record.tag().to_string();
        let event_time = record.timestamp().unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let decode = match self.registry.lookup(&tag) {
            Lookup::Registered(decode) => *decode,
            Lookup::Withdrawn => {
                debug!(%tag, sequence_id, code = %ErrorCode::WithdrawnTag, "withdrawn tag");
                return passthrough(
                    &record,
                    EventKind::Withdrawn(tag),
                    PassthroughReason::Withdrawn,
                    event_time,
                    sequence_id,
                );
            }
            Lookup::Unknown => {
                debug!(%tag, sequence_id, code = %ErrorCode::UnknownTag, "unknown tag");
                return passthrough(
                    &record,
                    EventKind::Unknown(tag),
                    PassthroughReason::Unknown,
                    event_time,
                    sequence_id,
                );
            }
        };

        let result = match record.timestamp() {
            Some(_) => match decode {
                Decode::Builtin(et) => decode_builtin(et, &record.fields(), &self.tables),
                Decode::Extension(f) => f(&record.fields(), &self.tables),
            },
            None if record.fields().has(TIMESTAMP_KEY) => Err(FieldError::wrong_type(
                TIMESTAMP_KEY,
                "an ISO-8601 UTC timestamp",
            )),
            None => Err(FieldError::missing(TIMESTAMP_KEY)),
        };

        match result {
            Ok(data) => {
                let kind = match decode {
                    Decode::Builtin(et) => EventKind::Known(et),
                    Decode::Extension(_) => EventKind::Extension(tag),
                };
                let keep = self.retain_source
                    && kind
                        .event_type()
                        .is_some_and(EventType::is_completion_capable);
                let source = keep.then(|| Arc::new(record));
                DecodedEvent::new(event_time, kind, sequence_id, data, source)
            }
            Err(error) => {
                warn!(%tag, sequence_id, %error, code = %error.code(), "malformed record");
                passthrough(
                    &record,
                    EventKind::Unknown(tag),
                    PassthroughReason::Malformed { error },
                    event_time,
                    sequence_id,
                )
            }
        }
    }

    /// Parse and decode one journal line.
    ///
    /// # Errors
    ///
    /// [`RecordError`] when the line is not a JSON object with an `event`
    /// tag. No sequence id is consumed in that case.
    pub fn decode_line(&mut self, line: &str) -> Result<DecodedEvent, RecordError> {
        RawRecord::parse_line(line).map(|record| self.decode(record))
    }

    /// [`completion::attempt_complete`] with this decoder's tables.
    pub fn complete(
        &self,
        event: &mut DecodedEvent,
        reader: &dyn SidecarReader,
    ) -> CompletionOutcome {
        completion::attempt_complete(event, reader, &self.tables)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::builtin()
    }
}

fn passthrough(
    record: &RawRecord,
    kind: EventKind,
    reason: PassthroughReason,
    event_time: DateTime<Utc>,
    sequence_id: u64,
) -> DecodedEvent {
    let data = EventData::Passthrough(PassthroughData {
        reason,
        content: record.payload(),
    });
    DecodedEvent::new(event_time, kind, sequence_id, data, None)
}
