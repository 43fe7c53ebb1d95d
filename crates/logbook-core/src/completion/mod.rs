//! Additional-files completion protocol.
//!
//! Some records are written before their body: the game logs `Market`,
//! `Outfitting`, `Shipyard` and `NavRoute` first and writes the item lists a
//! moment later into a companion ("sidecar") file next to the journal. An
//! event decoded from such a record reports [`Completable::needs_completion`]
//! until a sidecar snapshot is accepted.
//!
//! # Acceptance rules
//!
//! 1. Missing or unreadable sidecar → [`CompletionOutcome::NotYetAvailable`].
//! 2. Sidecar timestamp older than the primary record → `NotYetAvailable`.
//! 3. Sidecar `MarketID` differs from the primary record's →
//!    [`CompletionOutcome::Rejected`]; callers retry it like rule 1.
//! 4. Otherwise the body is replaced wholesale. A snapshot whose digest
//!    equals the current body's digest is a no-op.
//!
//! Retrying is the caller's business; see [`retry`].

pub mod file;
pub mod retry;

pub use file::FileSidecarReader;
pub use retry::{CancelToken, RetryPolicy, complete_with_retry};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::error::ErrorCode;
use crate::event::{DecodedEvent, EventType};
use crate::lock::LockError;
use crate::normalize::NameTables;
use crate::record::{Fields, parse_timestamp};

// ---------------------------------------------------------------------------
// Sidecar kinds and snapshots
// ---------------------------------------------------------------------------

/// The companion files the game writes next to the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SidecarKind {
    Market,
    Outfitting,
    Shipyard,
    NavRoute,
}

impl SidecarKind {
    /// All sidecar kinds.
    pub const ALL: [Self; 4] = [Self::Market, Self::Outfitting, Self::Shipyard, Self::NavRoute];

    /// File name inside the journal directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Market => "Market.json",
            Self::Outfitting => "Outfitting.json",
            Self::Shipyard => "Shipyard.json",
            Self::NavRoute => "NavRoute.json",
        }
    }

    /// Sidecar used by a built-in event type, if any.
    #[must_use]
    pub const fn for_event(event_type: EventType) -> Option<Self> {
        match event_type {
            EventType::Market => Some(Self::Market),
            EventType::Outfitting => Some(Self::Outfitting),
            EventType::Shipyard => Some(Self::Shipyard),
            EventType::NavRoute => Some(Self::NavRoute),
            _ => None,
        }
    }
}

impl fmt::Display for SidecarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Parsed content of one sidecar file at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SidecarSnapshot {
    kind: SidecarKind,
    content: Map<String, Value>,
    timestamp: Option<DateTime<Utc>>,
    digest: String,
}

impl SidecarSnapshot {
    /// Parse sidecar bytes.
    ///
    /// The snapshot time is the JSON `timestamp` field, falling back to
    /// `modified` (the file modification time) when that is absent.
    ///
    /// # Errors
    ///
    /// [`SidecarError`] when the bytes are not a JSON object.
    pub fn from_bytes(
        kind: SidecarKind,
        bytes: &[u8],
        modified: Option<DateTime<Utc>>,
    ) -> Result<Self, SidecarError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(content) = value else {
            return Err(SidecarError::NotAnObject { kind });
        };
        let timestamp = content
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .or(modified);
        Ok(Self {
            kind,
            content,
            timestamp,
            digest: blake3::hash(bytes).to_hex().to_string(),
        })
    }

    /// Which sidecar this is.
    #[must_use]
    pub const fn kind(&self) -> SidecarKind {
        self.kind
    }

    /// Typed access to the sidecar content.
    #[must_use]
    pub const fn fields(&self) -> Fields<'_> {
        Fields::new(&self.content)
    }

    /// Snapshot time, if known.
    #[must_use]
    pub const fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// BLAKE3 hex digest of the raw sidecar bytes.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// `MarketID` of the sidecar, if present.
    #[must_use]
    pub fn market_id(&self) -> Option<i64> {
        self.fields().i64("MarketID")
    }
}

/// Errors reading a sidecar. All of them mean "not available yet".
#[derive(Debug, thiserror::Error)]
pub enum SidecarError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sidecar is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{kind} is not a JSON object")]
    NotAnObject { kind: SidecarKind },
    #[error("sidecar is locked: {0}")]
    Lock(#[from] LockError),
}

impl SidecarError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Lock(_) => ErrorCode::LockContention,
            Self::Io { .. } | Self::Parse(_) | Self::NotAnObject { .. } => {
                ErrorCode::SidecarUnavailable
            }
        }
    }
}

/// Anything that can hand out the current content of a sidecar file.
pub trait SidecarReader {
    /// Current snapshot of `kind`, or `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// [`SidecarError`] when the file exists but cannot be read or parsed.
    fn read(&self, kind: SidecarKind) -> Result<Option<SidecarSnapshot>, SidecarError>;
}

// ---------------------------------------------------------------------------
// Completion bodies
// ---------------------------------------------------------------------------

/// Where a completion body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyOrigin {
    /// Inline in the primary record.
    Primary,
    /// Read from a sidecar file.
    Sidecar,
}

/// The list a completion-capable event carries once complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionBody<T> {
    /// Entries, in file order.
    pub entries: Vec<T>,
    /// Where the entries came from.
    pub origin: BodyOrigin,
    /// Digest of the sidecar the entries were read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Timestamp of that sidecar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidecar_time: Option<DateTime<Utc>>,
}

impl<T> CompletionBody<T> {
    /// Body decoded inline from the primary record.
    #[must_use]
    pub const fn from_primary(entries: Vec<T>) -> Self {
        Self {
            entries,
            origin: BodyOrigin::Primary,
            digest: None,
            sidecar_time: None,
        }
    }

    /// Body read from a sidecar snapshot.
    #[must_use]
    pub fn from_sidecar(entries: Vec<T>, snapshot: &SidecarSnapshot) -> Self {
        Self {
            entries,
            origin: BodyOrigin::Sidecar,
            digest: Some(snapshot.digest().to_string()),
            sidecar_time: snapshot.timestamp(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a sidecar snapshot was not accepted for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("sidecar MarketID {found} does not match event MarketID {expected}")]
    IdentityMismatch { expected: i64, found: i64 },
    #[error("sidecar has no MarketID")]
    MissingIdentity,
    #[error("sidecar has no `{field}` list")]
    MissingBody { field: &'static str },
}

impl Rejection {
    /// Machine-readable code for this rejection.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::IdentityMismatch { .. } | Self::MissingIdentity => {
                ErrorCode::SidecarIdentityMismatch
            }
            Self::MissingBody { .. } => ErrorCode::SidecarUnavailable,
        }
    }
}

/// Result of one completion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// The body now reflects the sidecar.
    Completed,
    /// No usable sidecar yet; retry later.
    NotYetAvailable,
    /// The sidecar contradicts the primary record; retry later.
    Rejected { rejection: Rejection },
    /// The event kind has no sidecar.
    NotApplicable,
}

impl CompletionOutcome {
    /// True when another attempt could still succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotYetAvailable | Self::Rejected { .. })
    }
}

/// A payload whose body may be delivered by a sidecar.
pub trait Completable {
    /// The sidecar carrying the body.
    fn sidecar_kind(&self) -> SidecarKind;

    /// True while no body has been accepted.
    fn needs_completion(&self) -> bool;

    /// `MarketID` the sidecar must match, if the kind has one.
    fn identity(&self) -> Option<i64>;

    /// Digest of the sidecar the current body came from.
    fn body_digest(&self) -> Option<&str>;

    /// Replace the body with the snapshot's content.
    ///
    /// # Errors
    ///
    /// [`Rejection::MissingBody`] when the snapshot lacks the list; the
    /// current body is left untouched.
    fn replace_body(
        &mut self,
        snapshot: &SidecarSnapshot,
        tables: &NameTables,
    ) -> Result<(), Rejection>;
}

/// Try to complete `event` from `reader`.
///
/// Safe to call repeatedly: each accepted snapshot replaces the body in
/// full, and an identical snapshot leaves the event untouched.
pub fn attempt_complete(
    event: &mut DecodedEvent,
    reader: &dyn SidecarReader,
    tables: &NameTables,
) -> CompletionOutcome {
    let event_time = event.event_time_utc();
    let sequence_id = event.sequence_id();
    let Some(target) = event.completable_mut() else {
        return CompletionOutcome::NotApplicable;
    };
    let kind = target.sidecar_kind();

    let snapshot = match reader.read(kind) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            debug!(sequence_id, %kind, "sidecar not present yet");
            return CompletionOutcome::NotYetAvailable;
        }
        Err(error) => {
            debug!(sequence_id, %kind, %error, code = %error.code(), "sidecar unreadable");
            return CompletionOutcome::NotYetAvailable;
        }
    };

    match snapshot.timestamp() {
        Some(ts) if ts >= event_time => {}
        other => {
            debug!(
                sequence_id,
                %kind,
                sidecar_time = ?other,
                %event_time,
                code = %ErrorCode::SidecarTimestampMismatch,
                "sidecar older than primary record"
            );
            return CompletionOutcome::NotYetAvailable;
        }
    }

    if let Some(expected) = target.identity() {
        let rejection = match snapshot.market_id() {
            Some(found) if found == expected => None,
            Some(found) => Some(Rejection::IdentityMismatch { expected, found }),
            None => Some(Rejection::MissingIdentity),
        };
        if let Some(rejection) = rejection {
            debug!(sequence_id, %kind, %rejection, "sidecar rejected");
            return CompletionOutcome::Rejected { rejection };
        }
    }

    if target.body_digest() == Some(snapshot.digest()) {
        debug!(sequence_id, %kind, "sidecar unchanged since last completion");
        return CompletionOutcome::Completed;
    }

    match target.replace_body(&snapshot, tables) {
        Ok(()) => {
            debug!(sequence_id, %kind, "completed from sidecar");
            CompletionOutcome::Completed
        }
        Err(rejection) => {
            debug!(sequence_id, %kind, %rejection, "sidecar rejected");
            CompletionOutcome::Rejected { rejection }
        }
    }
}

// ---------------------------------------------------------------------------
// SharedEvent
// ---------------------------------------------------------------------------

/// An event shared between the decode loop, completion workers and readers.
///
/// Completion attempts and reads lock the event itself, so a body
/// replacement is never observed half-done and two attempts on the same
/// event never interleave. Other events are unaffected.
#[derive(Debug, Clone)]
pub struct SharedEvent {
    inner: Arc<Mutex<DecodedEvent>>,
}

impl SharedEvent {
    /// Share `event`.
    #[must_use]
    pub fn new(event: DecodedEvent) -> Self {
        Self {
            inner: Arc::new(Mutex::new(event)),
        }
    }

    /// Lock the event. A poisoned lock is recovered; the event data is
    /// only ever replaced wholesale so it stays consistent.
    pub fn lock(&self) -> MutexGuard<'_, DecodedEvent> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// [`attempt_complete`] under the event lock.
    pub fn attempt_complete(
        &self,
        reader: &dyn SidecarReader,
        tables: &NameTables,
    ) -> CompletionOutcome {
        attempt_complete(&mut self.lock(), reader, tables)
    }

    /// True while the event still lacks its body.
    #[must_use]
    pub fn needs_completion(&self) -> bool {
        self.lock().needs_completion()
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DecodedEvent {
        self.lock().clone()
    }
}
