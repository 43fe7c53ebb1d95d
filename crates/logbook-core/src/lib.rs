//! logbook-core library.
//!
//! Decodes game journal records into typed events, completes events whose
//! bodies arrive later in sidecar files, folds repeated events into
//! session-scoped correlation groups and memoizes derived values.
//!
//! # Conventions
//!
//! - **Errors**: domain errors are `thiserror` enums with an [`error::ErrorCode`];
//!   configuration loading uses `anyhow::Result`.
//! - **Logging**: `tracing` macros with structured fields. Per-record
//!   anomalies never abort a stream.

pub mod completion;
pub mod config;
pub mod correlate;
pub mod derived;
pub mod error;
pub mod event;
pub mod lock;
pub mod normalize;
pub mod record;
pub mod registry;
pub mod stream;

pub use completion::{CompletionOutcome, SharedEvent, SidecarReader};
pub use correlate::{Correlation, CorrelationGroup, Correlator};
pub use event::{DecodedEvent, EventData, EventKind, EventType};
pub use record::RawRecord;
pub use registry::{Decoder, Registry, RegistryError};
pub use stream::{JournalReader, StreamStats};
