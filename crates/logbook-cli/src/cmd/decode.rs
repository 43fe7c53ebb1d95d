//! `lgb decode`: decode a journal and print its events.

use clap::Args;
use logbook_core::completion::{
    CancelToken, CompletionOutcome, RetryPolicy, SharedEvent, complete_with_retry,
};
use logbook_core::config::ProjectConfig;
use logbook_core::{DecodedEvent, EventKind, EventType};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::cmd::open_journal;
use crate::output::{OutputMode, Renderable, render_list};

/// Arguments for `lgb decode`.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Journal file to decode.
    pub file: PathBuf,

    /// Complete sidecar-backed events (Market, Outfitting, Shipyard, `NavRoute`).
    #[arg(long)]
    pub complete: bool,

    /// Directory holding the sidecar files. Defaults to the journal's directory.
    #[arg(long, value_name = "DIR")]
    pub sidecars: Option<PathBuf>,

    /// Keep waiting for missing sidecars under the configured retry policy.
    #[arg(long, requires = "complete")]
    pub wait: bool,

    /// Only print events with this tag. Repeatable.
    #[arg(long = "kind", value_name = "TAG")]
    pub kind: Vec<String>,
}

/// One printed event plus the outcome of its completion attempt, if any.
#[derive(Debug, Serialize)]
pub struct EventRow {
    #[serde(flatten)]
    pub event: DecodedEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionOutcome>,
}

impl EventRow {
    const fn completion_label(&self) -> &'static str {
        match &self.completion {
            None => "-",
            Some(CompletionOutcome::Completed) => "completed",
            Some(CompletionOutcome::NotYetAvailable) => "not_yet_available",
            Some(CompletionOutcome::Rejected { .. }) => "rejected",
            Some(CompletionOutcome::NotApplicable) => "not_applicable",
        }
    }
}

impl Renderable for EventRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}", self.event)?;
        match &self.completion {
            Some(CompletionOutcome::Rejected { rejection }) => {
                writeln!(w, "    completion: rejected ({rejection})")
            }
            Some(_) => writeln!(w, "    completion: {}", self.completion_label()),
            None => Ok(()),
        }
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}  {}",
            self.event.sequence_id(),
            self.event.event_time_utc().format("%Y-%m-%dT%H:%M:%SZ"),
            self.event.tag(),
            kind_status(&self.event),
            self.completion_label()
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["SEQ", "TIME", "TAG", "STATUS", "COMPLETION"]
    }
}

const fn kind_status(event: &DecodedEvent) -> &'static str {
    match event.kind() {
        EventKind::Known(_) => "known",
        EventKind::Extension(_) => "extension",
        EventKind::Withdrawn(_) => "withdrawn",
        EventKind::Unknown(_) => "unknown",
    }
}

/// Execute `lgb decode`.
pub fn run_decode(
    args: &DecodeArgs,
    output: OutputMode,
    project: &ProjectConfig,
) -> anyhow::Result<()> {
    let mut reader = open_journal(&args.file, project, output)?;
    let mut events = Vec::new();
    for event in reader.by_ref() {
        events.push(event?);
    }
    let (decoder, stats) = reader.finish();
    debug!(lines = stats.lines, decoded = stats.decoded, "journal decoded");

    let mut completions: HashMap<u64, CompletionOutcome> = HashMap::new();
    if args.complete {
        if project.completion.enabled {
            let dir = sidecar_dir(&args.file, args.sidecars.as_deref());
            let sidecars = project.completion.sidecar_reader(&dir);
            let policy = if args.wait {
                project.completion.retry_policy()
            } else {
                RetryPolicy::once()
            };
            let cancel = CancelToken::new();
            for index in latest_completable(&events) {
                let shared = SharedEvent::new(events[index].clone());
                let outcome =
                    complete_with_retry(&shared, &sidecars, decoder.tables(), policy, &cancel);
                debug!(
                    sequence_id = events[index].sequence_id(),
                    ?outcome,
                    "completion attempted"
                );
                events[index] = shared.snapshot();
                completions.insert(events[index].sequence_id(), outcome);
            }
        } else {
            warn!("completion is disabled by `[completion] enabled = false`");
        }
    }

    let rows: Vec<EventRow> = events
        .into_iter()
        .filter(|event| args.kind.is_empty() || args.kind.iter().any(|k| k == event.tag()))
        .map(|event| {
            let completion = completions.remove(&event.sequence_id());
            EventRow { event, completion }
        })
        .collect();

    render_list(&rows, output)?;
    Ok(())
}

/// Sidecar directory: `--sidecars`, else the journal's own directory.
fn sidecar_dir(journal: &Path, sidecars: Option<&Path>) -> PathBuf {
    sidecars.map_or_else(
        || {
            journal
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        },
        Path::to_path_buf,
    )
}

/// Index of the last event of each completion-capable kind, in stream
/// order. A sidecar only ever holds the latest body, so earlier events of
/// the same kind cannot be completed from it.
fn latest_completable(events: &[DecodedEvent]) -> Vec<usize> {
    let mut latest: HashMap<EventType, usize> = HashMap::new();
    for (index, event) in events.iter().enumerate() {
        let capable = event
            .kind()
            .event_type()
            .filter(|event_type| event_type.is_completion_capable());
        if let Some(event_type) = capable {
            latest.insert(event_type, index);
        }
    }
    let mut indices: Vec<usize> = latest.into_values().collect();
    indices.sort_unstable();
    indices
}
