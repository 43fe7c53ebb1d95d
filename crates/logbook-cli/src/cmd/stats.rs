//! `lgb stats`: event counts for one journal.

use clap::Args;
use logbook_core::StreamStats;
use logbook_core::config::ProjectConfig;
use serde::Serialize;
use std::path::PathBuf;

use crate::cmd::open_journal;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `lgb stats`.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Journal file to count.
    pub file: PathBuf,
}

/// Report payload for `lgb stats`.
#[derive(Debug, Serialize)]
pub struct JournalStats {
    pub file: String,
    #[serde(flatten)]
    pub counts: StreamStats,
    pub typed: u64,
}

/// Execute `lgb stats`.
pub fn run_stats(
    args: &StatsArgs,
    output: OutputMode,
    project: &ProjectConfig,
) -> anyhow::Result<()> {
    let mut reader = open_journal(&args.file, project, output)?;
    for event in reader.by_ref() {
        event?;
    }
    let (_, counts) = reader.finish();

    let payload = JournalStats {
        file: args.file.display().to_string(),
        typed: counts.typed(),
        counts,
    };

    render_mode(
        output,
        &payload,
        |report, w| {
            writeln!(w, "lines  {}", report.counts.lines)?;
            writeln!(w, "decoded  {}", report.counts.decoded)?;
            writeln!(w, "typed  {}", report.typed)?;
            writeln!(w, "unknown  {}", report.counts.unknown)?;
            writeln!(w, "withdrawn  {}", report.counts.withdrawn)?;
            writeln!(w, "malformed  {}", report.counts.malformed)?;
            writeln!(w, "unreadable  {}", report.counts.unreadable)?;
            for (tag, count) in &report.counts.per_tag {
                writeln!(w, "tag  {tag}  {count}")?;
            }
            Ok(())
        },
        |report, w| {
            pretty_section(w, &format!("Journal: {}", report.file))?;
            pretty_kv(w, "lines", report.counts.lines.to_string())?;
            pretty_kv(w, "decoded", report.counts.decoded.to_string())?;
            pretty_kv(w, "typed", report.typed.to_string())?;
            pretty_kv(w, "unknown", report.counts.unknown.to_string())?;
            pretty_kv(w, "withdrawn", report.counts.withdrawn.to_string())?;
            pretty_kv(w, "malformed", report.counts.malformed.to_string())?;
            pretty_kv(w, "unreadable", report.counts.unreadable.to_string())?;
            writeln!(w)?;
            pretty_section(w, "Per tag")?;
            for (tag, count) in &report.counts.per_tag {
                writeln!(w, "{tag:<28} {count:>8}")?;
            }
            Ok(())
        },
    )
}
