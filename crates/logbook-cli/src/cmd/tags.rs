//! `lgb tags`: list the decoder's tag table.

use clap::Args;
use logbook_core::config::ProjectConfig;
use logbook_core::registry::{TagInfo, TagStatus};
use std::io::{self, Write};

use crate::cmd::build_decoder;
use crate::output::{OutputMode, Renderable, render_list};

/// Arguments for `lgb tags`.
#[derive(Args, Debug, Default)]
pub struct TagsArgs {
    /// Only list withdrawn tags.
    #[arg(long)]
    pub withdrawn: bool,
}

struct TagRow(TagInfo);

const fn status_label(status: TagStatus) -> &'static str {
    match status {
        TagStatus::Builtin => "builtin",
        TagStatus::Extension => "extension",
        TagStatus::Withdrawn => "withdrawn",
    }
}

impl Renderable for TagRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let sidecar = if self.0.completion_capable {
            "  (sidecar)"
        } else {
            ""
        };
        writeln!(
            w,
            "{:<24} {}{sidecar}",
            self.0.tag,
            status_label(self.0.status)
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, &self.0).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}",
            self.0.tag,
            status_label(self.0.status),
            self.0.completion_capable
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["TAG", "STATUS", "SIDECAR"]
    }
}

/// Execute `lgb tags`.
pub fn run_tags(
    args: &TagsArgs,
    output: OutputMode,
    project: &ProjectConfig,
) -> anyhow::Result<()> {
    let decoder = build_decoder(project, output)?;
    let rows: Vec<TagRow> = decoder
        .registry()
        .tags()
        .into_iter()
        .filter(|info| !args.withdrawn || info.status == TagStatus::Withdrawn)
        .map(TagRow)
        .collect();
    render_list(&rows, output)?;
    Ok(())
}
