//! Command handlers. Each takes its parsed arguments, the resolved output
//! mode and the project configuration.

pub mod decode;
pub mod replay;
pub mod stats;
pub mod tags;

use anyhow::Context;
use logbook_core::config::ProjectConfig;
use logbook_core::{Decoder, JournalReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::output::{CliError, OutputMode, render_error};

/// Build the configured decoder, reporting registry conflicts.
pub fn build_decoder(project: &ProjectConfig, output: OutputMode) -> anyhow::Result<Decoder> {
    match project.decoder() {
        Ok(decoder) => Ok(decoder),
        Err(err) => {
            let code = err.code();
            render_error(
                output,
                &CliError::with_details(
                    err.to_string(),
                    "remove the tag from `[decode] withdrawn` in .logbook/config.toml",
                    code.code(),
                ),
            )?;
            Err(err.into())
        }
    }
}

/// Open `path` for decoding with the configured decoder.
pub fn open_journal(
    path: &Path,
    project: &ProjectConfig,
    output: OutputMode,
) -> anyhow::Result<JournalReader<BufReader<File>>> {
    let decoder = build_decoder(project, output)?;
    JournalReader::open(path, decoder)
        .with_context(|| format!("Failed to open journal {}", path.display()))
}
