#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use logbook_core::config::{self, EffectiveConfig};
use logbook_core::error::ErrorCode;
use output::{CliError, OutputMode, render_error};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lgb: decode, complete and correlate game journals",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format; overrides `--json`, `FORMAT` and the user config.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Decode a journal and print its events",
        long_about = "Decode every line of a journal file into typed events. With --complete, \
                      the latest event of each sidecar-backed kind is completed from the \
                      sidecar files next to the journal (or in --sidecars).",
        after_help = "EXAMPLES:\n    # Print every event\n    lgb decode Journal.2023-01-01T090000.01.log\n\n    # Only market and docking events, completed from sidecars\n    lgb decode Journal.log --complete --kind Market --kind Docked\n\n    # Emit machine-readable output\n    lgb decode Journal.log --json"
    )]
    Decode(cmd::decode::DecodeArgs),

    #[command(
        about = "Count events in a journal",
        long_about = "Count events per tag plus unknown, withdrawn, malformed and unreadable totals.",
        after_help = "EXAMPLES:\n    # Counts for one journal\n    lgb stats Journal.log\n\n    # Emit machine-readable output\n    lgb stats Journal.log --json"
    )]
    Stats(cmd::stats::StatsArgs),

    #[command(
        about = "Replay a journal through the correlation engine",
        long_about = "Decode and correlate a journal. A session ends at LoadGame and Shutdown. \
                      Surface mapping is applied to earlier scans before exploration values are totalled.",
        after_help = "EXAMPLES:\n    # Show correlation groups and exploration totals\n    lgb replay Journal.log\n\n    # Emit machine-readable output\n    lgb replay Journal.log --json"
    )]
    Replay(cmd::replay::ReplayArgs),

    #[command(
        about = "List registered and withdrawn tags",
        after_help = "EXAMPLES:\n    # Every known tag\n    lgb tags\n\n    # Emit machine-readable output\n    lgb tags --json"
    )]
    Tags(cmd::tags::TagsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("LOGBOOK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "logbook=debug,info"
        } else {
            "logbook=info,warn"
        })
    });

    let format = env::var("LOGBOOK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<EffectiveConfig> {
    let project_root = env::current_dir()?;
    match config::resolve_config(&project_root, cli.json) {
        Ok(effective) => Ok(effective),
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            render_error(
                cli.format.unwrap_or(if cli.json {
                    OutputMode::Json
                } else {
                    OutputMode::Text
                }),
                &CliError::with_details(
                    format!("{err:#}"),
                    code.hint().unwrap_or(code.message()),
                    code.code(),
                ),
            )?;
            Err(err)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let effective = load_config(&cli)?;
    let output = output::resolve_output_mode(cli.format, &effective.resolved_output);

    match cli.command {
        Commands::Decode(ref args) => cmd::decode::run_decode(args, output, &effective.project),
        Commands::Stats(ref args) => cmd::stats::run_stats(args, output, &effective.project),
        Commands::Replay(ref args) => cmd::replay::run_replay(args, output, &effective.project),
        Commands::Tags(ref args) => cmd::tags::run_tags(args, output, &effective.project),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["lgb", "tags", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Tags(_)));
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["lgb", "--format", "pretty", "stats", "Journal.log"]);
        assert_eq!(cli.format, Some(OutputMode::Pretty));
        match cli.command {
            Commands::Stats(args) => assert_eq!(args.file.to_str(), Some("Journal.log")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn decode_flags_parse() {
        let cli = Cli::parse_from([
            "lgb",
            "decode",
            "Journal.log",
            "--complete",
            "--sidecars",
            "/tmp/sidecars",
            "--kind",
            "Market",
            "--kind",
            "Docked",
        ]);
        match cli.command {
            Commands::Decode(args) => {
                assert!(args.complete);
                assert_eq!(
                    args.sidecars.as_deref().and_then(|p| p.to_str()),
                    Some("/tmp/sidecars")
                );
                assert_eq!(args.kind, ["Market", "Docked"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
