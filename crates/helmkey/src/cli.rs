//! Clap derive structures for the `helmkey` CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// helmkey -- drive chartplotter displays from a media remote
#[derive(Debug, Parser)]
#[command(
    name = "helmkey",
    version,
    about = "Drive chartplotter displays from a media remote",
    long_about = "Reads key presses from a Linux input device and turns them into\n\
        display selection, dashboard paging and bound actions on a\n\
        chartplotter Display Service.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "HELMKEY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Listen to the remote and drive the displays until interrupted
    Run(RunArgs),

    /// Find which input device is the remote
    Detect(DetectArgs),

    /// Print key events read from the remote
    Dump(DumpArgs),

    /// Query the Display Service once and list its displays
    #[command(alias = "ls")]
    Displays,

    /// List persisted dashboard bindings
    Bindings(BindingsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Input device node (skips autodetection)
    #[arg(long, short = 'd')]
    pub device: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// How long to wait for key presses (e.g. "10s", "1m")
    #[arg(long, short = 'w', value_parser = humantime::parse_duration)]
    pub window: Option<Duration>,

    /// Key presses a device must produce to be chosen
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub min_presses: Option<u32>,

    /// Write the detected node to `[device].path` in the config file
    #[arg(long)]
    pub save: bool,

    /// Candidate device nodes (defaults to every event node)
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Input device node (defaults to config, then autodetection)
    #[arg(long, short = 'd')]
    pub device: Option<PathBuf>,

    /// Print every raw record, not only classified key events
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct BindingsArgs {
    /// Overlay bindings from the config file, as `run` would
    #[arg(long)]
    pub merged: bool,
}
