// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! Operator CLI over the waveform query libraries.

mod commands;

use clap::{error::ErrorKind, ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

pub const CRATE_NAME: &str = "wavescope-cli";

#[derive(Parser)]
#[command(name = "wavescope")]
#[command(about = "Waveform index and event-file operations CLI")]
#[command(version)]
#[command(after_help = "Environment:\n  RUST_LOG   Log filter override")]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parsed form of a filter expression.
    ParseFilter { expr: String },
    /// Run the candidate lookup against an index database.
    Candidates {
        #[arg(long)]
        index_db: PathBuf,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        table: Option<String>,
        #[arg(long)]
        channel: Option<String>,
    },
    /// Extract matching records from one event file.
    Extract {
        #[arg(long)]
        file: PathBuf,
        /// Absolute time of the first entry; decoded from the file name when omitted.
        #[arg(long)]
        file_start: Option<String>,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "")]
        filter: String,
        #[arg(long, default_value_t = 1)]
        granularity: usize,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        tree: Option<String>,
    },
    /// Show entry count and branch layout of one event file.
    Inspect {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        tree: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Internal = 10,
}

#[derive(Debug, Clone, Serialize)]
struct MachineError {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    fn usage(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::Usage,
            machine: MachineError {
                code: "usage_error",
                message: message.into(),
            },
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::Internal,
            machine: MachineError {
                code: "internal_error",
                message: message.into(),
            },
        }
    }
}

#[derive(Clone, Copy)]
struct OutputMode {
    json: bool,
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => return Err(CliError::usage(err.to_string().trim_end().to_string())),
        },
    };
    init_logging(cli.quiet, cli.verbose);
    let output_mode = OutputMode { json: cli.json };
    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;

    match command {
        Commands::ParseFilter { expr } => commands::parse_filter(&expr, output_mode),
        Commands::Candidates {
            index_db,
            start,
            end,
            table,
            channel,
        } => commands::candidates(
            commands::CandidatesArgs {
                index_db,
                start,
                end,
                table,
                channel,
            },
            output_mode,
        ),
        Commands::Extract {
            file,
            file_start,
            start,
            end,
            filter,
            granularity,
            limit,
            tree,
        } => commands::extract(
            commands::ExtractArgs {
                file,
                file_start,
                start,
                end,
                filter,
                granularity,
                limit,
                tree,
            },
            output_mode,
        ),
        Commands::Inspect { file, tree } => commands::inspect(&file, tree, output_mode),
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn emit_ok(output_mode: OutputMode, payload: &Value) -> Result<(), CliError> {
    let text = if output_mode.json {
        serde_json::to_string(payload)
    } else {
        serde_json::to_string_pretty(payload)
    }
    .map_err(|e| CliError::internal(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\"}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
    }
}
