//! Binary entry point for the declink CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Index declaration snapshots exported by the host
//! declink index snapshots/*.json
//!
//! # What is linked with OrderService?
//! declink query OrderService
//!
//! # Forget a deleted file
//! declink remove src/Tests/OrderServiceTests.cs
//!
//! # Summarize the stored index
//! declink status
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use declink::cli::{open_session, run_index, run_query, run_remove, run_status, SessionOptions};
use declink::config::CliOverrides;
use declink::error::DeclinkError;
use declink::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Incremental index of marker-declared links between declarations.
///
/// All output is JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "declink", version, about = "Index links between declarations")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global options shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root directory (default: current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Fact store directory (default: .declink/ in workspace).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Marker name to index (overrides declink.toml and DECLINK_MARKER_NAME).
    #[arg(long, global = true)]
    marker: Option<String>,

    /// Declaration language to accept; repeat for several.
    #[arg(long = "language", global = true)]
    languages: Vec<String>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Build and merge declaration snapshots (JSON files).
    Index {
        /// Snapshot files, each holding one source file or an array of them.
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,
    },
    /// Drop files from the index.
    Remove {
        /// Source file ids, as they appear in snapshots.
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Show everything linked with a name, in either direction.
    Query {
        /// Simple declaration name.
        name: String,
    },
    /// Summarize the stored index.
    Status,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let response = ErrorResponse::from_error(&err);
            // Errors go to stdout as JSON, like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();
            ExitCode::from(err.error_code().code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn session_options(global: &GlobalArgs) -> Result<SessionOptions, DeclinkError> {
    let workspace = match &global.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir()
            .map_err(|e| DeclinkError::internal(format!("cannot read current dir: {}", e)))?,
    };
    Ok(SessionOptions {
        workspace,
        store_dir: global.store.clone(),
        overrides: CliOverrides {
            marker_name: global.marker.clone(),
            languages: global.languages.clone(),
        },
    })
}

fn emit<T: Serialize>(response: &T) -> Result<(), DeclinkError> {
    emit_response(response, &mut io::stdout())
        .map_err(|e| DeclinkError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), DeclinkError> {
    let options = session_options(&cli.global)?;
    let mut session = open_session(&options)?;

    let result = match cli.command {
        Command::Index { snapshots } => {
            run_index(&mut session, &snapshots).and_then(|response| emit(&response))
        }
        Command::Remove { files } => emit(&run_remove(&mut session, &files)),
        Command::Query { name } => run_query(&session, &name).and_then(|response| emit(&response)),
        Command::Status => run_status(&session).and_then(|response| emit(&response)),
    };

    session.close();
    result
}
