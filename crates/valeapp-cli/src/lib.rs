#![forbid(unsafe_code)]

//! Administrative command line for the voucher store: bulk import, exports,
//! the destructive cleanup, user management and diagnostics.

mod commands;

use clap::{error::ErrorKind, ArgAction, Parser, Subcommand};
use commands::{AdminCommand, EmployeeCommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;
use valeapp_core::{ErrorCode, MachineError};
use valeapp_lifecycle::LifecycleError;

pub const CRATE_NAME: &str = "valeapp-cli";

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
Usage: {usage}

Options:
{options}

Commands:
{subcommands}
{after-help}";

#[derive(Parser)]
#[command(name = "valeapp", version)]
#[command(about = "Voucher discrepancy administration CLI")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_help = "Environment:\n  VALEAPP_STORE         sqlite (default) or rest\n  VALEAPP_SQLITE_PATH   SQLite database file\n  VALEAPP_STORE_URL     REST store base URL\n  VALEAPP_STORE_KEY     REST store API key"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a workbook and insert every row, or none.
    Import {
        file: PathBuf,
        /// Date used for rows whose date cell cannot be read (YYYY-MM-DD).
        #[arg(long)]
        fallback_date: Option<chrono::NaiveDate>,
    },
    /// Normalize a workbook without touching the store.
    Normalize {
        file: PathBuf,
        #[arg(long)]
        fallback_date: Option<chrono::NaiveDate>,
    },
    /// Write one dataset as an .xlsx file.
    Export {
        /// vouchers, archive, employees or admins.
        dataset: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Archive justified vouchers, then delete every voucher.
    Cleanup {
        /// Name recorded as the archiver.
        #[arg(long)]
        admin: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    Employee {
        #[command(subcommand)]
        command: EmployeeCommand,
    },
    /// Voucher and employee totals.
    Stats,
    /// Check store configuration and connectivity.
    Doctor,
}

#[derive(Clone, Copy)]
pub(crate) struct OutputMode {
    json: bool,
}

#[derive(Debug)]
pub(crate) struct CliError {
    exit_code: valeapp_core::ExitCode,
    machine: MachineError,
}

impl CliError {
    pub(crate) fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            exit_code: code.exit_code(),
            machine: MachineError::new(code, message),
        }
    }

    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UsageError, message)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub(crate) fn dependency(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DependencyFailure, message)
    }
}

impl From<LifecycleError> for CliError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::Validation(_) | LifecycleError::Ingest(_) => {
                Self::new(ErrorCode::ValidationError, message)
            }
            LifecycleError::NotFound(_) => Self::new(ErrorCode::NotFound, message),
            LifecycleError::Forbidden(_) => Self::new(ErrorCode::Unauthorized, message),
            LifecycleError::Conflict(_) => Self::new(ErrorCode::Conflict, message),
            LifecycleError::Store { source, .. } => {
                Self::dependency(message).with_detail("store_code", source.code.as_str())
            }
        }
    }
}

impl CliError {
    fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.machine = self.machine.with_detail(key, value);
        self
    }
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(valeapp_core::ExitCode::Success as u8),
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
            _ => {
                return Err(CliError::usage("invalid command line arguments")
                    .with_detail("error", &err.to_string()));
            }
        },
    };
    let output_mode = OutputMode { json: cli.json };
    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;
    init_logging(cli.quiet, cli.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("failed to start runtime: {e}")))?;
    runtime.block_on(dispatch(command, output_mode))
}

async fn dispatch(command: Commands, output_mode: OutputMode) -> Result<(), CliError> {
    match command {
        Commands::Normalize {
            file,
            fallback_date,
        } => commands::normalize(&file, fallback_date, output_mode),
        Commands::Import {
            file,
            fallback_date,
        } => commands::import(&file, fallback_date, output_mode).await,
        Commands::Export { dataset, out_dir } => {
            commands::export(&dataset, &out_dir, output_mode).await
        }
        Commands::Cleanup { admin, yes } => commands::cleanup(&admin, yes, output_mode).await,
        Commands::Admin { command } => commands::run_admin(command, output_mode).await,
        Commands::Employee { command } => commands::run_employee(command, output_mode).await,
        Commands::Stats => commands::stats(output_mode).await,
        Commands::Doctor => commands::doctor(output_mode).await,
    }
}

/// Logs go to stderr so `--json` output on stdout stays machine-readable.
fn init_logging(quiet: bool, verbose: u8) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(crate) fn emit_ok(output_mode: OutputMode, payload: &Value) -> Result<(), CliError> {
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
                "{{\"code\":\"internal\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
    }
}
