//! `lunar-security` command line tool.
//!
//! Runs the library's primitives over arguments or stdin lines, for
//! scripting and for checking payloads by hand.

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{FileConfig, LimitOverrides, build_limiter};
use lunar_security::Dialect;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lunar-security")]
#[command(version, about = "Injection checks, escaping, prepared statements and rate limiting")]
struct Cli {
    /// TOML config file with a [rate_limit] table
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify input for SQL and NoSQL injection signatures
    Check {
        /// Inputs to check (reads stdin lines when omitted)
        inputs: Vec<String>,
        /// Output one JSON object per input
        #[arg(long)]
        json: bool,
    },
    /// Escape input for literal embedding in a query
    Sanitize {
        /// Inputs to escape (reads stdin lines when omitted)
        inputs: Vec<String>,
    },
    /// Bind values into a statement template and print the finalized query
    Prepare {
        /// Template with `?` placeholders
        #[arg(short, long)]
        template: String,
        /// Values bound to the placeholders in order
        values: Vec<String>,
        /// Literal syntax of the target database
        #[arg(short, long, value_enum, default_value_t = DialectArg::Mysql)]
        dialect: DialectArg,
        /// Refuse values that fail the injection check
        #[arg(long)]
        strict: bool,
    },
    /// Replay identity keys through a rate limiter
    Throttle {
        /// Keys to check in order (reads stdin lines when omitted)
        keys: Vec<String>,
        #[command(flatten)]
        limits: LimitArgs,
        /// Output one JSON object per key
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum DialectArg {
    /// MySQL and MariaDB backslash escaping
    Mysql,
    /// Standard SQL quote doubling (SQLite, Postgres)
    Ansi,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Mysql => Self::MySql,
            DialectArg::Ansi => Self::Ansi,
        }
    }
}

#[derive(Args)]
struct LimitArgs {
    /// Requests admitted per key per window
    #[arg(long = "max")]
    max_requests: Option<u32>,
    /// Window length in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,
    /// Number of lock shards (power of two above 1)
    #[arg(long)]
    shards: Option<usize>,
}

impl From<LimitArgs> for LimitOverrides {
    fn from(args: LimitArgs) -> Self {
        Self {
            max_requests: args.max_requests,
            window_ms: args.window_ms,
            shards: args.shards,
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let code = match cli.command {
        Commands::Check { inputs, json } => {
            let inputs = or_stdin(inputs)?;
            let rejected = commands::check(&inputs, json, &mut out)?;
            exit_code(rejected)
        },
        Commands::Sanitize { inputs } => {
            let inputs = or_stdin(inputs)?;
            commands::sanitize_all(&inputs, &mut out)?;
            ExitCode::SUCCESS
        },
        Commands::Prepare {
            template,
            values,
            dialect,
            strict,
        } => {
            commands::prepare(&template, &values, dialect.into(), strict, &mut out)?;
            ExitCode::SUCCESS
        },
        Commands::Throttle { keys, limits, json } => {
            let limiter = build_limiter(file.rate_limit, limits.into())?;
            let keys = or_stdin(keys)?;
            let rejected = commands::throttle(&limiter, &keys, json, &mut out)?;
            exit_code(rejected)
        },
    };

    out.flush()?;
    Ok(code)
}

/// Use `args` if any were given, otherwise every line of stdin.
fn or_stdin(args: Vec<String>) -> Result<Vec<String>> {
    if !args.is_empty() {
        return Ok(args);
    }
    io::stdin()
        .lock()
        .lines()
        .collect::<io::Result<_>>()
        .context("Failed to read stdin")
}

const fn exit_code(rejected: usize) -> ExitCode {
    if rejected == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
