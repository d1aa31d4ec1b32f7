//! Command-line runner for offload computations.
//!
//! `offload run` loads a WebAssembly component, registers it with a pool
//! and calls it once per argument list, printing the results in argument
//! order followed by the batch timing. `offload encode` prints the wire
//! message an argument list encodes to.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use offload_runtime::{
    Batch, CallFailure, CodecKind, Computation, Pool, PoolConfig, RuntimeError, Values,
    WasmComputation,
};
use offload_wire::WireError;
use thiserror::Error;
use tracing::{debug, info};

/// Offload - run a computation across a pool of single-use units
#[derive(Parser, Debug)]
#[command(name = "offload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Call a WASM component once per argument list
    Run {
        /// Component exporting the offload:unit/unit interface
        #[arg(long)]
        component: PathBuf,

        /// Wire layout: opaque (or json), int32, float64
        #[arg(long, default_value = "int32")]
        codec: CodecKind,

        /// Maximum concurrent units (at least 2)
        #[arg(long, env = "OFFLOAD_THREADS", allow_negative_numbers = true)]
        threads: Option<i64>,

        /// Argument lists: comma-separated numbers, or JSON text for opaque
        args: Vec<String>,
    },

    /// Print the wire message for one argument list, as hex
    Encode {
        #[arg(long, default_value = "int32")]
        codec: CodecKind,

        args: String,
    },
}

/// Errors reported by the command-line runner.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("invalid argument list `{input}`: {reason}")]
    Arguments { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Parse one command-line argument list for `kind`.
///
/// Vector layouts take comma-separated numbers (an empty string is an
/// empty list). The opaque layout takes JSON text.
pub fn parse_args(kind: CodecKind, input: &str) -> Result<Values> {
    let invalid = |reason: String| CliError::Arguments {
        input: input.to_string(),
        reason,
    };

    match kind {
        CodecKind::Opaque => serde_json::from_str(input)
            .map(|value| Values::Opaque(Some(value)))
            .map_err(|e| invalid(e.to_string())),
        CodecKind::Int32Vector => split(input)
            .map(|item| item.parse::<i32>().map_err(|e| invalid(format!("`{}`: {}", item, e))))
            .collect::<Result<Vec<_>>>()
            .map(Values::Int32),
        CodecKind::Float64Vector => split(input)
            .map(|item| item.parse::<f64>().map_err(|e| invalid(format!("`{}`: {}", item, e))))
            .collect::<Result<Vec<_>>>()
            .map(Values::Float64),
    }
}

fn split(input: &str) -> impl Iterator<Item = &str> {
    input.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Render decoded values the way they were written on the command line.
pub fn format_values(values: &Values) -> String {
    fn join<T: ToString>(items: &[T]) -> String {
        items.iter().map(T::to_string).collect::<Vec<_>>().join(",")
    }

    match values {
        Values::Opaque(None) => "(none)".to_string(),
        Values::Opaque(Some(value)) => value.to_string(),
        Values::Int32(v) => join(v),
        Values::Float64(v) => join(v),
    }
}

pub fn format_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

/// Outcome of one scatter: results in argument order and the batch timing.
#[derive(Debug)]
pub struct Report {
    pub results: Vec<std::result::Result<Values, CallFailure>>,
    pub batch: Batch,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .results
            .iter()
            .enumerate()
            .map(|(i, result)| match result {
                Ok(values) => format!("[{}] {}", i, format_values(values)),
                Err(failure) => format!("[{}] error: {}", i, failure),
            })
            .collect();

        lines.push(match self.batch.elapsed {
            Some(elapsed) => format!(
                "batch: {} calls in {}",
                self.results.len(),
                format_elapsed(elapsed)
            ),
            None => "batch: no calls".to_string(),
        });
        lines
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0)
}

/// Register `computation` with `pool` and call it once per argument list.
pub async fn scatter(
    pool: &Pool,
    computation: impl Computation,
    kind: CodecKind,
    arg_lists: Vec<Values>,
) -> Result<Report> {
    let dispatcher = pool.register(computation, kind)?;
    info!(
        dispatcher = dispatcher.name(),
        calls = arg_lists.len(),
        capacity = pool.capacity(),
        "scattering calls"
    );

    let pending = arg_lists
        .into_iter()
        .map(|args| dispatcher.call(args))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut results = Vec::with_capacity(pending.len());
    for p in pending {
        let call = p.call_id();
        let result = p.values().await;
        debug!(%call, ok = result.is_ok(), "call resolved");
        results.push(result);
    }

    let batch = pool.idle().await?;
    Ok(Report { results, batch })
}

/// Execute a parsed command line. Returns the process exit code.
pub async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run {
            component,
            codec,
            threads,
            args,
        } => {
            let arg_lists = args
                .iter()
                .map(|a| parse_args(codec, a))
                .collect::<Result<Vec<_>>>()?;

            let mut config = PoolConfig::default();
            if let Some(threads) = threads {
                config = config.threads(threads);
            }

            let computation = WasmComputation::from_file(&component)?;
            let pool = Pool::with_config(config)?;
            let report = scatter(&pool, computation, codec, arg_lists).await?;

            for line in report.lines() {
                println!("{}", line);
            }
            Ok(if report.failures() == 0 { 0 } else { 1 })
        }
        Command::Encode { codec, args } => {
            let values = parse_args(codec, &args)?;
            let message = offload_wire::encode(&values)?;
            println!("{}", format_hex(&message));
            Ok(0)
        }
    }
}
