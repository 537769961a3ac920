//! `repro` - record, list, show and verify reproducible experiments.
//!
//! ```text
//! repro mandelbrot -2.0 1.0 -1.5 1.5 64
//! repro list
//! repro show 3f2a
//! repro verify 3f2a --reproduce
//! ```
//!
//! Log output is controlled with `RUST_LOG` (default `repro_store=info`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use repro_store::container::ResultsContainer;
use repro_store::experiment::RecordStore;
use repro_store::mandelbrot::{
    MandelbrotExperiment, MandelbrotParams, DEFAULT_MAX_ITERATIONS, DEFAULT_THRESHOLD,
};
use repro_store::runner::ExperimentRunner;
use repro_store::verify::{self, Reproduction};
use repro_store::Backend;

#[derive(Parser, Debug)]
#[command(name = "repro", version, about = "Reproducible experiment records")]
struct Cli {
    /// Results container file.
    #[arg(long, global = true, default_value = "mandelbrot.json")]
    container: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the Mandelbrot stability grid and record it.
    Mandelbrot(MandelbrotArgs),
    /// List the records in the container.
    List,
    /// Print one record as JSON.
    Show(ShowArgs),
    /// Verify a record's checksums, optionally by re-running it.
    Verify(VerifyArgs),
}

#[derive(ClapArgs, Debug)]
struct MandelbrotArgs {
    /// Real axis minimum.
    #[arg(allow_negative_numbers = true)]
    re_min: f64,
    /// Real axis maximum.
    #[arg(allow_negative_numbers = true)]
    re_max: f64,
    /// Imaginary axis minimum.
    #[arg(allow_negative_numbers = true)]
    im_min: f64,
    /// Imaginary axis maximum.
    #[arg(allow_negative_numbers = true)]
    im_max: f64,
    /// Number of points along each direction in the complex plane grid.
    num_points: usize,
    /// Iteration budget per point.
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: u32,
    /// Escape threshold on |z|.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,
    /// Worker threads (defaults to one per logical CPU).
    #[arg(long, conflicts_with = "sequential")]
    workers: Option<usize>,
    /// Evaluate on a single thread.
    #[arg(long)]
    sequential: bool,
    /// Extra annotation stored with the record.
    #[arg(long = "annotate", value_name = "KEY=VALUE", value_parser = parse_annotation)]
    annotations: Vec<(String, String)>,
}

#[derive(ClapArgs, Debug)]
struct ShowArgs {
    /// Record id or unique prefix.
    id: String,
    /// Print only the summary line.
    #[arg(long)]
    summary: bool,
}

#[derive(ClapArgs, Debug)]
struct VerifyArgs {
    /// Record id or unique prefix.
    id: String,
    /// Re-run the experiment and compare outputs bit-for-bit.
    #[arg(long)]
    reproduce: bool,
    /// Re-run on a single thread.
    #[arg(long, requires = "reproduce")]
    sequential: bool,
}

fn parse_annotation(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("repro_store=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Mandelbrot(args) => record_mandelbrot(&cli.container, args),
        Command::List => list(&cli.container),
        Command::Show(args) => show(&cli.container, &args),
        Command::Verify(args) => verify_record(&cli.container, &args),
    }
}

fn backend(sequential: bool, workers: Option<usize>) -> Backend {
    if sequential {
        Backend::Sequential
    } else {
        Backend::Parallel { workers }
    }
}

fn record_mandelbrot(container: &Path, args: MandelbrotArgs) -> anyhow::Result<ExitCode> {
    let params = MandelbrotParams::new(
        args.re_min,
        args.re_max,
        args.im_min,
        args.im_max,
        args.num_points,
    )
    .with_max_iterations(args.max_iterations)
    .with_threshold(args.threshold);
    let experiment = MandelbrotExperiment::new(params).context("invalid simulation parameters")?;

    let mut builder = ExperimentRunner::builder().backend(backend(args.sequential, args.workers));
    // The running executable defines the computation
    if let Ok(exe) = std::env::current_exe() {
        builder = builder.checksum_file(exe);
    }
    for (key, value) in args.annotations {
        builder = builder.annotation(key, serde_json::Value::String(value));
    }
    let runner = builder.build()?;

    let mut store = ResultsContainer::open_or_create(container)
        .with_context(|| format!("cannot open results container {}", container.display()))?;
    tracing::info!(
        container = %container.display(),
        tasks = params.total_points(),
        "running Mandelbrot simulation"
    );

    let record_id = runner
        .run(&experiment, &mut store)
        .context("failed to record Mandelbrot simulation")?;
    println!("{record_id}");
    Ok(ExitCode::SUCCESS)
}

fn list(container: &Path) -> anyhow::Result<ExitCode> {
    let store = ResultsContainer::open(container)
        .with_context(|| format!("cannot open results container {}", container.display()))?;
    for summary in store.summaries()? {
        println!(
            "{}  {}  {:<12} {:?}  outputs={}",
            summary.record_id,
            summary.created_at.to_rfc3339(),
            summary.name,
            summary.status,
            summary.outputs
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn show(container: &Path, args: &ShowArgs) -> anyhow::Result<ExitCode> {
    let store = ResultsContainer::open(container)
        .with_context(|| format!("cannot open results container {}", container.display()))?;
    let record_id = store.resolve_prefix(&args.id)?;
    let record = store.get(record_id)?;

    if args.summary {
        let summary = repro_store::container::RecordSummary::from(&record);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(ExitCode::SUCCESS)
}

fn verify_record(container: &Path, args: &VerifyArgs) -> anyhow::Result<ExitCode> {
    let store = ResultsContainer::open(container)
        .with_context(|| format!("cannot open results container {}", container.display()))?;
    let record_id = store.resolve_prefix(&args.id)?;
    let record = store.get(record_id)?;

    let report = if args.reproduce {
        let experiment = MandelbrotExperiment::from_record(&record)
            .context("only Mandelbrot records can be re-run")?;
        verify::reproduce(&record, &experiment, backend(args.sequential, None))?
    } else {
        verify::verify_checksums(&record)
    };

    for check in &report.artifacts {
        let checksum = if check.checksum_ok { "ok" } else { "MISMATCH" };
        let rerun = match &check.reproduction {
            None => String::new(),
            Some(Reproduction::Identical) => "  rerun=identical".to_string(),
            Some(Reproduction::Missing) => "  rerun=missing".to_string(),
            Some(Reproduction::ShapeMismatch { stored, recomputed }) => {
                format!("  rerun=shape {stored:?} != {recomputed:?}")
            }
            Some(Reproduction::LengthMismatch { stored, recomputed }) => {
                format!("  rerun={stored} stored values != {recomputed} recomputed")
            }
            Some(Reproduction::ValueMismatch {
                differing,
                max_abs_diff,
            }) => format!("  rerun={differing} values differ (max |diff| {max_abs_diff:e})"),
        };
        println!("{}  checksum={checksum}{rerun}", check.key);
    }
    for key in &report.unexpected_outputs {
        println!("{key}  unexpected output on re-run");
    }

    if report.passed() {
        println!("record {} verified", report.record_id);
        Ok(ExitCode::SUCCESS)
    } else {
        println!("record {} FAILED verification", report.record_id);
        Ok(ExitCode::FAILURE)
    }
}
