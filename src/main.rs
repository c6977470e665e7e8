use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use darweb_core_types::{DaeRecord, ExecutionOutcome, ProcessKind, RefPeriod};
use portal_adapter::BrowserSession;
use serde::Serialize;
use submit_flow::{BatchRunner, SelectorProfile};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use darweb_cli::config::AppConfig;
use darweb_cli::input;

#[derive(Parser)]
#[command(
    name = "darweb",
    version,
    about = "Batch submission of ICMS payment declarations to the SEFAZ-PI DAR Web portal"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a submission batch from a normalized record file
    Run(RunArgs),
    /// Load a record file and show what would be submitted
    Inspect(InspectArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Normalized record file (.csv with headers, or a .json array)
    #[arg(long)]
    records: PathBuf,

    /// Tax process variant
    #[arg(long, value_enum)]
    process: ProcessArg,

    /// Reference month (1-12)
    #[arg(long)]
    month: u32,

    /// Reference year (4 digits)
    #[arg(long)]
    year: i32,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Pause between records, e.g. "10s" or "2m"
    #[arg(long, default_value = "10s")]
    delay: String,

    /// Retry a step once on transient timeouts before failing the record
    #[arg(long)]
    retry_transient: bool,

    /// Directory for failure screenshots
    #[arg(long, env = "DARWEB_CAPTURE_DIR", default_value = "captures")]
    capture_dir: PathBuf,

    /// Directory for run reports
    #[arg(long, env = "DARWEB_RESULTS_DIR", default_value = "results")]
    results_dir: PathBuf,

    /// Explicit chrome/chromium binary (autodetected when omitted)
    #[arg(long, env = "DARWEB_CHROME")]
    chrome: Option<PathBuf>,
}

#[derive(Args)]
struct InspectArgs {
    /// Normalized record file (.csv with headers, or a .json array)
    #[arg(long)]
    records: PathBuf,

    /// Reference month (1-12)
    #[arg(long)]
    month: u32,

    /// Reference year (4 digits)
    #[arg(long)]
    year: i32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProcessArg {
    /// ICMS Antecipação Parcial (113011)
    Atc,
    /// ICMS Apuração Normal (113000)
    Normal,
    /// ICMS DIFAL (113001)
    Difal,
}

impl ProcessArg {
    fn kind(self) -> ProcessKind {
        match self {
            ProcessArg::Atc => ProcessKind::AntecipacaoParcial,
            ProcessArg::Normal => ProcessKind::Normal,
            ProcessArg::Difal => ProcessKind::Difal,
        }
    }
}

/// Run report persisted next to the batch results.
#[derive(Serialize)]
struct RunReport {
    process: ProcessKind,
    period: String,
    finished_at: chrono::DateTime<Utc>,
    outcome: ExecutionOutcome,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing();

    let result = match cli.command {
        Commands::Run(args) => run_batch(args).await,
        Commands::Inspect(args) => inspect(args),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "darweb.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    guard
}

async fn run_batch(args: RunArgs) -> Result<ExitCode> {
    let period = RefPeriod::new(args.month, args.year).context("invalid reference period")?;
    let delay = humantime::parse_duration(&args.delay)
        .with_context(|| format!("invalid --delay '{}'", args.delay))?;

    let config = AppConfig::resolve(
        args.headless,
        args.chrome,
        args.capture_dir,
        args.results_dir,
        delay,
        args.retry_transient,
    );

    let records = input::load_records(&args.records, period)
        .with_context(|| format!("failed to load {}", args.records.display()))?;
    if records.is_empty() {
        warn!("no records to process in the input file");
        return Ok(ExitCode::SUCCESS);
    }

    let executable = records.iter().filter(|r| r.is_executable()).count();
    let process = args.process.kind();
    info!(
        %process,
        period = %period,
        total = records.len(),
        executable,
        skipped = records.len() - executable,
        headless = config.session.headless,
        "starting submission batch"
    );

    let session = BrowserSession::launch(&config.session)
        .await
        .context("unable to launch the browser session")?;
    let page = session
        .open_page("about:blank")
        .await
        .context("unable to open the portal page")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("cancellation requested, finishing the in-flight step");
                cancel.cancel();
            }
        });
    }

    let profile = SelectorProfile::for_process(process);
    let runner = BatchRunner::new(&page, &profile, &config.flow, config.delay_between, cancel);
    let outcome = runner.run(&records).await;

    session.close().await;

    let report_path = write_report(&config.results_dir, process, period, &outcome)?;
    print_summary(&outcome);
    info!(report = %report_path.display(), "run report written");

    Ok(if outcome.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn inspect(args: InspectArgs) -> Result<ExitCode> {
    let period = RefPeriod::new(args.month, args.year).context("invalid reference period")?;
    let records = input::load_records(&args.records, period)
        .with_context(|| format!("failed to load {}", args.records.display()))?;

    println!("Period {period} — {} record(s)", records.len());
    println!("{:>4}  {:>14}  {:>14}  Status", "#", "IE", "Value");
    for (index, record) in records.iter().enumerate() {
        println!(
            "{:>4}  {:>14}  {:>14}  {}",
            index + 1,
            record.ie,
            display_value(record),
            if record.is_executable() {
                "executable"
            } else {
                "skipped"
            }
        );
    }

    let executable = records.iter().filter(|r| r.is_executable()).count();
    println!(
        "\n{executable} executable, {} skipped",
        records.len() - executable
    );
    Ok(ExitCode::SUCCESS)
}

fn display_value(record: &DaeRecord) -> String {
    match record.principal_value {
        Some(value) if record.is_executable() => format!("{value:.2}"),
        _ => "—".to_string(),
    }
}

fn write_report(
    results_dir: &Path,
    process: ProcessKind,
    period: RefPeriod,
    outcome: &ExecutionOutcome,
) -> Result<PathBuf> {
    std::fs::create_dir_all(results_dir)
        .with_context(|| format!("failed to create {}", results_dir.display()))?;

    let report = RunReport {
        process,
        period: period.formatted(),
        finished_at: Utc::now(),
        outcome: outcome.clone(),
    };
    let path = results_dir.join(format!(
        "outcome_{}.json",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    let body = serde_json::to_string_pretty(&report)?;
    std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn print_summary(outcome: &ExecutionOutcome) {
    println!(
        "\nFinished: {} succeeded, {} failed, {} skipped",
        outcome.succeeded.len(),
        outcome.failed.len(),
        outcome.skipped.len()
    );
    if !outcome.succeeded.is_empty() {
        println!("  Succeeded: {}", outcome.succeeded.join(", "));
    }
    for failed in &outcome.failed {
        println!("  Failed {}: {}", failed.ie, failed.reason);
    }
}
