use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use climawatch::duration::parse_duration;
use climawatch::{
    drain, export_json, status_lines, IngestOutcome, MessageSource, Pipeline, Settings,
    StreamSource,
};
use climawatch_adapters::{
    render_report, HistoryLogger, LogNotifier, Notification, Notifier, ReportStore,
};
use climawatch_core::{Clock, FileSnapshotStore, PersistPolicy, Persister, SystemClock};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// How often sources are drained.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "climawatch", version)]
#[command(about = "Home weather telemetry: rolling sensor windows, seismic alerts and daily reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a TOML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest readings, persist snapshots and raise alerts
    Run(RunArgs),
    /// Append the latest readings to the history file
    Log(LogArgs),
    /// Print recent daily reports
    Reports(ReportsArgs),
    /// Export saved channel windows to a JSON file
    Export(ExportArgs),
}

/// Where `<topic> <payload>` lines come from (stdin when none is given).
#[derive(Args, Debug)]
#[group(multiple = false)]
struct SourceArgs {
    /// Read lines from stdin (e.g. piped from `mosquitto_sub -v`)
    #[arg(long)]
    stdin: bool,

    /// Replay lines from a file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Connect to a TCP endpoint that streams lines (host:port)
    #[arg(long)]
    connect: Option<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Print a status line per channel at this interval (e.g. "5s")
    #[arg(long)]
    print_every: Option<String>,

    /// Disable the seismic alert
    #[arg(long)]
    no_alerts: bool,
}

#[derive(Args, Debug)]
struct LogArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Delete the history file before logging
    #[arg(long)]
    reset: bool,
}

#[derive(Args, Debug)]
struct ReportsArgs {
    /// Number of days to show, newest first
    #[arg(long, default_value_t = 7)]
    days: u32,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Output JSON file
    path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    debug!(?settings, "settings loaded");

    match cli.command {
        Command::Run(args) => block_on(run(settings, args)),
        Command::Log(args) => block_on(log(settings, args)),
        Command::Reports(args) => print_reports(&settings, args.days),
        Command::Export(args) => export_to_file(&settings, &args.path),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(future)
}

/// Open the configured line source.
async fn open_source(args: &SourceArgs) -> Result<Box<dyn MessageSource>> {
    if let Some(addr) = &args.connect {
        info!(addr, "connecting");
        let stream = tokio::net::TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {}", addr))?;
        return Ok(Box::new(StreamSource::spawn(stream, addr)));
    }

    if let Some(path) = &args.file {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        return Ok(Box::new(StreamSource::spawn(file, &path.display().to_string())));
    }

    Ok(Box::new(StreamSource::spawn(tokio::io::stdin(), "stdin")))
}

/// Callers pass non-zero periods; settings reject zero at load time.
fn optional_interval(every: Option<Duration>) -> Option<tokio::time::Interval> {
    every.map(|d| {
        let mut timer = tokio::time::interval(d);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        timer
    })
}

/// Tick an optional timer; pending forever when there is none.
async fn tick(timer: &mut Option<tokio::time::Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Ingest until the source ends or Ctrl-C.
async fn run(settings: Settings, args: RunArgs) -> Result<()> {
    let registry = Arc::new(settings.build_registry()?);
    let store = Arc::new(FileSnapshotStore::new(&settings.storage.snapshot_dir));
    let restored = registry.restore_all(&*store);
    info!(
        channels = registry.len(),
        samples = restored,
        dir = %settings.storage.snapshot_dir.display(),
        "restored snapshots"
    );

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let persister = Persister::new(registry.clone(), store);
    let policy = settings.persist_policy()?;

    let mut pipeline =
        Pipeline::new(registry.clone(), notifier.clone()).with_persister(persister.clone(), policy);
    if settings.alert.enabled && !args.no_alerts {
        pipeline = pipeline.with_alert(&settings.alert.channel, settings.alert_debouncer()?)?;
    }

    let persist_task = match policy {
        PersistPolicy::Interval(every) => Some(persister.start(every)?),
        PersistPolicy::EveryPush => None,
    };

    let mut source = open_source(&args.source).await?;
    info!(source = source.description(), "ingesting");

    let reports = ReportStore::new(&settings.reports.dir, settings.offset()?);
    let clock = SystemClock;

    let mut poll_timer = tokio::time::interval(POLL_INTERVAL);
    let mut report_timer =
        optional_interval(settings.reports.notify.then(|| settings.notify_interval()).transpose()?);
    let print_every = args.print_every.as_deref().map(parse_duration).transpose()?;
    if print_every.is_some_and(|d| d.is_zero()) {
        bail!("--print-every must be greater than zero");
    }
    let mut print_timer = optional_interval(print_every);

    loop {
        tokio::select! {
            _ = poll_timer.tick() => {
                drain(source.as_mut(), &pipeline, |_| {});
                if source.is_closed() {
                    info!(reason = ?source.error(), "source ended");
                    break;
                }
            }
            _ = tick(&mut report_timer) => {
                notify_report(&reports, notifier.as_ref(), clock.now_ms());
            }
            _ = tick(&mut print_timer) => {
                for line in status_lines(&registry, pipeline.stats()) {
                    println!("{}", line);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    match persist_task {
        Some(task) => task.shutdown().await,
        // Catch any every-push save still queued on the blocking pool
        None => {
            persister.save_all();
        }
    }
    let stats = pipeline.stats();
    info!(routed = stats.routed, dropped = stats.dropped, alerts = stats.alerts, "stopped");
    Ok(())
}

/// Send the weather notification for today's report, if there is one.
fn notify_report(reports: &ReportStore, notifier: &dyn Notifier, now_ms: i64) {
    match reports.today(now_ms) {
        Ok(report) => {
            if let Err(e) = notifier.notify(&Notification::weather_report(&report)) {
                warn!(error = %e, "weather notification failed");
            }
        }
        Err(e) => warn!(error = %e, "no weather report to send"),
    }
}

/// Record the latest reading of each channel to the history file.
async fn log(settings: Settings, args: LogArgs) -> Result<()> {
    let registry = Arc::new(settings.build_registry()?);
    let pipeline = Pipeline::new(registry, Arc::new(LogNotifier));

    let mut logger = HistoryLogger::new(
        &settings.history.path,
        settings.offset()?,
        &settings.history_channels(),
    );
    if args.reset {
        logger.reset()?;
        info!(path = %logger.path().display(), "history file reset");
    }

    let mut source = open_source(&args.source).await?;
    info!(source = source.description(), path = %logger.path().display(), "logging");

    let clock = SystemClock;
    let mut poll_timer = tokio::time::interval(POLL_INTERVAL);
    let mut log_timer = optional_interval(Some(settings.history_interval()?));

    loop {
        tokio::select! {
            _ = poll_timer.tick() => {
                drain(source.as_mut(), &pipeline, |outcome| {
                    if let IngestOutcome::Routed { channel, sample, .. } = outcome {
                        logger.record(channel, sample.value);
                    }
                });
                if source.is_closed() {
                    info!(reason = ?source.error(), "source ended");
                    break;
                }
            }
            _ = tick(&mut log_timer) => {
                if let Err(e) = logger.append(clock.now_ms()) {
                    warn!(error = %e, "history append failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    // Flush the last readings
    if let Err(e) = logger.append(clock.now_ms()) {
        warn!(error = %e, "history append failed");
    }
    Ok(())
}

fn print_reports(settings: &Settings, days: u32) -> Result<()> {
    let store = ReportStore::new(&settings.reports.dir, settings.offset()?);

    for (date, report) in store.recent(SystemClock.now_ms(), days) {
        println!("{}", render_report(date, report.as_ref()));
    }
    Ok(())
}

/// Export saved channel windows to a JSON file
fn export_to_file(settings: &Settings, export_path: &Path) -> Result<()> {
    use std::io::Write;

    let registry = settings.build_registry()?;
    let store = FileSnapshotStore::new(&settings.storage.snapshot_dir);
    registry.restore_all(&store);

    let json = serde_json::to_string_pretty(&export_json(&registry, SystemClock.now_ms()))?;
    let mut file = std::fs::File::create(export_path)?;
    file.write_all(json.as_bytes())?;

    println!("Exported channel windows to: {}", export_path.display());
    Ok(())
}
