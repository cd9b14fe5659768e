//! NetPulse - internet reachability monitor
//!
//! Probes a few well-known hosts every second, keeps daily uptime and latency
//! statistics, and reports outages and summaries through Telegram.

mod alerts;
mod config;
mod logging;
mod monitoring;
mod output;
mod probe;
mod scheduler;
mod storage;

use alerts::{AlertSink, LogAlerts, TelegramAlerts};
use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use monitoring::{MonitorLoop, StateTracker};
use output::ReportFile;
use scheduler::ReportScheduler;
use stats::ReportPeriod;
use std::path::PathBuf;
use std::sync::Arc;
use storage::Database;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "netpulse")]
#[command(version)]
#[command(about = "Internet uptime and latency monitor with Telegram alerts", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "netpulse.toml")]
    config: PathBuf,

    /// Send a test message through the alert channel and exit
    #[arg(long)]
    test_alert: bool,

    /// Generate a weekly or monthly report now and exit
    #[arg(long, value_enum)]
    report: Option<ReportArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ReportArg {
    Weekly,
    Monthly,
}

impl From<ReportArg> for ReportPeriod {
    fn from(arg: ReportArg) -> Self {
        match arg {
            ReportArg::Weekly => ReportPeriod::Weekly,
            ReportArg::Monthly => ReportPeriod::Monthly,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Fatal: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = config::Config::load(&args.config)?;
    logging::init(&config.logging)?;

    info!("NetPulse v{}", env!("CARGO_PKG_VERSION"));
    if args.config.exists() {
        info!("Loaded configuration from {:?}", args.config);
    } else {
        warn!("Configuration file {:?} not found, using defaults", args.config);
    }

    let alerts = build_alerts(&config).await?;

    if args.test_alert {
        alerts
            .deliver("✅ NetPulse test alert")
            .await
            .context("Test alert failed")?;
        info!("Test alert delivered");
        return Ok(());
    }

    let db = Arc::new(Database::new(&config.general.database_path));
    db.initialize().context("Failed to initialize database")?;
    info!("Database: {:?}", config.general.database_path);

    let targets = probe::resolve_targets(&config.monitor.hosts)?;
    let stats = monitoring::shared_stats(&targets, config.monitor.high_ping_threshold_ms);

    let scheduler = ReportScheduler::new(
        config.schedule()?,
        stats.clone(),
        db.clone(),
        alerts.clone(),
        ReportFile::new(&config.general.report_log_path),
    );

    if let Some(report) = args.report {
        let period = ReportPeriod::from(report);
        if !scheduler
            .send_aggregate_report(period, Local::now().date_naive())
            .await
        {
            info!("No {} data to report", period.title());
        }
        return Ok(());
    }

    scheduler
        .check_heartbeat_gap(Local::now().naive_local(), config.heartbeat_gap_threshold())
        .await;

    let prober = probe::build_prober(config.monitor.probe_method)?;

    let tracker = Arc::new(StateTracker::new(
        config.monitor.high_ping_threshold_ms,
        alerts.clone(),
        db.clone(),
    ));

    let monitor = MonitorLoop::new(
        targets,
        prober,
        stats,
        tracker,
        config.ping_interval(),
        config.ping_timeout(),
    );

    alerts.send("🚀 NetPulse monitoring started").await;
    info!("Starting monitoring (Press Ctrl+C to stop)");

    tokio::try_join!(monitor.run(), scheduler.run())?;

    Ok(())
}

async fn build_alerts(config: &config::Config) -> Result<Arc<dyn AlertSink>> {
    match &config.telegram {
        Some(telegram) => {
            let sink = TelegramAlerts::new(telegram)?;
            if let Err(e) = sink.verify().await {
                warn!("Telegram bot verification failed: {}", e);
            }
            Ok(Arc::new(sink))
        }
        None => {
            info!("No [telegram] section configured, alerts go to the log");
            Ok(Arc::new(LogAlerts))
        }
    }
}
