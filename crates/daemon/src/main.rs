// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keepsake Daemon (ksd)
//!
//! Background process that turns schedule declarations into cron entries
//! and runs the jobs they fire, one repository-safe admission at a time.
//!
//! Architecture:
//! - Observer loop: spawned task applying job lifecycle events
//! - Dispatcher: spawned task admitting queued jobs every dispatch tick
//! - Main loop: scheduler tick, declaration resync and signals

use std::sync::Arc;
use std::time::Duration;

use ks_core::{SystemClock, UuidIdGen};
use ks_daemon::lifecycle::{self, LifecycleError};
use ks_daemon::{
    ActivityReport, CommandLauncher, Config, Daemon, FileDeclarations, JobHistory, SCHEDULER_TICK,
};
use ks_engine::{
    spawn_dispatcher, AdmissionQueue, JobMaterializer, KindMaterializer, Observer,
    ScheduleResolver, Scheduler,
};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// How long shutdown waits for the dispatcher to finish its tick
const DISPATCHER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How often queue depth and job outcomes are logged
const ACTIVITY_REPORT_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ksd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ksd {}", env!("CARGO_PKG_VERSION"));
                println!("Keepsake Daemon - schedules backup, check and prune jobs per repository");
                println!();
                println!("USAGE:");
                println!("    ksd");
                println!();
                println!("State lives in $KS_STATE_DIR (default ~/.local/state/keepsake).");
                println!("Schedules are read from schedules.toml there, or $KS_DECLARATIONS.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ksd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Written before tracing starts so a failed start is still findable
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!("Starting keepsake daemon");

    let state = match lifecycle::startup(&config) {
        Ok(state) => state,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("ksd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Tracing is non-blocking and may not flush before exit
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let (observer, event_loop) = Observer::new();
    tokio::spawn(event_loop.run());

    let history = Arc::new(JobHistory::new(Arc::clone(&observer), config.history));
    let launcher = Arc::new(
        CommandLauncher::new(
            tokio::runtime::Handle::current(),
            Arc::clone(&observer),
            Arc::clone(&history),
            SystemClock,
        )
        .with_timeouts(config.timeouts.clone()),
    );
    let materializer: Arc<dyn JobMaterializer> =
        Arc::new(KindMaterializer::new(launcher.clone(), UuidIdGen));

    let queue = Arc::new(
        AdmissionQueue::new(Arc::clone(&observer))
            .with_concurrency_limits(config.concurrency.clone()),
    );
    let resolver = Arc::new(ScheduleResolver::new(
        state.store.clone(),
        config.admin_namespace.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(resolver, Arc::clone(&queue), SystemClock));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = spawn_dispatcher(Arc::clone(&queue), config.dispatch_interval, shutdown_rx);

    let daemon = Daemon::new(
        scheduler,
        materializer,
        launcher,
        history,
        Box::new(FileDeclarations::new(config.declarations_path.clone())),
    );

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        state_dir = %config.state_dir.display(),
        declarations = %config.declarations_path.display(),
        admin_namespace = %config.admin_namespace,
        "Daemon ready"
    );

    // NOTE: Intervals must be created outside the loop; tokio::select!
    // re-evaluates branches on each iteration.
    let mut scheduler_tick = tokio::time::interval(SCHEDULER_TICK);
    // First tick completes immediately, which performs the initial sync
    let mut resync = tokio::time::interval(config.resync_interval);
    let mut activity = tokio::time::interval_at(
        tokio::time::Instant::now() + ACTIVITY_REPORT_INTERVAL,
        ACTIVITY_REPORT_INTERVAL,
    );

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }

            _ = scheduler_tick.tick() => {
                let queued = daemon.tick();
                if queued > 0 {
                    info!(queued, queue_depth = queue.len(), "scheduled jobs fired");
                }
            }

            _ = resync.tick() => {
                if let Err(e) = daemon.resync().await {
                    error!("Failed to load declarations: {}", e);
                }
            }

            _ = activity.tick() => {
                ActivityReport::collect(&queue, &observer).log();
            }
        }
    }

    // Jobs still queued are dropped; their schedules fire again later
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(DISPATCHER_STOP_TIMEOUT, dispatcher)
        .await
        .is_err()
    {
        warn!("dispatcher did not stop in time");
    }
    if !queue.is_empty() {
        info!(dropped = queue.len(), "dropping queued jobs on shutdown");
    }

    state.shutdown()?;
    info!("Daemon stopped");
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- ksd: starting (pid: 12345)"
pub const STARTUP_MARKER_PREFIX: &str = "--- ksd: starting (pid: ";

/// Append the startup marker to the log file
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{})", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
