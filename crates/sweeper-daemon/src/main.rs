//! Storage Sage daemon entrypoint: wires configuration into the Scanner,
//! Cleaner, and Scheduler, exposes the health/metrics router, and handles
//! OS signals for graceful shutdown, manual trigger, and config reload.

mod signals;
mod wiring;

use clap::Parser;
use futures::StreamExt;
use std::path::PathBuf;
use std::process::ExitCode;
use sweeper_observability::CycleControl;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CONFIG_PATH: &str = "/etc/storage-sage/config.yaml";

/// Storage Sage: filesystem-cleanup daemon.
#[derive(Parser)]
#[command(name = "sweeper-daemon")]
#[command(about = "Storage Sage cleanup daemon", long_about = None)]
struct Cli {
    /// Path to the configuration file (YAML or TOML).
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run every candidate through the Cleaner's dry-run contract: validate
    /// and audit, but never delete.
    #[arg(long)]
    dry_run: bool,

    /// Run exactly one cycle and exit, instead of looping on the configured
    /// interval.
    #[arg(long)]
    once: bool,
}

/// `invalid_config` exit code (sysexits.h `EX_CONFIG`).
const EXIT_INVALID_CONFIG: u8 = 78;
/// `runtime_error` exit code.
const EXIT_RUNTIME_ERROR: u8 = 1;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    runtime.block_on(run(cli))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already set");
    }
}

async fn run(cli: Cli) -> ExitCode {
    info!(path = %cli.config.display(), "loading configuration");

    let config = match sweeper_config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitCode::from(EXIT_INVALID_CONFIG);
        }
    };

    let components = match wiring::build(&config, cli.dry_run).await {
        Ok(components) => components,
        Err(e) => {
            error!(error = %e, "failed to initialize components");
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    if cli.once {
        return match components.scheduler.run_cycle().await {
            Ok(outcome) => {
                info!(
                    deleted = outcome.success_count,
                    freed_bytes = outcome.total_freed,
                    errors = outcome.error_count,
                    "one-shot cycle complete"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "one-shot cycle failed");
                ExitCode::from(EXIT_RUNTIME_ERROR)
            }
        };
    }

    let readiness = components.readiness.clone();
    let handle = components.scheduler.spawn(move || readiness.mark_ready());

    let control = std::sync::Arc::new(wiring::DaemonControl { scheduler: handle.control(), config_path: cli.config.clone() });

    let health_state = sweeper_observability::HealthState::with_readiness_checker(
        components.metrics.clone(),
        components.readiness.clone() as std::sync::Arc<dyn sweeper_observability::ReadinessChecker>,
    )
    .with_control(control.clone() as std::sync::Arc<dyn sweeper_observability::CycleControl>);
    let router = sweeper_observability::health_router(health_state);

    let listener = match tokio::net::TcpListener::bind(components.health_bind_addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %components.health_bind_addr, "failed to bind health listener");
            handle.shutdown().await;
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };
    info!(addr = %components.health_bind_addr, "health/metrics endpoint listening");

    let axum_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "health server exited unexpectedly");
        }
    });

    let mut signals = match signals::Signals::install() {
        Ok(signals) => signals,
        Err(e) => {
            error!(error = %e, "failed to install signal handlers");
            handle.shutdown().await;
            axum_task.abort();
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    let config_path = cli.config.clone();
    let watch_stream = sweeper_config::watch(&config_path);
    tokio::pin!(watch_stream);

    loop {
        tokio::select! {
            _ = signals.interrupt.recv() => {
                info!("SIGINT received, shutting down");
                break;
            }
            _ = signals.terminate.recv() => {
                info!("SIGTERM received, shutting down");
                break;
            }
            _ = signals.trigger.recv() => {
                info!("manual-trigger signal received");
                handle.trigger();
            }
            _ = signals.reload.recv() => {
                info!("reload signal received, forcing an immediate re-read of the configuration file");
                control.reload();
            }
            Some(result) = watch_stream.next() => {
                match result {
                    Ok(config) => {
                        info!("configuration file changed, reloading rule set");
                        handle.reload(config.effective_rules());
                    }
                    Err(e) => warn!(error = %e, "configuration watch event ignored: file is invalid"),
                }
            }
        }
    }

    handle.shutdown().await;
    axum_task.abort();
    ExitCode::SUCCESS
}
