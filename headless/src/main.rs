mod config;

use clap::{Args, Parser, Subcommand};
use config::{CommonConfig, Config, LoggingConfig, MetricsConfig};
use sentry::integrations::tracing as sentry_tracing;
use shared::metrics_defs::MetricType;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_LEVEL: &str = "info";
const METRICS_PREFIX: &str = "headless";

#[derive(Parser)]
#[command(name = "headless", about = "Proxy for headless site projects")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the headless routes
    Run(ConfigArgs),
    /// Load and validate a config file, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config_file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Run(args) => run(&args.config_file),
        CliCommand::CheckConfig(args) => match Config::from_file(&args.config_file) {
            Ok(_) => {
                println!("{}: ok", args.config_file.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {e}", args.config_file.display());
                ExitCode::FAILURE
            }
        },
    }
}

fn run(config_file: &std::path::Path) -> ExitCode {
    let config = match Config::from_file(config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", config_file.display());
            return ExitCode::FAILURE;
        }
    };

    let _sentry_guard = init_logging(&config.common);

    if let Some(metrics_config) = &config.common.metrics
        && let Err(e) = init_metrics(metrics_config)
    {
        tracing::error!(error = %e, "Failed to install statsd recorder");
        return ExitCode::FAILURE;
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        host = %config.router.listener.host,
        port = config.router.listener.port,
        "Starting headless"
    );
    match rt.block_on(member_router::run(config.router)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "headless stopped");
            ExitCode::FAILURE
        }
    }
}

/// Installs the fmt subscriber, plus the sentry layer when a DSN is configured.
fn init_logging(common: &CommonConfig) -> Option<sentry::ClientInitGuard> {
    let logging = common.logging.as_ref();
    let default_level = logging
        .and_then(|l| l.level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let guard = logging.and_then(init_sentry);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            guard
                .is_some()
                .then(|| sentry_tracing::layer().event_filter(sentry_event_filter)),
        )
        .init();

    guard
}

fn init_sentry(logging: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = logging.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    )))
}

fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_metrics(config: &MetricsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let recorder = metrics_exporter_statsd::StatsdBuilder::from(&config.statsd_host, config.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|e| e.to_string())?;

    for def in member_router::metrics_defs::ALL_METRICS
        .iter()
        .chain(projects::metrics_defs::ALL_METRICS)
    {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Gauge => metrics::describe_gauge!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }
    Ok(())
}
