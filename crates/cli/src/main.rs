//! The rlookup binary: incremental reverse-lookup indexer for conda-layout
//! package repositories.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Json};
use rlookup_core::config::AppConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_OK: u8 = 0;
const EXIT_CONFIG_READ: u8 = 1;
const EXIT_CONFIG_DUMP: u8 = 2;
const EXIT_LOGGER_INIT: u8 = 3;
const EXIT_WORKDIR_CREATE: u8 = 4;
const EXIT_BUS_INIT: u8 = 5;
const EXIT_SUBDIR_INDEX: u8 = 6;
const EXIT_PUBLISH: u8 = 7;

/// Incremental reverse-lookup indexer for conda package repositories
#[derive(Parser, Debug)]
#[command(name = "rlookup")]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file in JSON format
    #[arg(short, long, env = "RLOOKUP_CONFIG")]
    config: Option<PathBuf>,

    /// Turn on debug logging (overrides the config file)
    #[arg(long)]
    debug: bool,

    /// Dump the merged configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Only index repodata and skip publishing to the bus
    #[arg(long)]
    skip_kafka: bool,

    /// Only publish to the bus and skip repodata indexing
    #[arg(long)]
    skip_repodata: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("[ERROR] could not read configuration: {err:#}");
            return ExitCode::from(EXIT_CONFIG_READ);
        }
    };
    if args.debug {
        config.debug = true;
    }

    if let Err(err) = init_tracing(config.debug) {
        eprintln!("[ERROR] could not initialize logger: {err}");
        return ExitCode::from(EXIT_LOGGER_INIT);
    }

    if args.dump_config {
        return match serde_json::to_string_pretty(&config) {
            Ok(json) => {
                println!("{json}");
                ExitCode::from(EXIT_OK)
            }
            Err(err) => {
                tracing::error!(error = %err, "could not dump configuration");
                ExitCode::from(EXIT_CONFIG_DUMP)
            }
        };
    }

    tracing::info!("rlookup v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!(workdir = %config.server.workdir.display(), "ensuring working directory");
    if let Err(err) = tokio::fs::create_dir_all(&config.server.workdir).await {
        tracing::error!(
            workdir = %config.server.workdir.display(),
            error = %err,
            "could not create working directory"
        );
        return ExitCode::from(EXIT_WORKDIR_CREATE);
    }

    let bus = if args.skip_kafka {
        tracing::info!("skipping bus initialization because --skip-kafka is set");
        None
    } else {
        tracing::info!("initializing bus producer");
        match rlookup_bus::from_config(&config.bus) {
            Ok(bus) => Some(bus),
            Err(err) => {
                tracing::error!(error = %err, "could not initialize bus producer");
                return ExitCode::from(EXIT_BUS_INIT);
            }
        }
    };

    let source = match rlookup_source::from_config(&config.server) {
        Ok(source) => source,
        Err(err) => {
            tracing::error!(error = %err, "could not initialize file source");
            return ExitCode::from(EXIT_CONFIG_READ);
        }
    };

    let mut index_failures: Vec<String> = Vec::new();
    let mut publish_failures: Vec<String> = Vec::new();

    for channel in config.server.channels.values() {
        tracing::info!(channel = %channel.relative_location, "processing channel");
        for subdir in channel.subdirs.values() {
            tracing::info!(subdir = %subdir.relative_location, "processing subdirectory");

            if args.skip_repodata {
                tracing::info!(
                    subdir = %subdir.relative_location,
                    "skipping repodata indexing because --skip-repodata is set"
                );
            } else if let Err(err) = rlookup_indexer::index_subdir(
                subdir,
                &config.server.workdir,
                &config.server.name,
                source.as_ref(),
            )
            .await
            {
                tracing::error!(
                    subdir = %subdir.relative_location,
                    error = %err,
                    "subdirectory indexing failed"
                );
                index_failures.push(subdir.relative_location.clone());
            }

            match &bus {
                None => {
                    tracing::info!(
                        subdir = %subdir.relative_location,
                        "skipping publish because --skip-kafka is set"
                    );
                }
                Some(bus) => {
                    if let Err(err) = rlookup_indexer::publish_subdir(
                        subdir,
                        &config.server.workdir,
                        bus.as_ref(),
                    )
                    .await
                    {
                        tracing::error!(
                            subdir = %subdir.relative_location,
                            error = %err,
                            "subdirectory publishing failed"
                        );
                        publish_failures.push(subdir.relative_location.clone());
                    }
                }
            }
        }
        tracing::info!(channel = %channel.relative_location, "finished channel");
    }

    let mut code = EXIT_OK;
    if !index_failures.is_empty() {
        tracing::error!(subdirs = ?index_failures, "repodata indexing failed for these subdirectories");
        code = EXIT_SUBDIR_INDEX;
    }
    if !publish_failures.is_empty() {
        tracing::error!(subdirs = ?publish_failures, "publishing failed for these subdirectories");
        code = EXIT_PUBLISH;
    }
    ExitCode::from(code)
}

/// Load and merge configuration: JSON file first, `RLOOKUP_` environment
/// variables on top.
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if let Some(path) = &args.config {
        if !path.exists() {
            anyhow::bail!("config file does not exist: {}", path.display());
        }
        figment = figment.merge(Json::file(path));
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("RLOOKUP_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .bus
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid bus configuration")?;

    Ok(config)
}

fn init_tracing(debug: bool) -> std::result::Result<(), tracing_subscriber::util::TryInitError> {
    let default_filter = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
