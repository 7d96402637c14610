mod commands;
mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use packsync::{LoaderKind, Locator, Transport};
use packsync_http::{HttpTransport, HttpTransportConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "packsync")]
#[command(about = "Inspect packwiz packs and look up mod loader versions")]
struct Cli {
    /// Tracing filter, e.g. `debug` or `packsync=trace` (overrides config and RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a pack descriptor and resolve its engine and loader versions
    Inspect {
        /// Pack locator (http://, https://, file://) or a local path
        locator: String,
        /// Only list versions marked stable upstream
        #[arg(long)]
        stable: bool,
    },
    /// List engine versions for a loader, or its loader versions for one engine version
    Versions {
        /// Loader family (fabric, quilt, forge)
        loader: LoaderKind,
        /// Engine version to list loader versions for
        #[arg(long)]
        engine: Option<String>,
        /// Only list versions marked stable upstream
        #[arg(long)]
        stable: bool,
    },
    /// Read locator edits from stdin, one per line, and fetch once they settle
    Watch {
        /// Quiet period in milliseconds (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("invalid log level {level:?}"))?
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_transport(config: &config::AppConfig) -> Result<Arc<dyn Transport>> {
    let transport = HttpTransport::new(HttpTransportConfig {
        timeout: config.timeout(),
        ..HttpTransportConfig::default()
    })
    .context("failed to build HTTP transport")?;
    Ok(Arc::new(transport))
}

/// Accept a locator, or fall back to an existing local path.
fn locator_arg(text: &str) -> Result<Locator> {
    match Locator::parse(text) {
        Ok(locator) => Ok(locator),
        Err(e) if Path::new(text).exists() => {
            let path = std::path::absolute(text)
                .with_context(|| format!("failed to resolve path {text}"))?;
            tracing::debug!(%e, path = %path.display(), "treating argument as a local path");
            Ok(Locator::from_path(&path))
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = config::load_config();
    let app_config = loaded.config;

    init_tracing(cli.log_level.as_deref().or(app_config.log_level.as_deref()))?;
    if let Some(warning) = loaded.warning {
        tracing::warn!("{warning}");
    }

    let transport = build_transport(&app_config)?;
    let endpoints = app_config
        .endpoints
        .to_endpoints()
        .context("invalid endpoint in config")?;

    match cli.command {
        Command::Inspect { locator, stable } => {
            let locator = locator_arg(&locator)?;
            commands::inspect::run(
                transport,
                &endpoints,
                locator,
                stable || app_config.stable_only,
            )
            .await
        }
        Command::Versions {
            loader,
            engine,
            stable,
        } => {
            let provider = loader.provider(transport, &endpoints);
            commands::versions::run(
                provider.as_ref(),
                engine.as_deref(),
                stable || app_config.stable_only,
            )
            .await
        }
        Command::Watch { debounce_ms } => {
            let delay = debounce_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| app_config.debounce());
            commands::watch::run(transport, delay).await
        }
    }
}
