//! ---
//! devreg_section: "01-core-functionality"
//! devreg_subsection: "binary"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Binary entrypoint for the device registry daemon."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use devreg_api::{spawn_api_server, ApiState};
use devreg_common::{init_tracing, AppConfig, StorageBackend, StorageConfig};
use devreg_core::{DeviceStore, InMemoryDeviceStore, RegistryService};
use devreg_persistence::{FileDeviceStore, PersistenceMetrics};
use prometheus::Registry;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "configs/devregd.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("devregd ", env!("CARGO_PKG_VERSION")),
    about = "Network device registry daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the API listen address")]
    listen: Option<SocketAddr>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Use the file store at this snapshot path (.json or .cbor)"
    )]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Serve the registry API until interrupted")]
    Run,
    #[command(about = "Print the topology stored in the snapshot and exit")]
    Topology {
        #[arg(help = "Only print the tree below this MAC address")]
        mac: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let candidates = [PathBuf::from(DEFAULT_CONFIG_PATH)];
    let loaded = AppConfig::load_with_override(cli.config.as_deref(), &candidates)?;
    let mut config = loaded.config;
    if let Some(listen) = cli.listen {
        config.api.listen = listen;
    }
    if let Some(path) = cli.data {
        config.storage = StorageConfig {
            backend: StorageBackend::File,
            path: Some(path),
        };
        config.validate()?;
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_tracing("devregd", &config.logging)?;
            match &loaded.source {
                Some(path) => info!(config_path = %path.display(), "configuration loaded"),
                None => info!("no configuration file found; running with defaults"),
            }
            run_daemon(config).await
        }
        Commands::Topology { mac } => {
            // Stdout carries the JSON document; diagnostics go to stderr.
            devreg_logging::init();
            print_topology(&config.storage, mac.as_deref())
        }
    }
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let registry = if config.metrics.enabled {
        Some(Arc::new(Registry::new()))
    } else {
        info!("metrics disabled by configuration");
        None
    };

    let store = open_store(&config.storage, registry.clone())?;
    let service = RegistryService::new(store);
    let mut state = ApiState::new(service);
    if let Some(registry) = registry {
        state = state.with_metrics_registry(registry)?;
    }

    let server = spawn_api_server(Arc::new(state), config.api.listen)?;
    info!(address = %server.addr(), "device registry running; waiting for termination signal");

    shutdown_signal().await;
    info!("shutdown signal received; stopping api server");
    server.shutdown().await?;
    Ok(())
}

fn open_store(
    storage: &StorageConfig,
    registry: Option<Arc<Registry>>,
) -> Result<Arc<dyn DeviceStore>> {
    match storage.backend {
        StorageBackend::Memory => {
            warn!("memory store selected; registrations are lost on restart");
            Ok(Arc::new(InMemoryDeviceStore::new()))
        }
        StorageBackend::File => {
            let path = storage
                .path
                .clone()
                .context("storage backend 'file' requires a path")?;
            let metrics = registry.map(PersistenceMetrics::new).transpose()?;
            let store = FileDeviceStore::open_with_metrics(&path, metrics)
                .with_context(|| format!("failed to open device snapshot {}", path.display()))?;
            Ok(Arc::new(store))
        }
    }
}

fn print_topology(storage: &StorageConfig, mac: Option<&str>) -> Result<()> {
    let store = open_store(storage, None)?;
    let service = RegistryService::new(store);
    let rendered = match mac {
        Some(mac) => serde_json::to_string_pretty(&service.topology_from(mac)?)?,
        None => serde_json::to_string_pretty(&service.full_topology()?)?,
    };
    println!("{rendered}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
