use anyhow::Context;
use clap::{Parser, Subcommand};
use rw_collector::StatProjector;
use rw_core::{Config, Sample};
use rw_metrics::{Exporter, MetricsServer};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "routerwatch")]
#[command(version, about = "RouterOS firewall rule metrics exporter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve firewall metrics for Prometheus
    Serve {
        #[arg(short, long, default_value = "config.yml")]
        config: PathBuf,
        /// Override the listen address from the config file
        #[arg(long)]
        listen: Option<String>,
    },
    /// Scrape devices once and print the samples
    Poll {
        #[arg(short, long, default_value = "config.yml")]
        config: PathBuf,
        /// Only scrape this device
        #[arg(long)]
        device: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List the metrics the firewall collector exports
    Describe,
    /// Validate a configuration file
    CheckConfig {
        #[arg(short, long, default_value = "config.yml")]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            tokio::runtime::Runtime::new()?.block_on(async { serve(&config, listen).await })?;
        }
        Commands::Poll {
            config,
            device,
            json,
        } => {
            tokio::runtime::Runtime::new()?
                .block_on(async { poll(&config, device.as_deref(), json).await })?;
        }
        Commands::Describe => describe(),
        Commands::CheckConfig { config } => check_config(&config)?,
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config =
        Config::from_file(path).with_context(|| format!("failed to load config {:?}", path))?;
    info!(path = ?path, devices = config.devices.len(), "loaded configuration");
    Ok(config)
}

async fn serve(path: &Path, listen: Option<String>) -> anyhow::Result<()> {
    let config = load_config(path)?;

    let addr: SocketAddr = match listen {
        Some(listen) => listen
            .parse()
            .with_context(|| format!("invalid listen address '{}'", listen))?,
        None => config.listen_addr()?,
    };

    let exporter = Exporter::from_config(&config)?;
    MetricsServer::new(exporter, addr).serve().await
}

async fn poll(path: &Path, device: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let exporter = Exporter::from_config(&config)?;

    let samples = match device {
        Some(name) => exporter
            .scrape_one(name)
            .await
            .with_context(|| format!("device '{}' is not configured", name))?,
        None => exporter.scrape().await,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&samples)?);
    } else {
        for sample in &samples {
            println!("{}", format_sample(sample));
        }
    }

    Ok(())
}

fn describe() {
    let projector = StatProjector::firewall();
    let mut descriptors = Vec::new();
    projector.describe(&mut descriptors);

    println!("📊 Metrics ({}):", descriptors.len());
    for desc in &descriptors {
        println!("  • {} ({})", desc.name(), desc.help());
        println!("    Labels: {}", desc.label_names().join(", "));
    }
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;

    println!("✅ Configuration OK");
    println!("   Listen: {}", config.listen);
    println!("   Timeout: {}s", config.timeout_secs);
    println!("   Devices ({}):", config.devices.len());
    for device in &config.devices {
        println!("     • {} ({})", device.name, device.endpoint());
    }

    Ok(())
}

/// One sample in exposition style: `name{label="value",...} value`.
fn format_sample(sample: &Sample) -> String {
    let labels = sample
        .labels()
        .map(|(k, v)| format!("{}={:?}", k, v))
        .collect::<Vec<_>>()
        .join(",");
    format!("{}{{{}}} {}", sample.descriptor().name(), labels, sample.value())
}
