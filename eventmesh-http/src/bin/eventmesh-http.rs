use std::sync::Arc;

use clap::{Args, Parser};
use eventmesh_core::resources::ResourceKey;
use eventmesh_http::router::TriggerRegistry;
use eventmesh_http::server::{ServerConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Event Mesh HTTP Server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Maximum re-entry budget stamped on events at ingress
    #[arg(long, env = "MAX_HOPS", default_value_t = 32)]
    max_hops: u32,

    /// Brokers to register at startup, as namespace/name
    #[arg(long = "broker", value_parser = parse_broker, default_value = "default/default")]
    brokers: Vec<ResourceKey>,

    #[command(flatten)]
    data_plane: DataPlaneEnv,
}

/// Workload references the control plane stamps onto broker data-plane
/// deployments. Required at startup so a misconfigured environment fails
/// fast instead of producing brokers without workloads; initialization
/// input only.
#[derive(Debug, Clone, Args)]
struct DataPlaneEnv {
    /// Container image for broker ingress workloads
    #[arg(long, env = "BROKER_INGRESS_IMAGE")]
    broker_ingress_image: String,

    /// Service account running broker ingress workloads
    #[arg(long, env = "BROKER_INGRESS_SERVICE_ACCOUNT")]
    broker_ingress_service_account: String,

    /// Container image for broker filter workloads
    #[arg(long, env = "BROKER_FILTER_IMAGE")]
    broker_filter_image: String,

    /// Service account running broker filter workloads
    #[arg(long, env = "BROKER_FILTER_SERVICE_ACCOUNT")]
    broker_filter_service_account: String,
}

fn parse_broker(raw: &str) -> Result<ResourceKey, String> {
    match raw.split_once('/') {
        Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
            Ok(ResourceKey::new(namespace, name))
        }
        _ => Err(format!("expected namespace/name, got: {raw}")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments; missing workload references abort here
    let cli = Cli::parse();

    // RUST_LOG takes precedence over the --log-level flag
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    info!(
        ingress_image = %cli.data_plane.broker_ingress_image,
        ingress_service_account = %cli.data_plane.broker_ingress_service_account,
        filter_image = %cli.data_plane.broker_filter_image,
        filter_service_account = %cli.data_plane.broker_filter_service_account,
        "validated data-plane workload references"
    );

    let registry = Arc::new(TriggerRegistry::new());
    for broker in &cli.brokers {
        registry.register_broker(broker.clone());
    }

    let mut config = ServerConfig {
        host: cli.host,
        port: cli.port,
        ..ServerConfig::default()
    };
    config.mesh.max_hops = cli.max_hops;

    println!(
        "Starting event mesh HTTP server on {}:{}",
        config.host, config.port
    );
    start_server(config, registry).await?;

    Ok(())
}
