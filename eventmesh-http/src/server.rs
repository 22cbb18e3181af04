use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use eventmesh_core::config::MeshConfig;
use eventmesh_core::delivery::DeliveryClient;
use eventmesh_core::error::DeliveryResult;

use crate::router::{BrokerRouter, TriggerRegistry};
use crate::routes::create_api_router;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Delivery and routing configuration
    pub mesh: MeshConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            mesh: MeshConfig::default(),
        }
    }
}

/// Shared state of the HTTP server
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<BrokerRouter>,
}

/// Build the application state around a trigger registry
pub fn build_state(config: &ServerConfig, registry: Arc<TriggerRegistry>) -> DeliveryResult<AppState> {
    let client = Arc::new(DeliveryClient::new(&config.mesh)?);
    let router = BrokerRouter::new(registry, client, config.mesh.max_hops);
    Ok(AppState { router })
}

/// Start the HTTP server
pub async fn start_server(
    config: ServerConfig,
    registry: Arc<TriggerRegistry>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = build_state(&config, registry)?;

    info!("Initialized broker router");

    // Create the router with all routes and add the broker router as state
    let app = create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Parse the socket address
    let addr = format!("{}:{}", config.host, config.port).parse::<SocketAddr>()?;

    // Start the server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
