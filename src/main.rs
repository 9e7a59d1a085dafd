//! pointing-hub server entry point.
//!
//! Starts the hub task and the Axum HTTP server with the `/ws` endpoint.

use tracing_subscriber::EnvFilter;

use pointing_hub::api;
use pointing_hub::app_state::AppState;
use pointing_hub::config::HubConfig;
use pointing_hub::service::hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = HubConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        queue_capacity = config.event_queue_capacity,
        outbound_buffer = config.outbound_buffer,
        "starting pointing-hub"
    );

    // Start the hub
    let (queue, hub_task) = hub::start(config.event_queue_capacity, config.enqueue_timeout);

    // Build application state and router
    let app = api::build_app(AppState {
        queue,
        outbound_buffer: config.outbound_buffer,
    });

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    // Let the hub drain whatever is still queued.
    hub_task.await?;
    Ok(())
}
