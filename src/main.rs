// Main entry point for the superres-server application.
// Sets up the Tokio runtime, builds the upscale pipeline from configuration,
// configures the Axum router, and starts the HTTP server.

use clap::Parser;
use std::sync::Arc;
use superres_server::config::AppConfig;
use superres_server::orchestrator::Upscaler;
use superres_server::{app, listeners, shutdown_signal};
use tracing::Level;

#[tokio::main]
async fn main() {
    // Parse command line args and environment variables
    let config = AppConfig::parse();

    // Initialize tracing subscriber for structured logging.
    // Logs will go to stdout. Adjust level and format as needed.
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting superres-server...");

    let service_config = Arc::new(config.service_config());
    tracing::info!(
        backend_url = %service_config.backend_url,
        backend_token_configured = service_config.backend_token_configured(),
        max_file_size_mib = service_config.max_file_size_mib(),
        max_dimension = service_config.max_dimension,
        max_retries = service_config.max_retries,
        "Pipeline configuration loaded"
    );
    if !service_config.backend_token_configured() {
        tracing::warn!(
            "No backend token configured; remote mode requests will be rejected. Local mode is unaffected."
        );
    }

    // --- Initialize the upscale pipeline ---
    let upscaler = match Upscaler::new(service_config) {
        Ok(upscaler) => Arc::new(upscaler),
        Err(e) => {
            tracing::error!("FATAL: Failed to initialize upscale pipeline: {}", e);
            eprintln!("FATAL: Pipeline initialization failed. See logs for details. Exiting.");
            std::process::exit(1);
        }
    };

    // --- Build Axum Application Router ---
    let app = app::create_app(upscaler);
    tracing::info!("Axum router configured.");

    // --- Start HTTP Server ---
    let listener = match listeners::create_listener(&config.host, config.port).await {
        Ok((addr, listener)) => {
            tracing::info!("Server successfully bound. Listening on {}", addr);
            listener
        }
        Err(e) => {
            tracing::error!("FATAL: Failed to bind server: {}", e);
            eprintln!("FATAL: Could not bind server. Error: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    // Run the server.
    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal::shutdown_signal())
        .await
    {
        tracing::error!("Server run error: {}", e);
        eprintln!("ERROR: Server shut down unexpectedly. Error: {}", e);
    }

    tracing::info!("superres-server has shut down.");
}
