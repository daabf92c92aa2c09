use folio_api::setup;
use folio_core::Config;
use folio_infra::{init_telemetry, LogFormat};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    init_telemetry(LogFormat::from_env(), &config.environment)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        port = config.server_port,
        "Starting folio-api"
    );

    // Initialize the application (storage, pipeline, routes)
    let (state, router) = setup::initialize_app(config).await?;

    // Start the server
    setup::server::start_server(state, router).await?;

    Ok(())
}
