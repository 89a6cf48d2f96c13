use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use rapport::config::{ConfigBuilder, ConfigLoader};
use rapport_server::{AppState, cli::CliArgs, config::ServerConfig, create_router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let filter = match cli_args.log_level {
        Some(ref level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    }
    .add_directive("surrealdb_core=warn".parse()?)
    .add_directive("surrealdb=warn".parse()?);

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Rapport server v{}", rapport::VERSION);

    let server_config = ServerConfig::from_cli_and_env(cli_args)?;

    let mut builder = match &server_config.config_file {
        Some(path) => builder_from_file(path),
        None => {
            info!("No config file provided, using default configuration");
            ConfigBuilder::defaults()
        }
    };
    if server_config.memory_storage {
        builder = builder.with_memory_storage();
    }

    let rapport = rapport::init(builder.build()?).await?;
    info!("Rapport initialized with {} storage", rapport.backend_name());

    let state = Arc::new(AppState::new(rapport.clone(), server_config.clone()));

    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(server_config.max_request_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = server_config.socket_addr();
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("OpenAPI document available at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    rapport.shutdown().await;
    Ok(())
}

/// Configuration from `path`, falling back to the defaults when it cannot be read
fn builder_from_file(path: &Path) -> ConfigBuilder {
    info!("Loading Rapport configuration from: {}", path.display());

    let mut loader = ConfigLoader::new();
    let loaded = loader
        .load_file(path)
        .and_then(|loader| loader.load_env().extract());

    match loaded {
        Ok(config) => ConfigBuilder::from_config(config),
        Err(e) => {
            warn!(
                "Failed to load config file {}: {}. Using defaults.",
                path.display(),
                e
            );
            ConfigBuilder::defaults()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
