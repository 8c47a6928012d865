//! Main Entrypoint for the Englishly Coaching Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Initializing shared services (the LLM client and the report store).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use englishly_api::{
    config::{Config, Provider},
    router::create_router,
    state::AppState,
};
use englishly_core::{
    llm_client::{LLMClient, OpenAICompatibleClient},
    storage::{ReportStore, S3ReportStore},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize the Report Store ---
    // Storage credentials come from the immutable Config, not ambient lookup.
    let credentials = Credentials::new(
        config.aws_access_key_id.clone(),
        config.aws_secret_access_key.clone(),
        None,
        None,
        "englishly-config",
    );
    let s3_config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .credentials_provider(credentials)
        .build();
    let report_store: Arc<dyn ReportStore> = Arc::new(S3ReportStore::new(
        aws_sdk_s3::Client::from_conf(s3_config),
        config.report_bucket.clone(),
    ));

    // --- 4. Initialize the LLM Client ---
    let llm_client: Arc<dyn LLMClient> = match &config.provider {
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            let api_key = config
                .openai_api_key
                .as_ref()
                .context("OPENAI_API_KEY missing despite validated config")?;
            let openai_config = OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base("https://api.openai.com/v1/");
            Arc::new(OpenAICompatibleClient::new(
                openai_config,
                config.chat_model.clone(),
            ))
        }
        Provider::Azure => {
            info!("Using Azure OpenAI provider.");
            let api_key = config
                .azure_api_key
                .as_ref()
                .context("AZURE_OPENAI_API_KEY missing despite validated config")?;
            let endpoint = config
                .azure_endpoint
                .as_ref()
                .context("AZURE_OPENAI_ENDPOINT missing despite validated config")?;
            let openai_config = OpenAIConfig::new().with_api_key(api_key).with_api_base(
                format!("{}/openai/v1", endpoint.trim_end_matches('/')),
            );
            Arc::new(OpenAICompatibleClient::new(
                openai_config,
                config.chat_model.clone(),
            ))
        }
    };

    let app_state = Arc::new(AppState {
        llm_client,
        report_store,
        config: Arc::new(config.clone()),
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bucket = %config.report_bucket,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
