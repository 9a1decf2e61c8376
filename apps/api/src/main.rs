mod backoff;
mod config;
mod errors;
mod llm_client;
mod proposal;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backoff::BackoffPolicy;
use crate::config::{Config, GenerationBackend};
use crate::llm_client::LlmClient;
use crate::proposal::client::{GenerationClient, LiveGenerationClient, StubGenerationClient};
use crate::proposal::request::{PromptConfig, ProposalRequestBuilder};
use crate::proposal::schema::OutputSchema;
use crate::proposal::session::{spawn_event_logger, ProposalService};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Proposal API v{}", env!("CARGO_PKG_VERSION"));

    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; generation requests will be rejected until it is");
    }

    // Initialize generation client (live by default, swap via GENERATION_BACKEND)
    let client = build_generation_client(&config)?;
    info!(
        "Generation client initialized (backend: {}, max attempts: {})",
        client.backend(),
        config.max_attempts
    );

    let proposals = Arc::new(ProposalService::new(
        ProposalRequestBuilder::new(PromptConfig::default(), OutputSchema::default()),
        client,
        BackoffPolicy::with_max_attempts(config.max_attempts),
        config.gemini_api_key.clone(),
    ));
    spawn_event_logger(proposals.subscribe());

    // Build app state
    let state = AppState { proposals };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_generation_client(config: &Config) -> Result<Arc<dyn GenerationClient>> {
    match config.backend {
        GenerationBackend::Live => {
            let llm = LlmClient::new(
                config.generation_endpoint.clone(),
                config.gemini_api_key.clone().unwrap_or_default(),
                Duration::from_secs(config.request_timeout_secs),
            )
            .context("Failed to build HTTP client")?;
            Ok(Arc::new(LiveGenerationClient::new(llm)))
        }
        GenerationBackend::Stub => match &config.stub_payload_path {
            Some(path) => {
                let payload = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read stub payload from {}", path.display())
                })?;
                Ok(Arc::new(StubGenerationClient::with_payload(payload)))
            }
            None => Ok(Arc::new(StubGenerationClient::default())),
        },
    }
}
