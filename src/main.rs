use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tracing::{info, warn};

mod config;
mod error;
mod handlers;
mod llm;
mod prompts;
mod session;
mod state;
mod utils;

use config::CONFIG;
use llm::GeminiClient;
use state::AppState;
use utils::http::get_http_client;
use utils::logging::init_logging;

type MainResult = Result<(), Box<dyn Error + Send + Sync>>;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {err}");
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
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> MainResult {
    dotenv().ok();
    let _guards = init_logging();

    info!("Starting pachislo diary relay");
    let default_api_key = CONFIG.default_api_key();
    if default_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; requests must supply their own api_key");
    }

    let gemini = GeminiClient::new(
        get_http_client().clone(),
        &CONFIG.gemini_api_base,
        Duration::from_secs(CONFIG.gemini_timeout_seconds),
    )
    .with_generation_config(CONFIG.gemini_temperature, CONFIG.gemini_max_output_tokens);
    let state = AppState::new(Arc::new(gemini), &CONFIG.gemini_model, default_api_key);

    let app = handlers::router(state, CONFIG.max_request_bytes);

    let address = CONFIG.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        "Listening on {} (model={})",
        listener.local_addr()?,
        CONFIG.gemini_model
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
