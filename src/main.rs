use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use consulta::api::{api_router, ApiContext};
use consulta::config::{self, Settings};
use consulta::llm::OllamaClient;
use consulta::store::files::DocumentStore;
use consulta::store::memory::InMemoryFactStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let settings = Settings::from_env();
    tracing::info!(
        bind = %settings.bind_addr,
        model = %settings.model,
        "starting {} v{}",
        config::APP_NAME,
        config::APP_VERSION
    );

    let facts = Arc::new(InMemoryFactStore::new());
    let documents = Arc::new(DocumentStore::new(config::uploads_dir())?);
    let llm = Arc::new(OllamaClient::new(&settings.ollama_url, 120));

    let ctx = ApiContext::new(facts, documents, llm, &settings);
    let app = api_router(ctx);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", settings.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
