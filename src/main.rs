mod agents;
mod config;
mod error;
mod graph;
mod llm;
mod logging;
mod models;
mod rate_limit;
mod retry;
mod routes;
mod search;
mod services;
mod state;

use std::sync::Arc;

use llm::LlmChat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let settings = config::Settings::from_env()?;
    logging::init(&settings);

    // Initialize LLM client (non-fatal: generation disabled if config missing).
    let llm: Option<Arc<dyn LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured, content generation disabled");
            None
        }
    };

    let search_config = search::SearchConfig::from_env()?;
    let search_top_k = search_config.top_k;
    let search_min_score = search_config.min_score;
    let search = search_config.build_index()?;

    let (publisher, sharepoint_site_id, sharepoint_drive_id) = match graph::GraphConfig::from_env() {
        Some(config) => {
            let site = config.site_id.clone();
            let drive = config.drive_id.clone();
            let client: Arc<dyn graph::Publisher> = Arc::new(graph::client::GraphClient::new(config)?);
            tracing::info!(default_site = ?site, default_drive = ?drive, "Microsoft Graph client initialized");
            (Some(client), site, drive)
        }
        None => {
            tracing::warn!("Microsoft Graph not configured, publishing disabled");
            (None, None, None)
        }
    };

    let templates = services::catalog::TemplateCatalog::load(settings.templates_path.as_deref())?;
    tracing::info!(count = templates.len(), "template catalog loaded");

    let integrations = state::Integrations {
        llm,
        search,
        search_top_k,
        search_min_score,
        publisher,
        sharepoint_site_id,
        sharepoint_drive_id,
        rate_limits: rate_limit::RateLimitConfig::from_env()?,
    };

    let port = settings.port;
    let app_name = settings.app_name.clone();
    let environment = settings.environment.as_str();
    let state = state::AppState::new(settings, templates, integrations)?;
    if !state.auth.enabled() {
        tracing::warn!("AUTH_TOKENS not set, requests run as anonymous clients");
    }

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, environment, "{app_name} listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
