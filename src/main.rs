use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_summarizer_server::ai::OpenRouterBackend;
use pdf_summarizer_server::auth::HttpIdentityProvider;
use pdf_summarizer_server::billing::HttpCheckoutProvider;
use pdf_summarizer_server::cleanup::start_cleanup_task;
use pdf_summarizer_server::config::Config;
use pdf_summarizer_server::db::create_pool;
use pdf_summarizer_server::routes;
use pdf_summarizer_server::state::AppState;
use pdf_summarizer_server::storage::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_summarizer_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("incomplete environment ({e}), using defaults");
            Config::default()
        }
    };

    let db = create_pool(&config.database.url).await?;
    let file_store = FileStore::new(&config.storage).await?;
    let backend = Arc::new(OpenRouterBackend::new(&config.ai)?);
    let identity = Arc::new(HttpIdentityProvider::new(&config.auth));
    let checkout = Arc::new(HttpCheckoutProvider::new(&config.billing));

    let state = AppState::new(
        config.clone(),
        db.clone(),
        file_store.clone(),
        backend,
        identity,
        checkout,
    );

    start_cleanup_task(db, file_store);

    let app = routes::app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
