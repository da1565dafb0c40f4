use std::sync::Arc;

use moodlens_api::backend::notify::{LogNotifier, WebhookNotifier};
use moodlens_api::backend::postgres::PostgresBackend;
use moodlens_api::backend::ResetNotifier;
use moodlens_api::config::Config;
use moodlens_api::db;
use moodlens_api::server::{self, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodlens_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    let pool = db::pool::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    db::pool::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let notifier: Arc<dyn ResetNotifier> = match &config.password_reset_webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(url, &config.reset_page_url())
                .expect("Failed to build reset webhook client"),
        ),
        None => {
            tracing::warn!("PASSWORD_RESET_WEBHOOK_URL not set, reset tokens go to the debug log");
            Arc::new(LogNotifier)
        }
    };

    let backend = Arc::new(PostgresBackend::new(
        pool,
        config.password_reset_ttl_secs,
        notifier,
    ));
    let state = AppState::new(backend.clone(), backend, config.clone());
    state.rate_limiter.spawn_cleanup_worker();

    let app = server::router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");
    server::serve(listener, app).await.expect("Server error");
}
