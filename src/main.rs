mod accounts;
mod app;
mod catalog;
mod config;
mod session;
mod state;
mod storage;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "techstore=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let (host, port) = (config.host.clone(), config.port);
    let app_state = AppState::init(config).await?;

    // ensure_ready is retried lazily on first use
    if let Err(e) = app_state.accounts.ensure_ready().await {
        tracing::warn!(error = %e, "account store not ready at startup; continuing");
    }

    let app = app::build_app(app_state);
    app::serve(app, &host, port).await
}
