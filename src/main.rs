mod app;
mod auth;
mod config;
mod db;
mod error;
mod pagination;
mod products;
mod seed;
mod state;
mod store;
mod users;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "marketplace=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init().await?;

    if let Some(seed) = &app_state.config.admin {
        seed::seed_admin(app_state.store.as_ref(), seed).await?;
    } else {
        tracing::info!("ADMIN_USERNAME/ADMIN_EMAIL/ADMIN_PASSWORD not set; skipping admin seed");
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}
