mod auth;
mod config;
mod middleware;

mod db;
mod dispatcher;
mod error;
mod models;
mod reminder_message;
mod routes;
mod scheduler;
mod sms_gateway;
mod store;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use crate::{
    config::Config,
    dispatcher::{DispatchSettings, ReminderDispatcher},
    models::AppState,
    sms_gateway::HttpSmsGateway,
    store::PgReminderStore,
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::{Method, header};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg.database_url, cfg.db_max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Connected to the database");

    let store = Arc::new(PgReminderStore::new(pool));
    let gateway = Arc::new(HttpSmsGateway::new(&cfg.sms)?);
    let dispatcher = Arc::new(ReminderDispatcher::new(
        store.clone(),
        gateway,
        DispatchSettings {
            utc_offset: cfg.reminder.utc_offset,
            concurrency: cfg.reminder.concurrency,
        },
    ));

    if cfg.reminder.trigger_token_hash.is_none() {
        tracing::warn!("REMINDER_TRIGGER_TOKEN_HASH is not set; reminder endpoints are unauthenticated");
    }

    if let Some(at) = cfg.reminder.schedule_at {
        tracing::info!(%at, offset = %cfg.reminder.utc_offset, "daily reminder run enabled");
        tokio::spawn(scheduler::run_daily(
            dispatcher.clone(),
            at,
            cfg.reminder.utc_offset,
        ));
    }

    let state = AppState {
        store,
        dispatcher,
        trigger_token_hash: cfg.reminder.trigger_token_hash.clone(),
    };

    // The admin dashboard calls the notification log from the browser.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
