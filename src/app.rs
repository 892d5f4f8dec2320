/*
 * Responsibility
 * - Logging + panic hook
 * - Config -> dependencies (user store, token issuer) -> AppState
 * - Route table + transport middleware -> axum app
 * - axum::serve() with graceful shutdown
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::extract::State;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::routes;
use crate::config::Config;
use crate::middleware::{self, auth::AccessGuard};
use crate::repos::{InMemoryUserStore, PgUserStore, UserStore};
use crate::services::auth::build_token_issuer;
use crate::state::AppState;

pub fn init_tracing() {
    // RUST_LOG wins when set, e.g.
    // RUST_LOG=info,homes_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr may be hidden depending on how the process is launched.
        tracing::error!(?info, "panic");

        // Without abort, CatchPanicLayer turns the panic into a 500 response.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(config.abort_on_panic);

    tracing::info!(
        "starting API in {:?} mode on {} (debug: {})",
        config.app_env,
        config.addr,
        config.app_debug
    );

    let state = build_state(&config).await?;
    let app = build_app(state, &config)?;

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Postgres when DATABASE_URL is set, otherwise an in-process store.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let users: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run migrations")?;
            tracing::info!("using postgres user store");
            Arc::new(PgUserStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; users are kept in memory");
            Arc::new(InMemoryUserStore::new())
        }
    };

    Ok(AppState::new(
        users,
        build_token_issuer(config),
        config.app_debug,
    ))
}

/// Every request falls through to the route table's dispatcher, which is
/// the only place a response body is produced.
pub fn build_app(state: AppState, config: &Config) -> Result<axum::Router> {
    let guard = AccessGuard::new(state.tokens.clone());
    let table = Arc::new(routes::routes(&guard, config.app_debug)?);

    let app = axum::Router::new()
        .fallback(
            move |State(state): State<AppState>, req: axum::extract::Request| {
                let table = table.clone();
                async move { table.handle(state, req).await }
            },
        )
        .with_state(state);

    let app = middleware::security_headers::apply(app);
    let app = middleware::cors::apply(app, config);
    let app = middleware::http::apply(app, config.app_debug);

    Ok(app)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Keep serving; there is no signal to wait for.
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
