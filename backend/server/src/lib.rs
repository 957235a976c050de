//! Documentation of the winter activities service.
//!
//! A small REST service for winter activities (name, price, whether snow is needed), plus an
//! endpoint that tells how far apart two instants are.
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Result |
//! |---|---|---|
//! | POST | `/api/activities` | 201 created activity, 400 on missing or invalid fields |
//! | GET | `/api/activities` | every activity |
//! | GET | `/api/activities/{id}` | one activity, 404 if unknown |
//! | GET | `/api/activities/filter/snow/{required}` | activities whose snow flag equals `required == "true"` |
//! | GET | `/api/activities/filter/free` | activities priced exactly 0 |
//! | PUT | `/api/activities/{id}` | updated activity, 400 on invalid fields, 404 if unknown |
//! | DELETE | `/api/activities/{id}` | `{message, activity}`, 404 if unknown |
//! | GET | `/api/time-difference?from=..&to=..` | `{hours, minutes, message}` for two RFC 3339 instants |
//!
//! Every error body is `{"error": "..."}`.
//!
//!
//!
//! # Configuration
//!
//! - `RUST_PORT`: listening port, default 3000
//! - `REDIS_URL`: connection string, default `redis://127.0.0.1:6379`,
//!   `/run/secrets/REDIS_URL` wins if mounted
//! - `STORE`: `redis` or `memory`, default `redis`
//! - `SEED_ON_START`: load the starter catalog into an empty store, default `false`
//! - `RUST_LOG`: log filter, default `info`
//!
//!
//!
//! # Setup
//!
//! Run against a local Redis.
//! ```sh
//! docker run -d -p 6379:6379 redis
//! cargo run --bin winter
//! ```
//!
//! Run without Redis.
//! ```sh
//! STORE=memory SEED_ON_START=true cargo run --bin winter
//! ```
//!
//! Seed a store from the command line.
//! ```sh
//! cargo run --bin process -- seed
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};

use signal::ctrl_c;
#[cfg(unix)]
use signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod state;
pub mod utils;

use routes::{
    create_handler, delete_handler, free_filter_handler, get_handler, list_handler,
    snow_filter_handler, time_difference_handler, update_handler,
};
use state::AppState;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).init();
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/activities", get(list_handler).post(create_handler))
        .route(
            "/api/activities/{id}",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route(
            "/api/activities/filter/snow/{required}",
            get(snow_filter_handler),
        )
        .route("/api/activities/filter/free", get(free_filter_handler))
        .route("/api/time-difference", get(time_difference_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    init_tracing();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = app(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on http://{address}");
    info!("API endpoint: http://{address}/api/activities");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            return std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
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
}
