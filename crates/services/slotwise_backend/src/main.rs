// File: crates/services/slotwise_backend/src/main.rs
//! Composition root: loads config, wires the booking stack together, and
//! serves the HTTP API.

use axum::{routing::get, Json, Router};
use slotwise_booking::WorkingHoursPolicy;
use slotwise_config::load_config;
use slotwise_gcal::auth::{AuthManager, FileTokenStore, ServiceCredential, ServiceTokenSource};
use slotwise_gcal::handlers::{resolve_time_zone, GcalState};
use slotwise_gcal::service::GoogleCalendarClient;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

const DEFAULT_TOKEN_FILE: &str = "token.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn root() -> &'static str {
    "Slotwise booking API"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    slotwise_common::logging::init();

    let config = Arc::new(load_config()?);
    info!("Configuration loaded");

    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check));

    if config.use_gcal {
        let gcal = &config.gcal;

        // Policy and timezone problems are startup failures, not
        // per-request surprises.
        let policy = Arc::new(WorkingHoursPolicy::from_config(&config.booking)?);
        let time_zone = resolve_time_zone(gcal)?;

        let token_file = gcal.token_file.as_deref().unwrap_or(DEFAULT_TOKEN_FILE);
        let auth = Arc::new(AuthManager::new(
            gcal,
            Box::new(FileTokenStore::new(token_file)),
        )?);
        auth.load_or_init().await;

        let service_credential: Option<Arc<dyn ServiceTokenSource>> =
            match gcal.service_account_key_path.as_deref() {
                Some(path) => match ServiceCredential::from_key_file(Path::new(path)).await {
                    Ok(credential) => Some(Arc::new(credential)),
                    Err(e) => {
                        // Degraded fallback stays off; delegated bookings
                        // still work.
                        warn!("Service account credential unavailable: {e}");
                        None
                    }
                },
                None => None,
            };

        let timeout = Duration::from_secs(
            gcal.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        let provider = match GoogleCalendarClient::new(timeout) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                error!("Failed to build calendar client: {e}");
                return Err(Box::new(e) as Box<dyn std::error::Error>);
            }
        };

        let state = Arc::new(GcalState {
            config: config.clone(),
            policy,
            auth,
            service_credential,
            provider,
            time_zone,
        });
        app = app.merge(slotwise_gcal::routes::routes(state));
        info!("Calendar booking routes enabled");
    } else {
        warn!("use_gcal is false; only the health endpoints are served");
    }

    let app = app.layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
