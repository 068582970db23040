// File: crates/slotwise_config/src/lib.rs
//! Layered configuration loading for the Slotwise service.
//!
//! Sources, lowest precedence first: `config/default.toml`, an optional
//! `config/{RUN_ENV}.toml`, then `APP_*` environment variables using `__`
//! as the nesting separator (e.g. `APP_SERVER__PORT=8080`).

pub mod models;

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use tracing::debug;

pub use models::{AppConfig, BookingConfig, DayHoursConfig, GcalConfig, ServerConfig};

static DOTENV_LOADED: OnceCell<()> = OnceCell::new();

/// Loads `.env` into the process environment exactly once.
pub fn ensure_dotenv_loaded() {
    DOTENV_LOADED.get_or_init(|| {
        if dotenv::dotenv().is_ok() {
            debug!("Loaded environment overrides from .env");
        }
    });
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

    let config = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_env}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let mut app_config: AppConfig = config.try_deserialize()?;

    // The OAuth client secret never lives in a config file.
    if let Ok(secret) = std::env::var("GCAL_OAUTH_CLIENT_SECRET") {
        app_config.gcal.oauth_client_secret = Some(secret);
    }

    Ok(app_config)
}
