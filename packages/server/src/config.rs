use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use vendors::types::config::{parse_vendor_configs, VendorConfig, WebsiteConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub nats_url: String,
    pub port: u16,
    pub api_route_prefix: String,
    pub client_timeout: Duration,
    pub trace_url: Option<String>,
    pub trace_service_name: String,
    pub vendor_config_path: String,
    pub website: WebsiteConfig,
    /// Cron expression for the in-process batch trigger; the worker runs
    /// without one when unset (an external scheduler owns the trigger).
    pub batch_update_cron: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            nats_url: env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            api_route_prefix: env::var("WEB_WATCHER_API_ROUTE_PREFIX")
                .unwrap_or_else(|_| "/api/web-watcher".to_string()),
            client_timeout: Duration::from_secs(
                env::var("CLIENT_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("CLIENT_TIMEOUT_SECONDS must be a valid number")?,
            ),
            trace_url: env::var("TRACE_URL").ok(),
            trace_service_name: env::var("TRACE_SERVICE_NAME")
                .unwrap_or_else(|_| "web-watch".to_string()),
            vendor_config_path: env::var("VENDOR_CONFIG_PATH")
                .unwrap_or_else(|_| "/config/vendors.json".to_string()),
            website: WebsiteConfig {
                separator: env::var("WEB_WATCHER_SEPARATOR").unwrap_or_else(|_| "\n".to_string()),
                max_date_length: env::var("WEB_WATCHER_DATE_MAX_LENGTH")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .context("WEB_WATCHER_DATE_MAX_LENGTH must be a valid number")?,
            },
            batch_update_cron: env::var("BATCH_UPDATE_CRON").ok(),
        })
    }

    /// Load the per-vendor rate-limit map from `vendor_config_path`.
    pub fn load_vendor_configs(&self) -> Result<HashMap<String, VendorConfig>> {
        let data = std::fs::read_to_string(&self.vendor_config_path).with_context(|| {
            format!("read vendor config file {}", self.vendor_config_path)
        })?;
        parse_vendor_configs(&data).context("parse vendor config file")
    }
}
