use std::path::PathBuf;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub wp_base_url: String,
    pub wp_username: String,
    pub wp_app_password: String,
    pub ledger_db_path: PathBuf,
    pub report_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            wp_base_url: env::var("WP_BASE_URL").context("WP_BASE_URL must be set")?,
            wp_username: env::var("WP_USERNAME").context("WP_USERNAME must be set")?,
            wp_app_password: env::var("WP_APP_PASSWORD")
                .context("WP_APP_PASSWORD must be set")?,
            ledger_db_path: env::var("LEDGER_DB_PATH")
                .unwrap_or_else(|_| "data/ledger.db".to_string())
                .into(),
            report_dir: env::var("REPORT_DIR")
                .unwrap_or_else(|_| "data".to_string())
                .into(),
        })
    }
}
