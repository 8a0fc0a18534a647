use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_DATA_FILE: &str = "data/crm_data.json";
const DEFAULT_EMAIL_FROM: &str = "noreply@diversia.es";

/// Application configuration loaded from environment variables.
/// Everything is optional; missing storage/email settings select the JSON
/// store and disable outbound email.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub data_file: PathBuf,
    /// When set, the PostgreSQL store is used instead of the JSON file.
    pub database_url: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub email_from: String,
    /// Admin address notified when a company is registered.
    pub notify_email: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            data_file: optional_env("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
            database_url: optional_env("DATABASE_URL"),
            sendgrid_api_key: optional_env("SENDGRID_API_KEY"),
            email_from: optional_env("EMAIL_FROM")
                .unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            notify_email: optional_env("NOTIFY_EMAIL"),
        })
    }

    #[cfg(test)]
    pub fn with_data_file(data_file: impl Into<PathBuf>) -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            data_file: data_file.into(),
            database_url: None,
            sendgrid_api_key: None,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            notify_email: None,
        }
    }
}

/// Reads an env var, treating empty values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
