use std::sync::Arc;

use crate::config::Config;
use crate::email::EmailClient;
use crate::store::CrmStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// JSON file or PostgreSQL, chosen from `DATABASE_URL` at startup.
    pub store: Arc<dyn CrmStore>,
    pub email: EmailClient,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn CrmStore>, config: Config) -> Self {
        let email = EmailClient::new(config.sendgrid_api_key.clone(), config.email_from.clone());
        Self {
            store,
            email,
            config,
        }
    }
}
