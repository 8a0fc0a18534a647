//! Persistence for companies and the generic entity collections.
//!
//! Two backends implement [`CrmStore`]: a single JSON document on disk
//! ([`JsonStore`]) and PostgreSQL ([`PgStore`]). `DATABASE_URL` selects the
//! latter.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::models::{Company, EntityRecord, NewCompany, RecordKind, Stats};

pub mod json;
pub mod postgres;

pub use json::JsonStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt data document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No identifiers left in {0}")]
    IdExhausted(&'static str),
}

/// CRUD over every CRM collection.
///
/// Identifiers are assigned as max(existing) + 1 per collection. Deleting an
/// unknown id returns `false` and changes nothing. Callers pass company input
/// already normalized (see [`NewCompany::normalized`]).
#[async_trait]
pub trait CrmStore: Send + Sync {
    /// Short backend name for logs and the system health report.
    fn backend(&self) -> &'static str;

    async fn list_companies(&self) -> Result<Vec<Company>, StoreError>;

    async fn create_company(&self, new: NewCompany) -> Result<Company, StoreError>;

    /// Appends every row in a single write; ids are consecutive.
    async fn import_companies(&self, rows: Vec<NewCompany>) -> Result<Vec<Company>, StoreError>;

    async fn delete_company(&self, id: i64) -> Result<bool, StoreError>;

    async fn list_records(&self, kind: RecordKind) -> Result<Vec<EntityRecord>, StoreError>;

    async fn create_record(
        &self,
        kind: RecordKind,
        fields: Map<String, Value>,
    ) -> Result<EntityRecord, StoreError>;

    async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<bool, StoreError>;

    async fn stats(&self) -> Result<Stats, StoreError>;
}

/// Builds the store selected by the configuration.
pub async fn open_store(config: &Config) -> Result<Arc<dyn CrmStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = crate::db::create_pool(url).await?;
            let store = PgStore::new(pool);
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
        None => {
            info!("Using JSON data file {}", config.data_file.display());
            Ok(Arc::new(JsonStore::new(&config.data_file)))
        }
    }
}
