use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::models::{next_id, Company, CrmDocument, EntityRecord, NewCompany, RecordKind, Stats};
use crate::store::{CrmStore, StoreError};

/// Stores every collection in one JSON document.
///
/// Each mutation is a full read-modify-write of the document. Writers in this
/// process are serialized by `write_lock`; the file itself is replaced by an
/// atomic rename so readers never observe a half-written document.
pub struct JsonStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Reads the document. A missing file is an empty database.
    pub async fn load(&self) -> Result<CrmDocument, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet, starting empty", self.path.display());
                Ok(CrmDocument::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Refreshes the stats block and rewrites the whole document.
    async fn save(&self, doc: &mut CrmDocument) -> Result<(), StoreError> {
        doc.refresh_stats(Utc::now());
        let bytes = serde_json::to_vec_pretty(doc)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        debug!("Saved {} ({} companies)", self.path.display(), doc.stats.total_companies);
        Ok(())
    }

    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl CrmStore for JsonStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    async fn list_companies(&self) -> Result<Vec<Company>, StoreError> {
        let mut companies = self.load().await?.companies;
        companies.sort_by_key(|c| c.id);
        Ok(companies)
    }

    async fn create_company(&self, new: NewCompany) -> Result<Company, StoreError> {
        let _guard = self.lock().await;
        let mut doc = self.load().await?;

        let id = next_id(doc.companies.iter().map(|c| c.id))
            .ok_or(StoreError::IdExhausted("companies"))?;
        let company = Company::from_new(id, new, Utc::now());
        doc.companies.push(company.clone());
        self.save(&mut doc).await?;

        info!("Created company {} ({})", company.id, company.name);
        Ok(company)
    }

    async fn import_companies(&self, rows: Vec<NewCompany>) -> Result<Vec<Company>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.lock().await;
        let mut doc = self.load().await?;

        let first = next_id(doc.companies.iter().map(|c| c.id))
            .filter(|first| first.checked_add(rows.len() as i64 - 1).is_some())
            .ok_or(StoreError::IdExhausted("companies"))?;
        let now = Utc::now();
        let created: Vec<Company> = rows
            .into_iter()
            .enumerate()
            .map(|(offset, new)| Company::from_new(first + offset as i64, new, now))
            .collect();
        doc.companies.extend(created.iter().cloned());
        self.save(&mut doc).await?;

        info!("Imported {} companies", created.len());
        Ok(created)
    }

    async fn delete_company(&self, id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock().await;
        let mut doc = self.load().await?;

        let before = doc.companies.len();
        doc.companies.retain(|c| c.id != id);
        if doc.companies.len() == before {
            return Ok(false);
        }
        self.save(&mut doc).await?;

        info!("Deleted company {id}");
        Ok(true)
    }

    async fn list_records(&self, kind: RecordKind) -> Result<Vec<EntityRecord>, StoreError> {
        let doc = self.load().await?;
        let mut records = doc.records(kind).clone();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn create_record(
        &self,
        kind: RecordKind,
        fields: Map<String, Value>,
    ) -> Result<EntityRecord, StoreError> {
        let _guard = self.lock().await;
        let mut doc = self.load().await?;

        let records = doc.records_mut(kind);
        let id = next_id(records.iter().map(|r| r.id))
            .ok_or(StoreError::IdExhausted(kind.as_str()))?;
        let record = EntityRecord::new(id, fields, Utc::now());
        records.push(record.clone());
        self.save(&mut doc).await?;

        info!("Created {} {id}", kind.as_str());
        Ok(record)
    }

    async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock().await;
        let mut doc = self.load().await?;

        let records = doc.records_mut(kind);
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save(&mut doc).await?;

        info!("Deleted {} {id}", kind.as_str());
        Ok(true)
    }

    async fn stats(&self) -> Result<Stats, StoreError> {
        Ok(self.load().await?.stats)
    }
}
