use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::models::{Company, EntityRecord, NewCompany, RecordKind, Stats};
use crate::store::{CrmStore, StoreError};

const CREATE_COMPANIES: &str = r#"
    CREATE TABLE IF NOT EXISTS companies (
        id          BIGINT PRIMARY KEY,
        name        TEXT NOT NULL,
        email       TEXT NOT NULL DEFAULT '',
        phone       TEXT NOT NULL DEFAULT '',
        sector      TEXT NOT NULL,
        city        TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_RECORDS: &str = r#"
    CREATE TABLE IF NOT EXISTS crm_records (
        kind        TEXT NOT NULL,
        id          BIGINT NOT NULL,
        data        JSONB NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (kind, id)
    )
"#;

#[derive(Debug, FromRow)]
struct RecordRow {
    id: i64,
    data: Value,
    created_at: DateTime<Utc>,
}

impl From<RecordRow> for EntityRecord {
    fn from(row: RecordRow) -> Self {
        let fields = match row.data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        EntityRecord::new(row.id, fields, row.created_at)
    }
}

/// PostgreSQL backend. Id assignment takes an exclusive table lock inside a
/// transaction so max(id) + 1 cannot race.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_COMPANIES).execute(&self.pool).await?;
        sqlx::query(CREATE_RECORDS).execute(&self.pool).await?;
        info!("PostgreSQL schema ready");
        Ok(())
    }
}

#[async_trait]
impl CrmStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list_companies(&self) -> Result<Vec<Company>, StoreError> {
        Ok(
            sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn create_company(&self, new: NewCompany) -> Result<Company, StoreError> {
        let mut created = self.import_companies(vec![new]).await?;
        created
            .pop()
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn import_companies(&self, rows: Vec<NewCompany>) -> Result<Vec<Company>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("LOCK TABLE companies IN EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let first: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM companies")
            .fetch_one(&mut *tx)
            .await?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(rows.len());
        for (offset, new) in rows.into_iter().enumerate() {
            let id = first
                .checked_add(offset as i64)
                .ok_or(StoreError::IdExhausted("companies"))?;
            let company: Company = sqlx::query_as(
                r#"
                INSERT INTO companies (id, name, email, phone, sector, city, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(&new.sector)
            .bind(&new.city)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            created.push(company);
        }
        tx.commit().await?;

        info!("Inserted {} companies", created.len());
        Ok(created)
    }

    async fn delete_company(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_records(&self, kind: RecordKind) -> Result<Vec<EntityRecord>, StoreError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT id, data, created_at FROM crm_records WHERE kind = $1 ORDER BY id ASC",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(EntityRecord::from).collect())
    }

    async fn create_record(
        &self,
        kind: RecordKind,
        fields: Map<String, Value>,
    ) -> Result<EntityRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("LOCK TABLE crm_records IN EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let id: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM crm_records WHERE kind = $1")
                .bind(kind.as_str())
                .fetch_one(&mut *tx)
                .await?;

        let record = EntityRecord::new(id, fields, Utc::now());
        sqlx::query("INSERT INTO crm_records (kind, id, data, created_at) VALUES ($1, $2, $3, $4)")
            .bind(kind.as_str())
            .bind(record.id)
            .bind(Json(&record.fields))
            .bind(record.created_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(record)
    }

    async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM crm_records WHERE kind = $1 AND id = $2")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<Stats, StoreError> {
        let total_companies: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
            .fetch_one(&self.pool)
            .await?;
        let per_kind: Vec<(String, i64)> =
            sqlx::query_as("SELECT kind, COUNT(*) FROM crm_records GROUP BY kind")
                .fetch_all(&self.pool)
                .await?;

        let count = |kind: RecordKind| {
            per_kind
                .iter()
                .find(|(k, _)| k == kind.as_str())
                .map(|(_, n)| *n as usize)
                .unwrap_or(0)
        };

        Ok(Stats {
            total_companies: total_companies as usize,
            total_contacts: count(RecordKind::Contact),
            total_job_offers: count(RecordKind::JobOffer),
            total_employees: count(RecordKind::Employee),
            total_tasks: count(RecordKind::Task),
            last_updated: Some(Utc::now()),
        })
    }
}
