use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The loosely-typed collections stored next to companies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Contact,
    JobOffer,
    Employee,
    Task,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Contact,
        RecordKind::JobOffer,
        RecordKind::Employee,
        RecordKind::Task,
    ];

    /// URL segment under `/api/`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            RecordKind::Contact => "contacts",
            RecordKind::JobOffer => "job-offers",
            RecordKind::Employee => "employees",
            RecordKind::Task => "tasks",
        }
    }

    /// Value of the `kind` column in the database backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Contact => "contact",
            RecordKind::JobOffer => "job_offer",
            RecordKind::Employee => "employee",
            RecordKind::Task => "task",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Contact => "Contact",
            RecordKind::JobOffer => "Job offer",
            RecordKind::Employee => "Employee",
            RecordKind::Task => "Task",
        }
    }
}

/// A contact, job offer, employee or task. Only `id` and `created_at` are
/// owned by the server; every other field is kept as submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EntityRecord {
    pub fn new(id: i64, mut fields: Map<String, Value>, created_at: DateTime<Utc>) -> Self {
        // server-owned keys
        fields.remove("id");
        fields.remove("created_at");
        EntityRecord {
            id,
            created_at,
            fields,
        }
    }
}
