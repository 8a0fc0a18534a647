//! Axum route handlers for the CRM API.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::crm::csv_import::{parse_companies, SkippedRow};
use crate::email::{templates, OutboundEmail};
use crate::errors::{AppError, AppJson, AppPath};
use crate::models::{Company, EntityRecord, NewCompany, RecordKind, Stats};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CompanyListResponse {
    pub companies: Vec<Company>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordListResponse {
    pub records: Vec<EntityRecord>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
    pub total_companies: usize,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    CandidateWelcome,
    CompanyWelcome,
}

#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub template: NotificationTemplate,
    pub to: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub sent: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Companies
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/companies
pub async fn handle_list_companies(
    State(state): State<AppState>,
) -> Result<Json<CompanyListResponse>, AppError> {
    let companies = state.store.list_companies().await?;
    Ok(Json(CompanyListResponse {
        total: companies.len(),
        companies,
    }))
}

/// POST /api/companies
pub async fn handle_create_company(
    State(state): State<AppState>,
    AppJson(request): AppJson<NewCompany>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    let new = request.normalized().map_err(AppError::Validation)?;
    let company = state.store.create_company(new).await?;

    notify_new_company(&state, &company);

    Ok((StatusCode::CREATED, Json(company)))
}

/// DELETE /api/companies/:id
pub async fn handle_delete_company(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    if state.store.delete_company(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Company {id} not found")))
    }
}

/// POST /api/companies/import
///
/// Multipart upload; the CSV is read from the `file` field.
pub async fn handle_import_companies(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportResponse>, AppError> {
    let mut multipart = multipart?;
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            data = Some(bytes);
            break;
        }
    }
    let data = data.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    let import = parse_companies(&data).map_err(|e| AppError::Validation(e.to_string()))?;
    let created = state.store.import_companies(import.rows).await?;
    let total_companies = state.store.stats().await?.total_companies;

    info!(
        "CSV import: {} imported, {} skipped",
        created.len(),
        import.skipped.len()
    );

    Ok(Json(ImportResponse {
        imported: created.len(),
        skipped: import.skipped,
        total_companies,
    }))
}

/// Emails the company contact and the admin mailbox without blocking the
/// response.
fn notify_new_company(state: &AppState, company: &Company) {
    if !state.email.is_configured() {
        return;
    }

    let mut outbound = Vec::new();
    if !company.email.is_empty() {
        outbound.push(OutboundEmail {
            to: company.email.clone(),
            to_name: Some(company.name.clone()),
            content: templates::company_welcome(&company.name),
        });
    }
    if let Some(admin) = &state.config.notify_email {
        outbound.push(OutboundEmail {
            to: admin.clone(),
            to_name: None,
            content: templates::new_company_alert(company),
        });
    }

    let client = state.email.clone();
    tokio::spawn(async move {
        for email in &outbound {
            client.send(email).await;
        }
    });
}

// ────────────────────────────────────────────────────────────────────────────
// Contacts, job offers, employees, tasks
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/{kind}
pub async fn handle_list_records(
    State(state): State<AppState>,
    kind: RecordKind,
) -> Result<Json<RecordListResponse>, AppError> {
    let records = state.store.list_records(kind).await?;
    Ok(Json(RecordListResponse {
        total: records.len(),
        records,
    }))
}

/// POST /api/{kind}
pub async fn handle_create_record(
    State(state): State<AppState>,
    kind: RecordKind,
    AppJson(body): AppJson<Value>,
) -> Result<(StatusCode, Json<EntityRecord>), AppError> {
    let Value::Object(fields) = body else {
        return Err(AppError::Validation(format!(
            "{} must be a JSON object",
            kind.label()
        )));
    };
    let record = state.store.create_record(kind, fields).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /api/{kind}/:id
pub async fn handle_delete_record(
    State(state): State<AppState>,
    kind: RecordKind,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    if state.store.delete_record(kind, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("{} {id} not found", kind.label())))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stats and notifications
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/stats
pub async fn handle_stats(State(state): State<AppState>) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.store.stats().await?))
}

/// POST /api/notifications
pub async fn handle_send_notification(
    State(state): State<AppState>,
    AppJson(request): AppJson<NotificationRequest>,
) -> Result<Json<NotificationResponse>, AppError> {
    let to = request.to.trim();
    if !to.contains('@') {
        return Err(AppError::Validation(format!("Invalid recipient '{to}'")));
    }

    let content = match request.template {
        NotificationTemplate::CandidateWelcome => templates::candidate_welcome(&request.name),
        NotificationTemplate::CompanyWelcome => templates::company_welcome(&request.name),
    };
    let name = request.name.trim();
    let email = OutboundEmail {
        to: to.to_string(),
        to_name: (!name.is_empty()).then(|| name.to_string()),
        content,
    };

    Ok(Json(NotificationResponse {
        sent: state.email.send(&email).await,
    }))
}
