//! CSV bulk import of companies.
//!
//! Spreadsheet exports use Spanish or English column names, so headers are
//! normalized and matched against alias lists. Only the company name is
//! required; the other fields fall back to the same defaults as the API.

use serde::Serialize;
use thiserror::Error;

use crate::models::NewCompany;

const NAME_ALIASES: &[&str] = &[
    "empresa",
    "nombre_empresa",
    "company",
    "company_name",
    "nombre",
    "name",
];
const EMAIL_ALIASES: &[&str] = &["email", "email_contacto", "contact_email", "correo", "e_mail"];
const PHONE_ALIASES: &[&str] = &["telefono", "phone", "movil", "telefono_contacto"];
const SECTOR_ALIASES: &[&str] = &["sector", "industry", "industria"];
const CITY_ALIASES: &[&str] = &["ciudad", "city", "ubicacion", "location"];

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("CSV has no company name column (expected one of: {})", NAME_ALIASES.join(", "))]
    MissingNameColumn,

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct CsvImport {
    /// Normalized rows ready for the store.
    pub rows: Vec<NewCompany>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Default)]
struct ColumnMap {
    name: usize,
    email: Option<usize>,
    phone: Option<usize>,
    sector: Option<usize>,
    city: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, CsvImportError> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
        };

        Ok(ColumnMap {
            name: find(NAME_ALIASES).ok_or(CsvImportError::MissingNameColumn)?,
            email: find(EMAIL_ALIASES),
            phone: find(PHONE_ALIASES),
            sector: find(SECTOR_ALIASES),
            city: find(CITY_ALIASES),
        })
    }

    fn company(&self, record: &csv::StringRecord) -> NewCompany {
        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };
        NewCompany {
            name: field(Some(self.name)),
            email: field(self.email),
            phone: field(self.phone),
            sector: field(self.sector),
            city: field(self.city),
        }
    }
}

/// Parses an uploaded CSV file into company rows.
///
/// The delimiter is sniffed from the header line (`;` exports from Excel are
/// common). Rows with a blank name or unreadable content are reported in
/// `skipped` with their 1-based line number.
pub fn parse_companies(data: &[u8]) -> Result<CsvImport, CsvImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(data))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let columns = ColumnMap::from_headers(reader.headers()?)?;
    let mut import = CsvImport::default();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                import.skipped.push(SkippedRow {
                    line,
                    reason: format!("unreadable row: {e}"),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        match columns.company(&record).normalized() {
            Ok(company) => import.rows.push(company),
            Err(reason) => import.skipped.push(SkippedRow { line, reason }),
        }
    }

    Ok(import)
}

fn sniff_delimiter(data: &[u8]) -> u8 {
    let header = data.split(|b| *b == b'\n').next().unwrap_or_default();
    let count = |d: u8| header.iter().filter(|b| **b == d).count();
    if count(b';') > count(b',') {
        b';'
    } else {
        b','
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            ' ' | '-' | '.' => '_',
            other => other,
        })
        .collect()
}
