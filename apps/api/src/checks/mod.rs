//! Pre-deployment text checks.
//!
//! Scans form templates for the input names the API expects and frontend
//! sources for the API paths they should call. Pure substring matching: no
//! HTML or JS parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Files to check and what each must contain. Paths are relative to the
/// manifest's directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckManifest {
    #[serde(default)]
    pub forms: Vec<FormSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSpec {
    pub template: PathBuf,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    pub source: PathBuf,
    pub expected: Vec<String>,
}

impl CheckManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// The DiversIA registration forms and the CRM frontend script.
    pub fn builtin() -> Self {
        let fields = |names: &[&str]| -> Vec<String> {
            names.iter().map(|n| n.to_string()).collect()
        };
        CheckManifest {
            forms: vec![
                FormSpec {
                    template: PathBuf::from("templates/registro_persona.html"),
                    fields: fields(&[
                        "nombre",
                        "apellidos",
                        "email",
                        "telefono",
                        "ciudad",
                        "tipo_neurodivergencia",
                        "diagnostico_formal",
                        "experiencia_laboral",
                        "formacion_academica",
                    ]),
                },
                FormSpec {
                    template: PathBuf::from("templates/registro_empresa.html"),
                    fields: fields(&[
                        "nombre_empresa",
                        "email_contacto",
                        "telefono",
                        "sector",
                        "ciudad",
                    ]),
                },
            ],
            routes: vec![RouteSpec {
                source: PathBuf::from("static/js/crm.js"),
                expected: fields(&[
                    "/api/companies",
                    "/api/companies/import",
                    "/api/contacts",
                    "/api/job-offers",
                    "/api/employees",
                    "/api/tasks",
                    "/api/stats",
                ]),
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    FormFields,
    Routes,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItem {
    pub kind: CheckKind,
    pub file: PathBuf,
    pub missing: Vec<String>,
    /// Set when the file could not be read.
    pub error: Option<String>,
}

impl CheckItem {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.missing.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub items: Vec<CheckItem>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.items.iter().all(CheckItem::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckItem> {
        self.items.iter().filter(|i| !i.passed())
    }
}

/// Fields with no `name="…"` (or single-quoted) attribute in the template.
pub fn check_form_fields(html: &str, fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| {
            let double = format!("name=\"{field}\"");
            let single = format!("name='{field}'");
            !html.contains(&double) && !html.contains(&single)
        })
        .cloned()
        .collect()
}

/// Routes that never appear as a quoted path literal in the source. A route
/// counts when an opening quote (`"`, `'` or backtick) is followed by the
/// path and then a closing quote or a query string.
pub fn check_routes(source: &str, routes: &[String]) -> Vec<String> {
    routes
        .iter()
        .filter(|route| !contains_route_literal(source, route))
        .cloned()
        .collect()
}

fn contains_route_literal(source: &str, route: &str) -> bool {
    const QUOTES: [char; 3] = ['"', '\'', '`'];
    source.match_indices(route).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = source[start + route.len()..].chars().next();
        matches!(before, Some(c) if QUOTES.contains(&c))
            && matches!(after, Some(c) if QUOTES.contains(&c) || c == '?')
    })
}

/// Runs every check in the manifest. Unreadable files become failed items.
pub fn run_checks(manifest: &CheckManifest, base_dir: &Path) -> CheckReport {
    let mut report = CheckReport::default();

    for form in &manifest.forms {
        report.items.push(check_file(
            CheckKind::FormFields,
            base_dir,
            &form.template,
            |text| check_form_fields(text, &form.fields),
        ));
    }
    for routes in &manifest.routes {
        report.items.push(check_file(
            CheckKind::Routes,
            base_dir,
            &routes.source,
            |text| check_routes(text, &routes.expected),
        ));
    }

    report
}

fn check_file(
    kind: CheckKind,
    base_dir: &Path,
    file: &Path,
    check: impl FnOnce(&str) -> Vec<String>,
) -> CheckItem {
    let path = base_dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(text) => CheckItem {
            kind,
            file: file.to_path_buf(),
            missing: check(&text),
            error: None,
        },
        Err(e) => CheckItem {
            kind,
            file: file.to_path_buf(),
            missing: Vec::new(),
            error: Some(format!("cannot read {}: {e}", path.display())),
        },
    }
}
