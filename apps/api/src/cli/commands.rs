//! Subcommand arguments and their implementations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{error, info, warn};

use crate::checks::{run_checks, CheckManifest};
use crate::config::Config;
use crate::crm::csv_import::parse_companies;
use crate::deploy::{stop_processes, write_artifacts, DeployTarget};
use crate::store::open_store;

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// CSV file with a header row
    pub file: PathBuf,

    /// Parse and report without writing to the store
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let data = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let import = parse_companies(&data)?;

        for skipped in &import.skipped {
            warn!("Line {}: {}", skipped.line, skipped.reason);
        }

        if self.dry_run {
            info!(
                "[dry-run] {} rows valid, {} skipped",
                import.rows.len(),
                import.skipped.len()
            );
            return Ok(());
        }

        let store = open_store(config).await?;
        let created = store.import_companies(import.rows).await?;
        let total = store.stats().await?.total_companies;
        info!(
            "Imported {} companies ({} skipped); store now holds {}",
            created.len(),
            import.skipped.len(),
            total
        );
        Ok(())
    }
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// JSON manifest of forms and routes (built-in DiversIA manifest if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Directory the manifest paths are relative to (defaults to the manifest's directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    pub fn base_dir(&self) -> PathBuf {
        if let Some(root) = &self.root {
            return root.clone();
        }
        self.manifest
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn run(&self) -> Result<()> {
        let manifest = match &self.manifest {
            Some(path) => CheckManifest::load(path)?,
            None => CheckManifest::builtin(),
        };
        let report = run_checks(&manifest, &self.base_dir());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        for item in report.failures() {
            match &item.error {
                Some(e) => error!("{}: {e}", item.file.display()),
                None => error!(
                    "{}: missing {:?} {}",
                    item.file.display(),
                    item.kind,
                    item.missing.join(", ")
                ),
            }
        }

        let failed = report.failures().count();
        if failed > 0 {
            bail!("{failed} of {} checks failed", report.items.len());
        }
        info!("All {} checks passed", report.items.len());
        Ok(())
    }
}

/// Deploy command arguments.
#[derive(Debug, Args)]
pub struct DeployCommand {
    /// Output directory for the generated files
    #[arg(short, long, default_value = "deploy")]
    pub out: PathBuf,

    /// Public domain of the new host
    #[arg(long)]
    pub domain: Option<String>,

    /// Port the service will listen on
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Installation directory on the host
    #[arg(long, default_value = "/opt/diversia")]
    pub install_dir: PathBuf,

    /// System user running the service
    #[arg(long, default_value = "diversia")]
    pub user: String,

    /// Stop processes whose command line matches this pattern (pkill -f)
    #[arg(long, value_name = "PATTERN")]
    pub stop_legacy: Option<String>,

    /// Log the process shutdown instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

impl DeployCommand {
    pub async fn run(&self) -> Result<()> {
        if let Some(pattern) = &self.stop_legacy {
            stop_processes(pattern, self.dry_run).await?;
        }

        let target = DeployTarget {
            domain: self.domain.clone(),
            port: self.port,
            install_dir: self.install_dir.clone(),
            user: self.user.clone(),
            ..Default::default()
        };
        let written = write_artifacts(&self.out, &target)?;
        info!(
            "Wrote {} deployment files to {}",
            written.len(),
            self.out.display()
        );
        Ok(())
    }
}
