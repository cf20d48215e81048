use std::io::{self, Write};

use serde::Serialize;

use crate::backend::ExecutionKind;
use crate::import::{ImportReport, ProgressEvent, ProgressSink};
use crate::registry::{App, AppValidation, ComputeResourceApps, RegistryWrite};
use crate::store::StoredFile;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub valid: bool,
    pub name_valid: bool,
    pub spec_uri_valid: bool,
    pub backend_valid: bool,
    pub execution: Option<ExecutionKind>,
    pub issues: Vec<String>,
}

impl From<&AppValidation> for ValidationSummary {
    fn from(validation: &AppValidation) -> Self {
        Self {
            valid: validation.valid,
            name_valid: validation.name_valid,
            spec_uri_valid: validation.spec_uri_valid,
            backend_valid: validation.backend.valid,
            execution: validation
                .backend
                .valid
                .then(|| validation.backend.spec.execution_kind()),
            issues: validation.issues(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveResult {
    pub asset_id: String,
    pub candidates: Vec<String>,
    pub resolved: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppListing<'a> {
    pub compute_resource_id: &'a str,
    pub config_version: u64,
    pub apps: Vec<AppListingEntry<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppListingEntry<'a> {
    #[serde(flatten)]
    pub app: &'a App,
    pub execution: ExecutionKind,
}

impl<'a> From<&'a ComputeResourceApps> for AppListing<'a> {
    fn from(apps: &'a ComputeResourceApps) -> Self {
        Self {
            compute_resource_id: &apps.compute_resource_id,
            config_version: apps.config_version,
            apps: apps
                .apps
                .iter()
                .map(|app| AppListingEntry {
                    app,
                    execution: app.backend.execution_kind(),
                })
                .collect(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_import(report: &ImportReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_files(files: &[StoredFile]) -> io::Result<()> {
        Self::print_json(&files)
    }

    pub fn print_apps(apps: &ComputeResourceApps) -> io::Result<()> {
        Self::print_json(&AppListing::from(apps))
    }

    pub fn print_validation(validation: &AppValidation) -> io::Result<()> {
        Self::print_json(&ValidationSummary::from(validation))
    }

    pub fn print_registry_write(write: &RegistryWrite) -> io::Result<()> {
        Self::print_json(write)
    }

    pub fn print_resolve(result: &ResolveResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextProgress;

impl ProgressSink for TextProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => eprintln!("{}", event.message),
        }
    }

    fn files_changed(&self) {
        eprintln!("phase=Done; project files updated");
    }
}
