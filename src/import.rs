use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{CatalogClient, CatalogHosts};
use crate::domain::AssetReference;
use crate::error::OnboardError;
use crate::resolver::resolve_asset_url;
use crate::store::FileStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProvenance {
    #[serde(rename = "dandisetId")]
    pub dataset_id: String,
    #[serde(rename = "dandisetVersion")]
    pub dataset_version: String,
    #[serde(rename = "dandiAssetId")]
    pub asset_id: String,
    #[serde(rename = "dandiAssetPath")]
    pub asset_path: String,
    #[serde(rename = "dandiStaging")]
    pub staging: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedFile {
    pub file_name: String,
    pub source_url: String,
    pub metadata: ImportProvenance,
}

impl ImportedFile {
    pub fn from_reference(reference: &AssetReference, source_url: String) -> Self {
        Self {
            file_name: imported_file_name(reference),
            source_url,
            metadata: ImportProvenance {
                dataset_id: reference.dataset_id.as_str().to_string(),
                dataset_version: reference.version.clone(),
                asset_id: reference.asset_id.clone(),
                asset_path: reference.asset_path.clone(),
                staging: reference.environment.is_staging(),
            },
        }
    }

    pub fn content(&self) -> String {
        format!("url:{}", self.source_url)
    }
}

pub fn imported_file_name(reference: &AssetReference) -> String {
    format!(
        "imported/{}{}/{}",
        reference.environment.file_name_prefix(),
        reference.dataset_id.as_str(),
        reference.asset_path
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAsset {
    pub index: usize,
    pub asset_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: Vec<ImportedFile>,
    pub skipped: Vec<SkippedAsset>,
    /// Index of the item whose record had no download URL. Items after it were not processed.
    pub halted_at: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);

    fn files_changed(&self) {}
}

pub struct ImportReconciler<C: CatalogClient, F: FileStore> {
    catalog: C,
    files: F,
    hosts: CatalogHosts,
}

impl<C: CatalogClient, F: FileStore> ImportReconciler<C, F> {
    pub fn new(catalog: C, files: F) -> Self {
        let hosts = catalog.hosts();
        Self {
            catalog,
            files,
            hosts,
        }
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    /// Imports `items` into `project_id`, one at a time and in order.
    ///
    /// A failed catalog fetch skips that item. A record without any download
    /// URL stops the whole batch; files written before it are kept.
    pub fn import_assets(
        &self,
        project_id: &str,
        items: &[AssetReference],
        sink: &dyn ProgressSink,
    ) -> Result<ImportReport, OnboardError> {
        let result = self.reconcile(project_id, items, sink);
        sink.files_changed();
        result
    }

    fn reconcile(
        &self,
        project_id: &str,
        items: &[AssetReference],
        sink: &dyn ProgressSink,
    ) -> Result<ImportReport, OnboardError> {
        let mut report = ImportReport::default();

        for (index, item) in items.iter().enumerate() {
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Resolve; {} asset {} ({})",
                    item.dataset_id, item.asset_id, item.environment
                ),
                elapsed: None,
            });

            let start = Instant::now();
            let record = match self.catalog.fetch_asset(item) {
                Ok(record) => record,
                Err(err) => {
                    warn!(index, asset_id = %item.asset_id, error = %err, "skipping asset");
                    report.skipped.push(SkippedAsset {
                        index,
                        asset_id: item.asset_id.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            let latency = start.elapsed();

            let Some(source_url) = resolve_asset_url(&record, item.environment, &self.hosts)
            else {
                warn!(
                    index,
                    asset_id = %item.asset_id,
                    remaining = items.len() - index - 1,
                    "asset has no download url; stopping import"
                );
                sink.event(ProgressEvent {
                    message: format!("phase=Resolve; no download url for {}", item.asset_id),
                    elapsed: Some(latency),
                });
                report.halted_at = Some(index);
                break;
            };

            let file = ImportedFile::from_reference(item, source_url);
            debug!(file_name = %file.file_name, url = %file.source_url, "creating file");
            sink.event(ProgressEvent {
                message: format!("phase=Store; {}", file.file_name),
                elapsed: Some(latency),
            });
            self.files.create_file(project_id, &file)?;
            report.imported.push(file);
        }

        Ok(report)
    }
}
