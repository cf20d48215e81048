use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::OnboardError;
use crate::import::{ImportProvenance, ImportedFile};
use crate::registry::{App, AppRecord, AppRegistry, ComputeResourceApps};

pub trait FileStore {
    fn create_file(&self, project_id: &str, file: &ImportedFile) -> Result<(), OnboardError>;
}

impl<T: FileStore + ?Sized> FileStore for &T {
    fn create_file(&self, project_id: &str, file: &ImportedFile) -> Result<(), OnboardError> {
        (**self).create_file(project_id, file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub project_id: String,
    pub file_name: String,
    pub content: String,
    pub metadata: ImportProvenance,
    pub created_at: String,
    pub tool: String,
}

#[derive(Deserialize)]
struct StoredApps {
    compute_resource_id: String,
    #[serde(default)]
    config_version: u64,
    #[serde(default)]
    apps: Vec<AppRecord>,
}

#[derive(Debug, Clone)]
pub struct Store {
    project_root: Utf8PathBuf,
    registry_root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, OnboardError> {
        let cwd =
            std::env::current_dir().map_err(|err| OnboardError::Filesystem(err.to_string()))?;
        let project_root = Utf8PathBuf::from_path_buf(cwd.join(".neuro-onboard"))
            .map_err(|_| OnboardError::Filesystem("invalid project path".to_string()))?;

        let registry_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.data_local_dir().join("neuro-onboard")).ok()
            })
            .ok_or_else(|| {
                OnboardError::Filesystem("unable to resolve registry directory".to_string())
            })?;

        Ok(Self {
            project_root,
            registry_root,
        })
    }

    pub fn new_with_paths(project_root: Utf8PathBuf, registry_root: Utf8PathBuf) -> Self {
        Self {
            project_root,
            registry_root,
        }
    }

    pub fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    pub fn registry_root(&self) -> &Utf8Path {
        &self.registry_root
    }

    pub fn project_files_dir(&self, project_id: &str) -> Utf8PathBuf {
        self.project_root
            .join("projects")
            .join(project_id)
            .join("files")
    }

    pub fn project_file_path(
        &self,
        project_id: &str,
        file_name: &str,
    ) -> Result<Utf8PathBuf, OnboardError> {
        let relative = Utf8Path::new(file_name);
        let is_enclosed = !file_name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Utf8Component::Normal(_)));
        if !is_enclosed || !is_plain_id(project_id) {
            return Err(OnboardError::Filesystem(format!(
                "file name escapes project directory: {project_id}/{file_name}"
            )));
        }
        Ok(self
            .project_files_dir(project_id)
            .join(format!("{file_name}.json")))
    }

    pub fn compute_resource_path(
        &self,
        compute_resource_id: &str,
    ) -> Result<Utf8PathBuf, OnboardError> {
        if !is_plain_id(compute_resource_id) {
            return Err(OnboardError::Filesystem(format!(
                "invalid compute resource id: {compute_resource_id}"
            )));
        }
        Ok(self
            .registry_root
            .join("compute-resources")
            .join(format!("{compute_resource_id}.json")))
    }

    pub fn list_files(&self, project_id: &str) -> Result<Vec<StoredFile>, OnboardError> {
        let root = self.project_files_dir(project_id);
        if !root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for path in walk_dir(root.as_std_path())? {
            if path.is_file() && path.extension().map(|ext| ext == "json").unwrap_or(false) {
                let content = fs::read_to_string(&path)
                    .map_err(|err| OnboardError::Filesystem(err.to_string()))?;
                let stored: StoredFile = serde_json::from_str(&content)
                    .map_err(|err| OnboardError::Filesystem(err.to_string()))?;
                entries.push(stored);
            }
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    pub fn write_json_atomic<T: Serialize>(
        path: &Utf8Path,
        value: &T,
    ) -> Result<(), OnboardError> {
        let parent = path
            .parent()
            .ok_or_else(|| OnboardError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| OnboardError::Filesystem(err.to_string()))?;
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| OnboardError::Filesystem(err.to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix("neuro-onboard")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| OnboardError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), &content)
            .map_err(|err| OnboardError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| OnboardError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn write_apps(&self, apps: &ComputeResourceApps) -> Result<(), OnboardError> {
        Self::write_json_atomic(&self.compute_resource_path(&apps.compute_resource_id)?, apps)
    }
}

impl FileStore for Store {
    fn create_file(&self, project_id: &str, file: &ImportedFile) -> Result<(), OnboardError> {
        let path = self.project_file_path(project_id, &file.file_name)?;
        let stored = StoredFile {
            project_id: project_id.to_string(),
            file_name: file.file_name.clone(),
            content: file.content(),
            metadata: file.metadata.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("neuro-onboard/{}", env!("CARGO_PKG_VERSION")),
        };
        Self::write_json_atomic(&path, &stored)
    }
}

impl AppRegistry for Store {
    fn list_apps(&self, compute_resource_id: &str) -> Result<ComputeResourceApps, OnboardError> {
        let path = self.compute_resource_path(compute_resource_id)?;
        if !path.as_std_path().exists() {
            return Ok(ComputeResourceApps {
                compute_resource_id: compute_resource_id.to_string(),
                ..ComputeResourceApps::default()
            });
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| OnboardError::Filesystem(err.to_string()))?;
        let stored: StoredApps = serde_json::from_str(&content)
            .map_err(|err| OnboardError::Filesystem(err.to_string()))?;
        let apps = stored
            .apps
            .into_iter()
            .map(App::try_from)
            .collect::<Result<Vec<_>, OnboardError>>()?;
        Ok(ComputeResourceApps {
            compute_resource_id: stored.compute_resource_id,
            config_version: stored.config_version,
            apps,
        })
    }

    fn add_app(&self, compute_resource_id: &str, app: App) -> Result<u64, OnboardError> {
        let mut current = self.list_apps(compute_resource_id)?;
        if current.apps.iter().any(|existing| existing.name == app.name) {
            return Err(OnboardError::DuplicateApp(app.name));
        }
        current.apps.push(app);
        current.config_version += 1;
        self.write_apps(&current)?;
        Ok(current.config_version)
    }

    fn update_app(&self, compute_resource_id: &str, app: App) -> Result<u64, OnboardError> {
        let mut current = self.list_apps(compute_resource_id)?;
        let slot = current
            .apps
            .iter_mut()
            .find(|existing| existing.name == app.name)
            .ok_or_else(|| OnboardError::AppNotFound(app.name.clone()))?;
        *slot = app;
        current.config_version += 1;
        self.write_apps(&current)?;
        Ok(current.config_version)
    }
}

fn is_plain_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}

fn walk_dir(root: &Path) -> Result<Vec<PathBuf>, OnboardError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries =
            fs::read_dir(&path).map_err(|err| OnboardError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| OnboardError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            items.push(path);
        }
    }
    Ok(items)
}
