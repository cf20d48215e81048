use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::{
    BackendSpec, BackendValidation, QueueFields, QueueOptions, SchedulerFields, SchedulerOptions,
    validate_backend,
};
use crate::error::OnboardError;

/// Shown after every registry write. The daemon reads its app list only at startup.
pub const RESTART_NOTICE: &str = "the compute resource daemon must be restarted for app changes to take effect";

const SPEC_URI_SCHEMES: [&str; 2] = ["http://", "https://"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AppRecord", try_from = "AppRecord")]
pub struct App {
    pub name: String,
    pub spec_uri: String,
    pub backend: BackendSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    pub name: String,
    pub spec_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_batch: Option<QueueOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slurm: Option<SchedulerOptions>,
}

impl From<App> for AppRecord {
    fn from(app: App) -> Self {
        let (aws_batch, slurm) = match app.backend {
            BackendSpec::None => (None, None),
            BackendSpec::Queue(opts) => (Some(opts), None),
            BackendSpec::Scheduler(opts) => (None, Some(opts)),
        };
        Self {
            name: app.name,
            spec_uri: app.spec_uri,
            aws_batch,
            slurm,
        }
    }
}

impl TryFrom<AppRecord> for App {
    type Error = OnboardError;

    fn try_from(record: AppRecord) -> Result<Self, Self::Error> {
        let backend = match (record.aws_batch, record.slurm) {
            (Some(_), Some(_)) => return Err(OnboardError::ConflictingBackends(record.name)),
            (Some(opts), None) => BackendSpec::Queue(opts),
            (None, Some(opts)) => BackendSpec::Scheduler(opts),
            (None, None) => BackendSpec::None,
        };
        Ok(Self {
            name: record.name,
            spec_uri: record.spec_uri,
            backend,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResourceApps {
    pub compute_resource_id: String,
    pub config_version: u64,
    pub apps: Vec<App>,
}

pub trait AppRegistry {
    fn list_apps(&self, compute_resource_id: &str) -> Result<ComputeResourceApps, OnboardError>;
    fn add_app(&self, compute_resource_id: &str, app: App) -> Result<u64, OnboardError>;
    fn update_app(&self, compute_resource_id: &str, app: App) -> Result<u64, OnboardError>;
}

pub fn is_valid_name(candidate: &str, existing: &[App], editing: bool) -> bool {
    if candidate.is_empty() {
        return false;
    }
    // the name of an app being edited is fixed, so it is never checked against itself
    if editing {
        return true;
    }
    !existing.iter().any(|app| app.name == candidate)
}

pub fn find_app<'a>(apps: &'a [App], name: &str) -> Result<&'a App, OnboardError> {
    apps.iter()
        .find(|app| app.name == name)
        .ok_or_else(|| OnboardError::AppNotFound(name.to_string()))
}

pub fn is_valid_spec_uri(spec_uri: &str) -> bool {
    SPEC_URI_SCHEMES
        .iter()
        .any(|scheme| spec_uri.starts_with(scheme))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppDraft {
    pub name: String,
    pub spec_uri: String,
    pub queue: QueueFields,
    pub scheduler: SchedulerFields,
    pub editing: bool,
}

impl AppDraft {
    pub fn edit(app: &App) -> Self {
        let (queue, scheduler) = app.backend.to_fields();
        Self {
            name: app.name.clone(),
            spec_uri: app.spec_uri.clone(),
            queue,
            scheduler,
            editing: true,
        }
    }

    pub fn to_app(&self, existing: &[App]) -> Result<App, OnboardError> {
        let validation = validate_app(self, existing);
        if !validation.valid {
            return Err(OnboardError::InvalidApp(validation.issues().join("; ")));
        }
        Ok(App {
            name: self.name.clone(),
            spec_uri: self.spec_uri.clone(),
            backend: validation.backend.spec,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppValidation {
    pub name_valid: bool,
    pub spec_uri_valid: bool,
    pub backend: BackendValidation,
    pub valid: bool,
}

impl AppValidation {
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.name_valid {
            issues.push("app name is empty or already in use".to_string());
        }
        if !self.spec_uri_valid {
            issues.push("spec uri must start with http:// or https://".to_string());
        }
        issues.extend(self.backend.issues.iter().cloned());
        issues
    }
}

pub fn validate_app(draft: &AppDraft, existing: &[App]) -> AppValidation {
    let name_valid = is_valid_name(&draft.name, existing, draft.editing);
    let spec_uri_valid = is_valid_spec_uri(&draft.spec_uri);
    let backend = validate_backend(&draft.queue, &draft.scheduler);
    let valid = name_valid && spec_uri_valid && backend.valid;
    AppValidation {
        name_valid,
        spec_uri_valid,
        backend,
        valid,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryWrite {
    pub app: App,
    pub config_version: u64,
    pub notice: &'static str,
}

/// Validates `draft` against the resource's current apps and writes it.
pub fn save_app<R: AppRegistry>(
    registry: &R,
    compute_resource_id: &str,
    draft: &AppDraft,
) -> Result<RegistryWrite, OnboardError> {
    let current = registry.list_apps(compute_resource_id)?;
    if draft.editing {
        find_app(&current.apps, &draft.name)?;
    }
    let app = draft.to_app(&current.apps)?;
    let config_version = if draft.editing {
        registry.update_app(compute_resource_id, app.clone())?
    } else {
        registry.add_app(compute_resource_id, app.clone())?
    };

    info!(
        compute_resource_id,
        app = %app.name,
        execution = %app.backend.execution_kind(),
        config_version,
        "saved app"
    );
    warn!("{RESTART_NOTICE}");

    Ok(RegistryWrite {
        app,
        config_version,
        notice: RESTART_NOTICE,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn app(name: &str) -> App {
        App {
            name: name.to_string(),
            spec_uri: "https://example.org/spec.json".to_string(),
            backend: BackendSpec::None,
        }
    }

    #[test]
    fn duplicate_name_rejected_on_create_only() {
        let existing = vec![app("sorter-v1"), app("viz")];
        assert!(!is_valid_name("sorter-v1", &existing, false));
        assert!(is_valid_name("sorter-v2", &existing, false));
        assert!(is_valid_name("sorter-v1", &existing, true));
    }

    #[test]
    fn empty_name_always_rejected() {
        assert!(!is_valid_name("", &[], false));
        assert!(!is_valid_name("", &[], true));
    }

    #[test]
    fn find_app_by_name() {
        let existing = vec![app("sorter-v1"), app("viz")];
        assert_eq!(find_app(&existing, "viz").unwrap().name, "viz");
        assert_matches!(
            find_app(&existing, "ghost"),
            Err(OnboardError::AppNotFound(name)) if name == "ghost"
        );
    }

    #[test]
    fn spec_uri_scheme() {
        assert!(is_valid_spec_uri("https://github.com/org/apps/spec.json"));
        assert!(is_valid_spec_uri("http://localhost:8000/spec.json"));
        assert!(!is_valid_spec_uri(""));
        assert!(!is_valid_spec_uri("ftp://host/spec.json"));
        assert!(!is_valid_spec_uri("spec.json"));
    }

    #[test]
    fn record_with_both_backends_rejected() {
        let json = r#"{
            "name": "sorter",
            "specUri": "https://example.org/spec.json",
            "awsBatch": {"jobQueue": "q", "jobDefinition": "d"},
            "slurm": {"cpusPerTask": 4}
        }"#;
        let err = serde_json::from_str::<App>(json).unwrap_err();
        assert!(err.to_string().contains("both awsBatch and slurm"));

        let record: AppRecord = serde_json::from_str(json).unwrap();
        assert_matches!(
            App::try_from(record),
            Err(OnboardError::ConflictingBackends(name)) if name == "sorter"
        );
    }

    #[test]
    fn app_encodes_active_backend_only() {
        let mut sorter = app("sorter");
        sorter.backend = BackendSpec::Scheduler(SchedulerOptions {
            cpus_per_task: Some(4),
            partition: Some("gpu".to_string()),
            ..SchedulerOptions::default()
        });
        let value = serde_json::to_value(&sorter).unwrap();
        assert_eq!(value["specUri"], "https://example.org/spec.json");
        assert_eq!(value["slurm"]["cpusPerTask"], 4);
        assert_eq!(value["slurm"]["partition"], "gpu");
        assert!(value["slurm"].get("time").is_none());
        assert!(value.get("awsBatch").is_none());

        let decoded: App = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, sorter);
    }

    #[test]
    fn both_backends_make_app_invalid() {
        let draft = AppDraft {
            name: "sorter".to_string(),
            spec_uri: "https://example.org/spec.json".to_string(),
            queue: QueueFields {
                job_queue: "q".to_string(),
                job_definition: "d".to_string(),
            },
            scheduler: SchedulerFields {
                partition: "gpu".to_string(),
                ..SchedulerFields::default()
            },
            editing: false,
        };
        let validation = validate_app(&draft, &[]);
        assert!(validation.name_valid);
        assert!(validation.spec_uri_valid);
        assert!(!validation.valid);
        assert_matches!(draft.to_app(&[]), Err(OnboardError::InvalidApp(_)));
    }

    #[test]
    fn editing_keeps_name_and_backend() {
        let mut existing = app("sorter-v1");
        existing.backend = BackendSpec::Queue(QueueOptions {
            job_queue: "q".to_string(),
            job_definition: "d".to_string(),
        });
        let draft = AppDraft::edit(&existing);
        assert!(draft.editing);
        let rebuilt = draft.to_app(std::slice::from_ref(&existing)).unwrap();
        assert_eq!(rebuilt, existing);
    }
}
