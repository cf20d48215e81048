use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use neuro_onboard::backend::{BackendSpec, ExecutionKind, QueueFields, SchedulerFields};
use neuro_onboard::error::OnboardError;
use neuro_onboard::registry::{
    AppDraft, AppRegistry, RESTART_NOTICE, find_app, is_valid_name, save_app, validate_app,
};
use neuro_onboard::store::Store;

fn temp_store() -> (tempfile::TempDir, Store) {
    let temp = tempfile::tempdir().unwrap();
    let project_root = Utf8PathBuf::from_path_buf(temp.path().join("project")).unwrap();
    let registry_root = Utf8PathBuf::from_path_buf(temp.path().join("registry")).unwrap();
    (temp, Store::new_with_paths(project_root, registry_root))
}

fn queue_draft(name: &str) -> AppDraft {
    AppDraft {
        name: name.to_string(),
        spec_uri: "https://github.com/lab/apps/blob/main/sorter/spec.json".to_string(),
        queue: QueueFields {
            job_queue: "gpu-queue".to_string(),
            job_definition: "sorter-job:3".to_string(),
        },
        ..AppDraft::default()
    }
}

#[test]
fn save_new_app_bumps_config_version() {
    let (_temp, store) = temp_store();

    let write = save_app(&store, "cr-1", &queue_draft("sorter-v1")).unwrap();
    assert_eq!(write.config_version, 1);
    assert_eq!(write.notice, RESTART_NOTICE);
    assert_eq!(write.app.backend.execution_kind(), ExecutionKind::Queue);

    let listed = store.list_apps("cr-1").unwrap();
    assert_eq!(listed.compute_resource_id, "cr-1");
    assert_eq!(listed.config_version, 1);
    assert_eq!(listed.apps, vec![write.app]);
}

#[test]
fn duplicate_name_is_rejected_before_writing() {
    let (_temp, store) = temp_store();
    save_app(&store, "cr-1", &queue_draft("sorter-v1")).unwrap();

    let existing = store.list_apps("cr-1").unwrap().apps;
    assert!(!is_valid_name("sorter-v1", &existing, false));

    let err = save_app(&store, "cr-1", &queue_draft("sorter-v1")).unwrap_err();
    assert_matches!(err, OnboardError::InvalidApp(_));
    assert_eq!(store.list_apps("cr-1").unwrap().config_version, 1);

    // the same name on another compute resource is fine
    assert!(save_app(&store, "cr-2", &queue_draft("sorter-v1")).is_ok());
}

#[test]
fn registry_add_rejects_duplicates_directly() {
    let (_temp, store) = temp_store();
    let app = queue_draft("viz").to_app(&[]).unwrap();
    store.add_app("cr-1", app.clone()).unwrap();
    assert_matches!(
        store.add_app("cr-1", app),
        Err(OnboardError::DuplicateApp(name)) if name == "viz"
    );
}

#[test]
fn editing_switches_backend_and_keeps_name() {
    let (_temp, store) = temp_store();
    save_app(&store, "cr-1", &queue_draft("sorter-v1")).unwrap();

    let existing = store.list_apps("cr-1").unwrap().apps.remove(0);
    let mut draft = AppDraft::edit(&existing);
    draft.queue = QueueFields::default();
    draft.scheduler = SchedulerFields {
        cpus_per_task: "8".to_string(),
        partition: "general".to_string(),
        ..SchedulerFields::default()
    };

    let validation = validate_app(&draft, std::slice::from_ref(&existing));
    assert!(validation.valid);

    let write = save_app(&store, "cr-1", &draft).unwrap();
    assert_eq!(write.config_version, 2);

    let listed = store.list_apps("cr-1").unwrap();
    assert_eq!(listed.apps.len(), 1);
    assert_eq!(listed.apps[0].name, "sorter-v1");
    assert_eq!(
        listed.apps[0].backend.scheduler().unwrap().cpus_per_task,
        Some(8)
    );
}

#[test]
fn editing_unknown_app_fails() {
    let (_temp, store) = temp_store();
    let mut draft = queue_draft("ghost");
    draft.editing = true;
    assert_matches!(
        save_app(&store, "cr-1", &draft),
        Err(OnboardError::AppNotFound(_))
    );
}

#[test]
fn edit_target_must_exist_before_validation() {
    let (_temp, store) = temp_store();
    save_app(&store, "cr-1", &queue_draft("sorter-v1")).unwrap();
    let current = store.list_apps("cr-1").unwrap();

    let existing = find_app(&current.apps, "sorter-v1").unwrap();
    assert!(validate_app(&AppDraft::edit(existing), &current.apps).valid);

    assert_matches!(
        find_app(&current.apps, "sorter-v2"),
        Err(OnboardError::AppNotFound(name)) if name == "sorter-v2"
    );
    assert_eq!(store.list_apps("cr-1").unwrap().config_version, 1);
}

#[test]
fn invalid_backend_writes_nothing() {
    let (_temp, store) = temp_store();
    let mut draft = queue_draft("sorter-v1");
    draft.queue.job_definition.clear();

    assert_matches!(
        save_app(&store, "cr-1", &draft),
        Err(OnboardError::InvalidApp(_))
    );
    assert!(
        !store
            .compute_resource_path("cr-1")
            .unwrap()
            .as_std_path()
            .exists()
    );
}

#[test]
fn app_without_backend_runs_locally() {
    let (_temp, store) = temp_store();
    let draft = AppDraft {
        name: "viz".to_string(),
        spec_uri: "http://localhost:8000/spec.json".to_string(),
        ..AppDraft::default()
    };
    let write = save_app(&store, "cr-1", &draft).unwrap();
    assert_eq!(write.app.backend, BackendSpec::None);
    assert_eq!(write.app.backend.execution_kind(), ExecutionKind::Local);
}

#[test]
fn stored_record_with_both_backends_is_refused_on_load() {
    let (_temp, store) = temp_store();
    let path = store.compute_resource_path("cr-1").unwrap();
    std::fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
    std::fs::write(
        path.as_std_path(),
        r#"{
            "compute_resource_id": "cr-1",
            "config_version": 3,
            "apps": [{
                "name": "sorter",
                "specUri": "https://example.org/spec.json",
                "awsBatch": {"jobQueue": "q", "jobDefinition": "d"},
                "slurm": {"partition": "gpu"}
            }]
        }"#,
    )
    .unwrap();

    assert_matches!(
        store.list_apps("cr-1"),
        Err(OnboardError::ConflictingBackends(name)) if name == "sorter"
    );
}
