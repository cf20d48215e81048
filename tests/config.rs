use assert_matches::assert_matches;

use neuro_onboard::config::{AssetEntry, AssetEntryObject, Manifest, ManifestLoader};
use neuro_onboard::domain::CatalogEnvironment;
use neuro_onboard::error::OnboardError;

#[test]
fn parse_manifest_shorthand_and_detailed() {
    let manifest = Manifest {
        schema_version: None,
        project_id: " proj-1 ".to_string(),
        assets: vec![
            AssetEntry::Shorthand("staging:000409/draft/a1/sub-01/ecephys.nwb".to_string()),
            AssetEntry::Detailed(AssetEntryObject {
                dataset_id: "000123".to_string(),
                version: "0.230101.1200".to_string(),
                asset_id: "b2".to_string(),
                path: "sub-02/behavior.nwb".to_string(),
                staging: false,
            }),
        ],
    };

    let resolved = ManifestLoader::resolve_manifest(manifest).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.project_id, "proj-1");
    assert_eq!(resolved.assets[0].environment, CatalogEnvironment::Staging);
    assert_eq!(resolved.assets[0].asset_path, "sub-01/ecephys.nwb");
    assert_eq!(resolved.assets[1].environment, CatalogEnvironment::Production);
    assert_eq!(resolved.assets[1].dataset_id.as_str(), "000123");
}

#[test]
fn empty_project_id_rejected() {
    let manifest = Manifest {
        schema_version: Some(1),
        project_id: "  ".to_string(),
        assets: Vec::new(),
    };
    assert_matches!(
        ManifestLoader::resolve_manifest(manifest),
        Err(OnboardError::ManifestParse(_))
    );
}

#[test]
fn detailed_entry_needs_every_field() {
    let manifest = Manifest {
        schema_version: None,
        project_id: "proj-1".to_string(),
        assets: vec![AssetEntry::Detailed(AssetEntryObject {
            dataset_id: "000123".to_string(),
            version: "draft".to_string(),
            asset_id: String::new(),
            path: "x.nwb".to_string(),
            staging: false,
        })],
    };
    assert_matches!(
        ManifestLoader::resolve_manifest(manifest),
        Err(OnboardError::InvalidAssetReference(_))
    );
}

#[test]
fn load_manifest_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("onboard.json");
    std::fs::write(
        &path,
        r#"{"schema_version": 2, "project_id": "proj-7", "assets": ["000409/draft/a1/a.nwb"]}"#,
    )
    .unwrap();

    let resolved = ManifestLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.schema_version, 2);
    assert_eq!(resolved.project_id, "proj-7");
    assert_eq!(resolved.assets.len(), 1);
}

#[test]
fn unreadable_or_malformed_manifest() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("absent.json");
    assert_matches!(
        ManifestLoader::resolve(missing.to_str()),
        Err(OnboardError::ManifestRead(_))
    );

    let broken = temp.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    assert_matches!(
        ManifestLoader::resolve(broken.to_str()),
        Err(OnboardError::ManifestParse(_))
    );
}
