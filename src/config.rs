use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{AssetReference, CatalogEnvironment};
use crate::error::OnboardError;

pub const DEFAULT_MANIFEST: &str = "neuro-onboard.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(default)]
    pub schema_version: Option<u32>,
    pub project_id: String,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AssetEntry {
    Shorthand(String),
    Detailed(AssetEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AssetEntryObject {
    pub dataset_id: String,
    pub version: String,
    pub asset_id: String,
    pub path: String,
    #[serde(default)]
    pub staging: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub schema_version: u32,
    pub project_id: String,
    pub assets: Vec<AssetReference>,
}

pub struct ManifestLoader;

impl ManifestLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedManifest, OnboardError> {
        let manifest_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_MANIFEST),
        };

        if path.is_none() && !manifest_path.exists() {
            return Err(OnboardError::MissingManifest);
        }

        let content = fs::read_to_string(&manifest_path)
            .map_err(|_| OnboardError::ManifestRead(manifest_path.clone()))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .map_err(|err| OnboardError::ManifestParse(err.to_string()))?;

        Self::resolve_manifest(manifest)
    }

    pub fn resolve_manifest(manifest: Manifest) -> Result<ResolvedManifest, OnboardError> {
        if manifest.project_id.trim().is_empty() {
            return Err(OnboardError::ManifestParse(
                "project_id must not be empty".to_string(),
            ));
        }

        let assets = manifest
            .assets
            .into_iter()
            .map(|entry| match entry {
                AssetEntry::Shorthand(value) => value.parse(),
                AssetEntry::Detailed(obj) => {
                    if obj.version.is_empty() || obj.asset_id.is_empty() || obj.path.is_empty() {
                        return Err(OnboardError::InvalidAssetReference(format!(
                            "{}/{}/{}/{}",
                            obj.dataset_id, obj.version, obj.asset_id, obj.path
                        )));
                    }
                    Ok(AssetReference {
                        dataset_id: obj.dataset_id.parse()?,
                        version: obj.version,
                        asset_id: obj.asset_id,
                        asset_path: obj.path,
                        environment: CatalogEnvironment::from_staging_flag(obj.staging),
                    })
                }
            })
            .collect::<Result<Vec<_>, OnboardError>>()?;

        Ok(ResolvedManifest {
            schema_version: manifest.schema_version.unwrap_or(1),
            project_id: manifest.project_id.trim().to_string(),
            assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_manifest_mixed_entries() {
        let manifest: Manifest = serde_json::from_str(
            r#"{
                "project_id": "proj-1",
                "assets": [
                    "000409/draft/a1/sub-01/sub-01.nwb",
                    {"dataset_id": "000123", "version": "0.230101.1200",
                     "asset_id": "b2", "path": "x.nwb", "staging": true}
                ]
            }"#,
        )
        .unwrap();

        let resolved = ManifestLoader::resolve_manifest(manifest).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.project_id, "proj-1");
        assert_eq!(resolved.assets.len(), 2);
        assert_eq!(resolved.assets[0].asset_path, "sub-01/sub-01.nwb");
        assert_eq!(resolved.assets[1].environment, CatalogEnvironment::Staging);
    }
}
