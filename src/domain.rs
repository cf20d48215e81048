use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OnboardError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogEnvironment {
    #[default]
    Production,
    Staging,
}

impl CatalogEnvironment {
    pub fn from_staging_flag(staging: bool) -> Self {
        if staging {
            CatalogEnvironment::Staging
        } else {
            CatalogEnvironment::Production
        }
    }

    pub fn is_staging(self) -> bool {
        matches!(self, CatalogEnvironment::Staging)
    }

    pub fn file_name_prefix(self) -> &'static str {
        match self {
            CatalogEnvironment::Production => "",
            CatalogEnvironment::Staging => "staging-",
        }
    }
}

impl fmt::Display for CatalogEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogEnvironment::Production => write!(f, "production"),
            CatalogEnvironment::Staging => write!(f, "staging"),
        }
    }
}

impl FromStr for CatalogEnvironment {
    type Err = OnboardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(CatalogEnvironment::Production),
            "staging" => Ok(CatalogEnvironment::Staging),
            _ => Err(OnboardError::InvalidEnvironment(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetId(String);

impl DatasetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetId {
    type Err = OnboardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty() && normalized.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(OnboardError::InvalidDatasetId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

impl TryFrom<String> for DatasetId {
    type Error = OnboardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DatasetId> for String {
    fn from(id: DatasetId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    pub dataset_id: DatasetId,
    pub version: String,
    pub asset_id: String,
    pub asset_path: String,
    pub environment: CatalogEnvironment,
}

impl FromStr for AssetReference {
    type Err = OnboardError;

    /// Parses `[staging:]<dataset-id>/<version>/<asset-id>/<asset-path>`.
    /// The asset path keeps any further `/` separators.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (environment, rest) = match trimmed.split_once(':') {
            Some((env, rest)) if !env.contains('/') => (env.parse()?, rest),
            _ => (CatalogEnvironment::Production, trimmed),
        };

        let mut parts = rest.splitn(4, '/');
        let mut next = || {
            parts
                .next()
                .filter(|part| !part.is_empty())
                .ok_or_else(|| OnboardError::InvalidAssetReference(value.to_string()))
        };
        let dataset_id = next()?.parse()?;
        let version = next()?.to_string();
        let asset_id = next()?.to_string();
        let asset_path = next()?.to_string();

        Ok(Self {
            dataset_id,
            version,
            asset_id,
            asset_path,
            environment,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssetRecord {
    #[serde(rename = "contentUrl", default)]
    pub content_urls: Vec<String>,
}
