use reqwest::Url;
use tracing::debug;

use crate::catalog::CatalogHosts;
use crate::domain::{AssetRecord, CatalogEnvironment};

/// Picks the download URL for an asset.
///
/// Precedence is fixed and does not depend on `environment`: a production API
/// URL, then a staging API URL, then an object-storage URL, then whatever
/// candidate comes first. Returns `None` only when there are no candidates.
pub fn resolve_asset_url(
    record: &AssetRecord,
    environment: CatalogEnvironment,
    hosts: &CatalogHosts,
) -> Option<String> {
    let preferred = [
        hosts.production_api.as_str(),
        hosts.staging_api.as_str(),
        hosts.object_storage.as_str(),
    ];

    let resolved = preferred
        .iter()
        .find_map(|host| {
            record
                .content_urls
                .iter()
                .find(|candidate| url_host(candidate).as_deref() == Some(*host))
        })
        .or_else(|| record.content_urls.first())
        .cloned();

    debug!(
        %environment,
        candidates = record.content_urls.len(),
        resolved = resolved.as_deref().unwrap_or("<none>"),
        "resolved asset url"
    );
    resolved
}

fn url_host(candidate: &str) -> Option<String> {
    Url::parse(candidate)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_ascii_lowercase()))
}
