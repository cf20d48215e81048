use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{AssetRecord, AssetReference, CatalogEnvironment};
use crate::error::OnboardError;

pub const PRODUCTION_API_HOST: &str = "api.dandiarchive.org";
pub const STAGING_API_HOST: &str = "api-staging.dandiarchive.org";
pub const OBJECT_STORAGE_HOST: &str = "dandiarchive.s3.amazonaws.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogHosts {
    pub production_api: String,
    pub staging_api: String,
    pub object_storage: String,
}

impl Default for CatalogHosts {
    fn default() -> Self {
        Self {
            production_api: PRODUCTION_API_HOST.to_string(),
            staging_api: STAGING_API_HOST.to_string(),
            object_storage: OBJECT_STORAGE_HOST.to_string(),
        }
    }
}

impl CatalogHosts {
    pub fn api_host(&self, environment: CatalogEnvironment) -> &str {
        match environment {
            CatalogEnvironment::Production => &self.production_api,
            CatalogEnvironment::Staging => &self.staging_api,
        }
    }

    pub fn asset_url(&self, reference: &AssetReference) -> String {
        format!(
            "https://{}/api/dandisets/{}/versions/{}/assets/{}/",
            self.api_host(reference.environment),
            reference.dataset_id.as_str(),
            reference.version,
            reference.asset_id
        )
    }
}

pub trait CatalogClient: Send + Sync {
    fn fetch_asset(&self, reference: &AssetReference) -> Result<AssetRecord, OnboardError>;

    fn hosts(&self) -> CatalogHosts {
        CatalogHosts::default()
    }
}

impl<T: CatalogClient + ?Sized> CatalogClient for &T {
    fn fetch_asset(&self, reference: &AssetReference) -> Result<AssetRecord, OnboardError> {
        (**self).fetch_asset(reference)
    }

    fn hosts(&self) -> CatalogHosts {
        (**self).hosts()
    }
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    hosts: CatalogHosts,
    production_headers: HeaderMap,
    staging_headers: HeaderMap,
}

impl CatalogHttpClient {
    pub fn new() -> Result<Self, OnboardError> {
        Self::with_hosts(CatalogHosts::default())
    }

    pub fn with_hosts(hosts: CatalogHosts) -> Result<Self, OnboardError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("neuro-onboard/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| OnboardError::CatalogHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| OnboardError::CatalogHttp(err.to_string()))?;

        Ok(Self {
            client,
            hosts,
            production_headers: auth_headers(std::env::var("DANDI_API_KEY").ok())?,
            staging_headers: auth_headers(std::env::var("DANDI_STAGING_API_KEY").ok())?,
        })
    }

    fn headers_for(&self, environment: CatalogEnvironment) -> HeaderMap {
        match environment {
            CatalogEnvironment::Production => self.production_headers.clone(),
            CatalogEnvironment::Staging => self.staging_headers.clone(),
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, OnboardError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "catalog request failed".to_string());
        Err(OnboardError::CatalogStatus { status, message })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, OnboardError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(OnboardError::CatalogHttp(err.to_string()));
                }
            }
        }
    }
}

impl CatalogClient for CatalogHttpClient {
    fn fetch_asset(&self, reference: &AssetReference) -> Result<AssetRecord, OnboardError> {
        let url = self.hosts.asset_url(reference);
        let headers = self.headers_for(reference.environment);
        let response =
            self.send_with_retries(|| self.client.get(&url).headers(headers.clone()))?;
        let response = Self::handle_status(response)?;
        response
            .json::<AssetRecord>()
            .map_err(|err| OnboardError::CatalogHttp(err.to_string()))
    }

    fn hosts(&self) -> CatalogHosts {
        self.hosts.clone()
    }
}

fn auth_headers(api_key: Option<String>) -> Result<HeaderMap, OnboardError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = api_key {
        if !api_key.trim().is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("token {}", api_key.trim()))
                    .map_err(|err| OnboardError::CatalogHttp(err.to_string()))?,
            );
        }
    }
    Ok(headers)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
