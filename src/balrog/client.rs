// src/balrog/client.rs

//! HTTP client for the update-metadata service (Balrog).
//!
//! The pipeline talks to a [`ReleaseResolver`] rather than to the HTTP
//! client directly, so tests can swap in an in-memory resolver.

use std::fmt;
use std::fs;
use std::future::Future;
use std::pin::Pin;

use reqwest::header::ACCEPT;
use reqwest::{Certificate, Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::balrog::platforms::PlatformMap;
use crate::balrog::releases::{BuildArtifact, Release, ReleaseQuery, name_prefix, select_releases};
use crate::config::ConfigFile;
use crate::errors::{FunsizeError, Result};

/// Looks up releases and their complete-update artifacts.
///
/// Implementations must not retry: a failed call fails the current event.
pub trait ReleaseResolver: Send + Sync {
    /// Most recent releases of `product` on `branch`, per `query`.
    fn get_releases<'a>(
        &'a self,
        product: &'a str,
        branch: &'a str,
        query: ReleaseQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Release>>> + Send + 'a>>;

    /// Complete-update artifact of `release` for a build platform and locale.
    fn get_build<'a>(
        &'a self,
        release: &'a str,
        platform: &'a str,
        locale: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BuildArtifact>> + Send + 'a>>;
}

#[derive(Debug, Deserialize)]
struct ReleasesResponse {
    releases: Vec<Release>,
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
    #[serde(default)]
    completes: Vec<CompleteUpdate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteUpdate {
    file_url: String,
}

/// Authenticated client for the update-metadata service.
pub struct BalrogClient {
    client: Client,
    api_root: Url,
    username: String,
    password: String,
    platforms: PlatformMap,
}

impl fmt::Debug for BalrogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalrogClient")
            .field("api_root", &self.api_root.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl BalrogClient {
    /// Create a client.
    ///
    /// `ca_pem`, when given, is added as an extra TLS trust anchor.
    pub fn new(
        api_root: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        ca_pem: Option<&[u8]>,
        platforms: PlatformMap,
    ) -> Result<Self> {
        let api_root = Url::parse(api_root).map_err(|e| {
            FunsizeError::ConfigError(format!("invalid balrog api_root {api_root}: {e}"))
        })?;

        let mut builder =
            Client::builder().user_agent(concat!("funsize/", env!("CARGO_PKG_VERSION")));
        if let Some(pem) = ca_pem {
            let cert = Certificate::from_pem(pem).map_err(|e| {
                FunsizeError::ConfigError(format!("invalid balrog CA certificate: {e}"))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder.build().map_err(|e| {
            FunsizeError::ConfigError(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            api_root,
            username: username.into(),
            password: password.into(),
            platforms,
        })
    }

    /// Create a client from the `[balrog]` and `[platforms]` sections.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let ca_pem = match cfg.balrog.ca_cert {
            Some(ref path) => Some(fs::read(cfg.resolve_path(path))?),
            None => None,
        };

        Self::new(
            &cfg.balrog.api_root,
            cfg.balrog.username.clone(),
            cfg.balrog.password.clone(),
            ca_pem.as_deref(),
            PlatformMap::with_overrides(&cfg.platforms),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FunsizeError::ConfigError(format!(
                    "balrog api_root cannot be a base URL: {}",
                    self.api_root
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_json<T>(&self, request: reqwest::RequestBuilder, what: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FunsizeError::LookupFailure(format!("{what}: request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FunsizeError::LookupFailure(format!(
                "{what}: service returned {status}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FunsizeError::LookupFailure(format!("{what}: malformed response: {e}")))
    }

    async fn releases(
        &self,
        product: &str,
        branch: &str,
        query: ReleaseQuery,
    ) -> Result<Vec<Release>> {
        let url = self.endpoint(&["releases"])?;
        let prefix = name_prefix(product, branch);
        debug!(%url, name_prefix = %prefix, "listing releases");

        let request = self
            .client
            .get(url)
            .query(&[("product", product), ("name_prefix", prefix.as_str())]);
        let listing: ReleasesResponse = self.fetch_json(request, "list releases").await?;

        Ok(select_releases(listing.releases, &query))
    }

    async fn build(&self, release: &str, platform: &str, locale: &str) -> Result<BuildArtifact> {
        let update_platform = self.platforms.update_platform(platform)?;
        let url = self.endpoint(&["releases", release, "builds", update_platform, locale])?;
        debug!(%url, "fetching build");

        let build: BuildResponse = self
            .fetch_json(self.client.get(url), "get build")
            .await?;

        let complete = build.completes.into_iter().next().ok_or_else(|| {
            FunsizeError::LookupFailure(format!(
                "release {release} has no complete update for {update_platform}/{locale}"
            ))
        })?;

        Ok(BuildArtifact {
            complete_update_url: complete.file_url,
        })
    }
}

impl ReleaseResolver for BalrogClient {
    fn get_releases<'a>(
        &'a self,
        product: &'a str,
        branch: &'a str,
        query: ReleaseQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Release>>> + Send + 'a>> {
        Box::pin(self.releases(product, branch, query))
    }

    fn get_build<'a>(
        &'a self,
        release: &'a str,
        platform: &'a str,
        locale: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BuildArtifact>> + Send + 'a>> {
        Box::pin(self.build(release, platform, locale))
    }
}
