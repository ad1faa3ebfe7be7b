//! GitHub REST API client.
//!
//! Sync HTTP client for the repository contents API with token authentication.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info};
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

use crate::api::ContentsApi;
use crate::error::GitHubError;
use crate::types::{Blob, Contents, DeleteRequest, ErrorBody, PutRequest, decode_content};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// REST API version pinned in every request.
const API_VERSION: &str = "2022-11-28";

/// Characters escaped inside a single path segment or query value.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Connection settings for one repository branch.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    /// Personal access token.
    pub token: String,
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// Branch that receives commits.
    pub branch: String,
    /// API base URL (GitHub Enterprise uses `https://host/api/v3`).
    pub api_url: String,
}

/// GitHub contents API client.
pub struct GitHubClient {
    agent: Agent,
    settings: GitHubSettings,
}

impl GitHubClient {
    /// Create a client. No request is made until the first call.
    #[must_use]
    pub fn new(mut settings: GitHubSettings) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        settings.api_url = settings.api_url.trim_end_matches('/').to_owned();
        Self { agent, settings }
    }

    /// Branch receiving commits.
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.settings.branch
    }

    /// Check that the token can see the configured branch.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::HttpResponse`] with 401 for a bad token and 404 when
    /// the repository or branch is missing (or hidden from the token).
    pub fn verify(&self) -> Result<(), GitHubError> {
        let url = format!(
            "{}/branches/{}",
            self.repo_url(),
            utf8_percent_encode(&self.settings.branch, SEGMENT)
        );

        info!(
            "Verifying access to {}/{} on branch '{}'",
            self.settings.owner, self.settings.repository, self.settings.branch
        );

        let response = self.authorized(self.agent.get(&url)).call()?;
        Self::check(response).map(drop)
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.settings.api_url,
            utf8_percent_encode(&self.settings.owner, SEGMENT),
            utf8_percent_encode(&self.settings.repository, SEGMENT)
        )
    }

    /// Contents endpoint for a repository path, each segment escaped.
    fn contents_url(&self, path: &str) -> String {
        let encoded = path
            .trim_matches('/')
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/contents/{encoded}", self.repo_url())
    }

    fn authorized<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        request
            .header("Authorization", &format!("Bearer {}", self.settings.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("folio/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Turn an error status into [`GitHubError::HttpResponse`].
    fn check(response: Response<Body>) -> Result<Response<Body>, GitHubError> {
        let status = response.status().as_u16();
        if status < 400 {
            return Ok(response);
        }

        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        let body = response
            .into_body()
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        Err(GitHubError::HttpResponse {
            status,
            message,
            rate_limited,
        })
    }
}

impl ContentsApi for GitHubClient {
    fn get(&self, path: &str) -> Result<Contents, GitHubError> {
        let url = format!(
            "{}?ref={}",
            self.contents_url(path),
            utf8_percent_encode(&self.settings.branch, SEGMENT)
        );
        debug!("GET contents '{path}'");

        let response = self.authorized(self.agent.get(&url)).call()?;
        let mut body = Self::check(response)?.into_body();
        let text = body.read_to_string()?;
        Ok(serde_json::from_str(&text)?)
    }

    fn put(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        sha: Option<&str>,
    ) -> Result<(), GitHubError> {
        let request = PutRequest {
            message,
            content: STANDARD.encode(content),
            branch: &self.settings.branch,
            sha,
        };
        info!("{message}");

        let response = self
            .authorized(self.agent.put(&self.contents_url(path)))
            .send_json(&request)?;
        Self::check(response).map(drop)
    }

    fn delete(&self, path: &str, message: &str, sha: &str) -> Result<(), GitHubError> {
        let request = DeleteRequest {
            message,
            sha,
            branch: &self.settings.branch,
        };
        info!("{message}");

        let response = self
            .authorized(self.agent.delete(&self.contents_url(path)))
            .force_send_body()
            .send_json(&request)?;
        Self::check(response).map(drop)
    }

    fn blob(&self, sha: &str) -> Result<Vec<u8>, GitHubError> {
        let url = format!(
            "{}/git/blobs/{}",
            self.repo_url(),
            utf8_percent_encode(sha, SEGMENT)
        );
        debug!("GET blob {sha}");

        let response = self.authorized(self.agent.get(&url)).call()?;
        let mut body = Self::check(response)?.into_body();
        let text = body.read_to_string()?;
        let blob: Blob = serde_json::from_str(&text)?;
        if blob.encoding != "base64" {
            return Err(GitHubError::UnsupportedEncoding {
                path: sha.to_owned(),
                encoding: blob.encoding,
            });
        }
        Ok(decode_content(&blob.content)?)
    }
}
