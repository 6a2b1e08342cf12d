// Runner registry client: lists the self-hosted runners registered to a
// repository.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use runner_image_common::constants::RUNNER_STATUS_ONLINE;
use runner_image_common::HttpClientFactory;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Runners requested per page; the API maximum.
const PAGE_SIZE: usize = 100;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// One registered runner as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunnerStatus {
    pub name: String,
    /// `online` or `offline`.
    pub status: String,
}

impl RunnerStatus {
    pub fn is_online(&self) -> bool {
        self.status == RUNNER_STATUS_ONLINE
    }
}

#[derive(Debug, Deserialize)]
struct RunnersPage {
    total_count: usize,
    #[serde(default)]
    runners: Vec<RunnerStatus>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("registry responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid registry URL: {0}")]
    InvalidUrl(String),
}

/// Read access to the runner registry.
#[async_trait]
pub trait RunnerRegistry: Send + Sync {
    /// All self-hosted runners currently registered to `owner/repo`.
    async fn list_runners(&self, owner: &str, repo: &str) -> Result<Vec<RunnerStatus>, RegistryError>;
}

/// `RunnerRegistry` over the GitHub REST API.
pub struct GitHubRunnerRegistry {
    client: Client,
    api_url: Url,
    token: String,
}

impl GitHubRunnerRegistry {
    /// `api_url` is `https://api.github.com`, or `https://<host>/api/v3` on
    /// GitHub Enterprise Server.
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self> {
        let api_url = Url::parse(api_url).with_context(|| format!("Invalid API URL '{api_url}'"))?;
        if api_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL '{api_url}'");
        }
        Ok(Self {
            client: HttpClientFactory::create_client()?,
            api_url,
            token: token.into(),
        })
    }

    /// `GET /repos/{owner}/{repo}/actions/runners?per_page=100&page={page}`
    fn runners_url(&self, owner: &str, repo: &str, page: usize) -> Result<Url, RegistryError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| RegistryError::InvalidUrl(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(["repos", owner, repo, "actions", "runners"]);
        url.query_pairs_mut()
            .append_pair("per_page", &PAGE_SIZE.to_string())
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    async fn fetch_page(&self, owner: &str, repo: &str, page: usize) -> Result<RunnersPage, RegistryError> {
        let url = self.runners_url(owner, repo, page)?;
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status { status, body });
        }

        Ok(response.json::<RunnersPage>().await?)
    }
}

#[async_trait]
impl RunnerRegistry for GitHubRunnerRegistry {
    async fn list_runners(&self, owner: &str, repo: &str) -> Result<Vec<RunnerStatus>, RegistryError> {
        let mut runners = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.fetch_page(owner, repo, page).await?;
            let received = batch.runners.len();
            runners.extend(batch.runners);
            if received == 0 || runners.len() >= batch.total_count {
                break;
            }
            page += 1;
        }
        Ok(runners)
    }
}
