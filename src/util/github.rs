use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{ACCEPT, AUTHORIZATION, InvalidHeaderValue, USER_AGENT};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::constants::{GITHUB_ACCEPT, USER_AGENT as AGENT};
use crate::util::env::Env;

/// The two upstream lookups the aggregator needs from a hosted repository.
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// Lists the newest commits (newest first), optionally only those touching `path`.
    async fn list_commits(&self, path: Option<&str>, per_page: u8) -> GithubResult<Vec<GitCommit>>;

    /// Lists every entry in the tree of `branch`, recursively.
    async fn file_tree(&self, branch: &str) -> GithubResult<GitTree>;
}

/// Client for a single repository on the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHub {
    client: reqwest::Client,
    base: String,
    owner: String,
    repo: String,
    headers: HeaderMap,
}

impl GitHub {
    pub fn new(env: &Env) -> GithubResult<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base: env.github_api_url.trim_end_matches('/').to_string(),
            owner: env.repo_owner.clone(),
            repo: env.repo_name.clone(),
            headers: build_headers(env.token())?,
        })
    }

    fn repo_uri(&self, tail: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base, self.owner, self.repo, tail)
    }

    /// Performs a GET request against `uri` and parses the body as `T`.
    ///
    /// Non-2xx statuses are surfaced as [`GithubErr::UpstreamUnavailable`], carrying github's
    /// `message` field when the error body has one. Bodies that don't match `T` become
    /// [`GithubErr::MalformedPayload`].
    #[instrument(skip(self, query))]
    async fn fetch<T>(&self, uri: String, query: &[(&str, String)]) -> GithubResult<T>
    where
        T: DeserializeOwned,
    {
        let res = self
            .client
            .get(&uri)
            .headers(self.headers.clone())
            .query(query)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            tracing::error!(code = %status, "non-2xx response from github");
            let message = res
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body["message"].as_str().map(str::to_owned));

            return Err(GithubErr::UpstreamUnavailable { status, message });
        }

        if let Some(remaining) = res.headers().get("x-ratelimit-remaining")
            && let Some(total) = res.headers().get("x-ratelimit-limit")
        {
            tracing::debug!(ratelimit_available = ?remaining, ratelimit_total = ?total, "rate-limit bucket");
        }

        let body = res.bytes().await?;
        serde_json::from_slice::<T>(&body).map_err(GithubErr::MalformedPayload)
    }
}

#[async_trait]
impl RepoSource for GitHub {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn list_commits(&self, path: Option<&str>, per_page: u8) -> GithubResult<Vec<GitCommit>> {
        let mut query = vec![("per_page", per_page.to_string())];
        if let Some(path) = path {
            query.push(("path", path.to_string()));
        }

        let commits: Vec<GitCommit> = self.fetch(self.repo_uri("commits"), &query).await?;
        tracing::debug!(count = commits.len(), "fetched commits");

        Ok(commits)
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn file_tree(&self, branch: &str) -> GithubResult<GitTree> {
        let uri = self.repo_uri(&format!("git/trees/{branch}"));
        let tree: GitTree = self
            .fetch(uri, &[("recursive", String::from("1"))])
            .await?;

        tracing::debug!(tree = %tree.sha, entries = tree.tree.len(), "fetched tree");
        if tree.truncated {
            tracing::warn!(tree = %tree.sha, entries = tree.tree.len(), "github truncated the tree listing");
        }

        Ok(tree)
    }
}

fn build_headers(token: Option<&str>) -> GithubResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(USER_AGENT, HeaderValue::from_static(AGENT));
    headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

    if let Some(token) = token {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        tracing::debug!("built AUTHORIZATION header for bearer token");
    } else {
        tracing::warn!("no github token configured, using unauthenticated rate limits");
    }

    Ok(headers)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub commit: CommitDetail,

    /// The linked github account; `null` when the commit email isn't tied to one
    #[serde(default)]
    pub author: Option<Account>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    pub author: CommitAuthor,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
}

impl GitCommit {
    pub fn login(&self) -> Option<&str> {
        self.author
            .as_ref()
            .map(|account| account.login.as_str())
            .filter(|login| !login.is_empty())
    }

    pub fn author_name(&self) -> &str {
        &self.commit.author.name
    }

    pub fn message(&self) -> &str {
        &self.commit.message
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.commit.author.date
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitTree {
    pub sha: String,
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    Commit,
}

pub type GithubResult<T> = core::result::Result<T, GithubErr>;

#[derive(Debug, Error)]
pub enum GithubErr {
    #[error("github responded with {status}: {}", .message.as_deref().unwrap_or("no detail"))]
    UpstreamUnavailable {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("unexpected payload from github: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("reqwest error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("while creating a HeaderValue ({0})")]
    HeaderError(#[from] InvalidHeaderValue),
}
