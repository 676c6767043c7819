//! Commit author lookup against the GitHub REST API

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::GithubConfig;
use crate::build::UNKNOWN;
use crate::error::{NotifierError, Result};

/// Source of commit author names.
#[async_trait]
pub trait CommitAuthorLookup: Send + Sync {
    /// Display name of the commit author, or None when it cannot be determined.
    async fn author_name(&self, repo_name: &str, commit_sha: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: Option<String>,
}

pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.get_timeout_secs()))
            .build()?;

        Ok(Self {
            http,
            api_base: config.get_api_base().trim_end_matches('/').to_string(),
            owner: config.get_owner().to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Fetch a single commit and return its author name
    pub async fn fetch_commit_author(&self, repo_name: &str, commit_sha: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/commits/{}",
            self.api_base, self.owner, repo_name, commit_sha
        );
        debug!("Fetching commit {}", url);

        let mut request = self
            .http
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("cloudbuild_notifier/", env!("CARGO_PKG_VERSION")));
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::CommitLookupFailed(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let body: CommitResponse = response.json().await?;
        body.commit
            .author
            .and_then(|a| a.name)
            .ok_or_else(|| {
                NotifierError::CommitLookupFailed(format!("commit {} has no author name", commit_sha))
            })
    }
}

#[async_trait]
impl CommitAuthorLookup for GithubClient {
    async fn author_name(&self, repo_name: &str, commit_sha: &str) -> Option<String> {
        if repo_name == UNKNOWN || commit_sha == UNKNOWN {
            return None;
        }

        match self.fetch_commit_author(repo_name, commit_sha).await {
            Ok(name) => Some(name),
            Err(e) => {
                warn!(
                    "Could not look up author of {}@{}: {}",
                    repo_name, commit_sha, e
                );
                None
            }
        }
    }
}
