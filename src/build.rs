//! Cloud Build event structures
//!
//! Only the parts of the Build resource the notifier reads are modelled here.
//! Field names follow the JSON encoding Cloud Build publishes to the
//! `cloud-builds` topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// Value used for every build detail that could not be determined
pub const UNKNOWN: &str = "unknown";

pub const REPO_NAME: &str = "REPO_NAME";
pub const REF_NAME: &str = "REF_NAME";
pub const TRIGGER_NAME: &str = "TRIGGER_NAME";
pub const TRIGGER_BUILD_CONFIG_PATH: &str = "TRIGGER_BUILD_CONFIG_PATH";
pub const SHORT_SHA: &str = "SHORT_SHA";
pub const COMMIT_SHA: &str = "COMMIT_SHA";

/// Lifecycle status of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    Working,
    Success,
    Failure,
    InternalError,
    Timeout,
    /// Any other status (QUEUED, CANCELLED, EXPIRED, ...), kept verbatim
    Other(String),
}

impl BuildStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BuildStatus::Working => "WORKING",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::InternalError => "INTERNAL_ERROR",
            BuildStatus::Timeout => "TIMEOUT",
            BuildStatus::Other(s) => s,
        }
    }
}

impl From<String> for BuildStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "WORKING" => BuildStatus::Working,
            "SUCCESS" => BuildStatus::Success,
            "FAILURE" => BuildStatus::Failure,
            "INTERNAL_ERROR" => BuildStatus::InternalError,
            "TIMEOUT" => BuildStatus::Timeout,
            _ => BuildStatus::Other(value),
        }
    }
}

impl From<&str> for BuildStatus {
    fn from(value: &str) -> Self {
        BuildStatus::from(value.to_string())
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        status.as_str().to_string()
    }
}

impl Default for BuildStatus {
    fn default() -> Self {
        BuildStatus::Other("STATUS_UNKNOWN".to_string())
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSource {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub repo_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSource {
    #[serde(default)]
    pub repo_source: Option<RepoSource>,
}

/// A Cloud Build lifecycle event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub status: BuildStatus,
    #[serde(default)]
    pub log_url: String,
    #[serde(default)]
    pub substitutions: HashMap<String, String>,
    #[serde(default)]
    pub source: Option<BuildSource>,
    #[serde(default)]
    pub build_trigger_id: Option<String>,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finish_time: Option<DateTime<Utc>>,
}

impl BuildEvent {
    /// Name of the source repository, when the build came from a repo source
    pub fn source_repo_name(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.repo_source.as_ref())
            .and_then(|r| r.repo_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Extract build details from the substitution mapping
    pub fn details(&self) -> BuildDetails {
        let lookup = |key: &str| match self.substitutions.get(key) {
            Some(value) => value.clone(),
            None => {
                info!("{} not present in substitutions for build {}", key, self.id);
                UNKNOWN.to_string()
            }
        };

        BuildDetails {
            repo_name: lookup(REPO_NAME),
            ref_name: lookup(REF_NAME),
            trigger_name: lookup(TRIGGER_NAME),
            trigger_config_path: lookup(TRIGGER_BUILD_CONFIG_PATH),
            short_sha: lookup(SHORT_SHA),
            commit_sha: lookup(COMMIT_SHA),
        }
    }
}

/// Repository and trigger details pulled out of a build's substitutions.
/// Every value is `"unknown"` when its key was missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDetails {
    pub repo_name: String,
    pub ref_name: String,
    pub trigger_name: String,
    pub trigger_config_path: String,
    pub short_sha: String,
    pub commit_sha: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_cloud_build_payload() {
        let payload = json!({
            "id": "b-123",
            "projectId": "my-project",
            "status": "SUCCESS",
            "logUrl": "https://console.cloud.google.com/cloud-build/builds/b-123",
            "substitutions": {
                "REPO_NAME": "server1",
                "TRIGGER_NAME": "game-server-develop"
            },
            "source": { "repoSource": { "repoName": "github_org_server1" } },
            "createTime": "2024-05-01T10:00:00.123456Z"
        });

        let event: BuildEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.id, "b-123");
        assert_eq!(event.status, BuildStatus::Success);
        assert_eq!(event.source_repo_name(), Some("github_org_server1"));
        assert!(event.create_time.is_some());
        assert!(event.finish_time.is_none());
    }

    #[test]
    fn test_unrecognized_status_is_kept_verbatim() {
        let event: BuildEvent = serde_json::from_value(json!({ "status": "CANCELLED" })).unwrap();
        assert_eq!(event.status, BuildStatus::Other("CANCELLED".to_string()));
        assert_eq!(event.status.to_string(), "CANCELLED");
    }

    #[test]
    fn test_missing_substitutions_default_to_unknown() {
        let mut event = BuildEvent::default();
        event
            .substitutions
            .insert(REPO_NAME.to_string(), "web1".to_string());
        event
            .substitutions
            .insert(SHORT_SHA.to_string(), String::new());

        let details = event.details();
        assert_eq!(details.repo_name, "web1");
        assert_eq!(details.short_sha, "");
        assert_eq!(details.ref_name, UNKNOWN);
        assert_eq!(details.trigger_name, UNKNOWN);
        assert_eq!(details.trigger_config_path, UNKNOWN);
        assert_eq!(details.commit_sha, UNKNOWN);
    }

    #[test]
    fn test_empty_repo_source_name_is_absent() {
        let event: BuildEvent =
            serde_json::from_value(json!({ "source": { "repoSource": { "repoName": "" } } }))
                .unwrap();
        assert_eq!(event.source_repo_name(), None);
    }
}
