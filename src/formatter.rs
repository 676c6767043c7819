//! Builds the chat message for a build event

use tracing::info;

use crate::build::{BuildDetails, BuildEvent, BuildStatus, UNKNOWN};
use crate::github::CommitAuthorLookup;
use crate::message::{ChatMessage, Embed, Field};
use crate::resolver::UrlResolver;

pub const BUILDING_TITLE: &str = "🔨 CI/CD BUILDING";
pub const SUCCESS_TITLE: &str = "✅ CI/CD SUCCESS";
pub const BUILDING_COLOR: u32 = 254200;
pub const SUCCESS_COLOR: u32 = 6748163;
pub const ERROR_COLOR: u32 = 16253797;
pub const STATUS_PROMPT: &str = "👆 Click link to view status";

pub struct MessageFormatter {
    resolver: UrlResolver,
    /// `https://github.com/<owner>`
    commit_base: String,
}

impl MessageFormatter {
    pub fn new(resolver: UrlResolver, web_base: &str, owner: &str) -> Self {
        Self {
            resolver,
            commit_base: format!("{}/{}", web_base.trim_end_matches('/'), owner),
        }
    }

    /// Returns None when the build status does not warrant a notification.
    pub async fn format(
        &self,
        event: &BuildEvent,
        authors: &dyn CommitAuthorLookup,
    ) -> Option<ChatMessage> {
        let (title, color) = match &event.status {
            BuildStatus::Working => (BUILDING_TITLE.to_string(), BUILDING_COLOR),
            BuildStatus::Success => (SUCCESS_TITLE.to_string(), SUCCESS_COLOR),
            BuildStatus::Failure | BuildStatus::InternalError | BuildStatus::Timeout => {
                (format!("❌ CI/CD ERROR - {}", event.status), ERROR_COLOR)
            }
            BuildStatus::Other(status) => {
                info!(
                    "Unhandled status {} for build {} (source: {}), skipping notification",
                    status,
                    event.id,
                    event.source_repo_name().unwrap_or("none")
                );
                return None;
            }
        };

        let details = event.details();
        let author = authors
            .author_name(&details.repo_name, &details.commit_sha)
            .await
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let fields = self.fields(&details, author);

        let url = match event.status {
            BuildStatus::Success => self
                .resolver
                .resolve(
                    &details.repo_name,
                    &details.trigger_name,
                    &details.trigger_config_path,
                )
                .unwrap_or_else(|| event.log_url.clone()),
            _ => event.log_url.clone(),
        };

        Some(ChatMessage::with_embed(Embed {
            title,
            color,
            url,
            description: STATUS_PROMPT.to_string(),
            fields,
        }))
    }

    /// Markdown link to the commit, or "unknown" when it cannot be built
    pub fn commit_link(&self, details: &BuildDetails) -> String {
        if details.short_sha.is_empty() || details.commit_sha.is_empty() || details.repo_name == UNKNOWN
        {
            info!("Commit link can not be built from SHORT_SHA, COMMIT_SHA or REPO_NAME");
            return UNKNOWN.to_string();
        }
        format!(
            "[{}]({}/{}/commit/{})",
            details.short_sha, self.commit_base, details.repo_name, details.commit_sha
        )
    }

    fn fields(&self, details: &BuildDetails, author: String) -> Vec<Field> {
        vec![
            Field::new("Repository", details.repo_name.as_str(), true),
            Field::new("Refer", details.ref_name.as_str(), true),
            Field::new("Trigger Name", details.trigger_name.as_str(), false),
            Field::new("Trigger Config", details.trigger_config_path.as_str(), false),
            Field::new("Commit SHA", self.commit_link(details), true),
            Field::new("Commit Author", author, true),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{
        COMMIT_SHA, REF_NAME, REPO_NAME, SHORT_SHA, TRIGGER_BUILD_CONFIG_PATH, TRIGGER_NAME,
    };
    use crate::resolver::{
        DEFAULT_URL_TEMPLATE, UrlRule, default_service_aliases, default_url_rules,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    const LOG_URL: &str = "https://console.cloud.google.com/cloud-build/builds/b-1";

    #[derive(Default)]
    struct StubAuthors {
        name: Option<String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CommitAuthorLookup for StubAuthors {
        async fn author_name(&self, repo_name: &str, commit_sha: &str) -> Option<String> {
            self.calls
                .lock()
                .unwrap()
                .push((repo_name.to_string(), commit_sha.to_string()));
            self.name.clone()
        }
    }

    fn formatter() -> MessageFormatter {
        let rules = default_url_rules()
            .iter()
            .map(UrlRule::compile)
            .collect::<crate::error::Result<Vec<_>>>()
            .unwrap();
        let resolver = UrlResolver::new(
            rules,
            default_service_aliases(),
            DEFAULT_URL_TEMPLATE.to_string(),
            "my-project".to_string(),
        );
        MessageFormatter::new(resolver, "https://github.com/", "acme")
    }

    fn event(status: &str, trigger: &str, config_path: &str) -> BuildEvent {
        let mut event = BuildEvent {
            id: "b-1".to_string(),
            status: BuildStatus::from(status),
            log_url: LOG_URL.to_string(),
            ..Default::default()
        };
        for (key, value) in [
            (REPO_NAME, "server1"),
            (REF_NAME, "main"),
            (TRIGGER_NAME, trigger),
            (TRIGGER_BUILD_CONFIG_PATH, config_path),
            (SHORT_SHA, "abc1234"),
            (COMMIT_SHA, "abc1234def5678"),
        ] {
            event.substitutions.insert(key.to_string(), value.to_string());
        }
        event
    }

    fn authors(name: &str) -> StubAuthors {
        StubAuthors {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_working_build_links_to_logs() {
        let message = formatter()
            .format(&event("WORKING", "game-server-develop", "ci_cd.yaml"), &authors("Jane"))
            .await
            .unwrap();

        assert_eq!(message.content, None);
        assert_eq!(message.embeds.len(), 1);
        let embed = &message.embeds[0];
        assert_eq!(embed.title, BUILDING_TITLE);
        assert_eq!(embed.color, BUILDING_COLOR);
        assert_eq!(embed.url, LOG_URL);
        assert_eq!(embed.description, STATUS_PROMPT);
    }

    #[tokio::test]
    async fn test_fields_follow_fixed_layout() {
        let message = formatter()
            .format(&event("WORKING", "game-server-develop", "ci_cd.yaml"), &authors("Jane"))
            .await
            .unwrap();

        let fields: Vec<(&str, &str, bool)> = message.embeds[0]
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str(), f.inline))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("Repository", "server1", true),
                ("Refer", "main", true),
                ("Trigger Name", "game-server-develop", false),
                ("Trigger Config", "ci_cd.yaml", false),
                (
                    "Commit SHA",
                    "[abc1234](https://github.com/acme/server1/commit/abc1234def5678)",
                    true
                ),
                ("Commit Author", "Jane", true),
            ]
        );
    }

    #[tokio::test]
    async fn test_success_links_to_resolved_service() {
        let f = formatter();

        let resolved = f
            .format(&event("SUCCESS", "game-server-prod", "ci_cd_release.yaml"), &authors("Jane"))
            .await
            .unwrap();
        let embed = &resolved.embeds[0];
        assert_eq!(embed.title, SUCCESS_TITLE);
        assert_eq!(embed.color, SUCCESS_COLOR);
        assert_eq!(
            embed.url,
            "https://console.cloud.google.com/kubernetes/service/asia-southeast1/prod-asia-01/namespace2/game-ap/overview?project=my-project"
        );

        let fallback = f
            .format(&event("SUCCESS", "nightly", "cloudbuild.yaml"), &authors("Jane"))
            .await
            .unwrap();
        assert_eq!(fallback.embeds[0].url, LOG_URL);
    }

    #[tokio::test]
    async fn test_error_statuses_name_the_status() {
        let f = formatter();
        for status in ["FAILURE", "INTERNAL_ERROR", "TIMEOUT"] {
            let message = f
                .format(&event(status, "game-server-develop", "ci_cd.yaml"), &authors("Jane"))
                .await
                .unwrap();
            let embed = &message.embeds[0];
            assert_eq!(embed.title, format!("❌ CI/CD ERROR - {}", status));
            assert_eq!(embed.color, ERROR_COLOR);
            assert_eq!(embed.url, LOG_URL);
        }
    }

    #[tokio::test]
    async fn test_other_status_produces_no_message() {
        let stub = authors("Jane");
        let mut cancelled = event("CANCELLED", "game-server-develop", "ci_cd.yaml");
        cancelled.source = Some(crate::build::BuildSource {
            repo_source: Some(crate::build::RepoSource {
                project_id: None,
                repo_name: Some("github_acme_server1".to_string()),
            }),
        });

        assert_eq!(formatter().format(&cancelled, &stub).await, None);
        assert_eq!(
            formatter()
                .format(&event("QUEUED", "x", "y"), &stub)
                .await,
            None
        );
        assert!(stub.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_metadata_defaults_to_unknown() {
        let stub = StubAuthors::default();
        let bare = BuildEvent {
            status: BuildStatus::Failure,
            log_url: LOG_URL.to_string(),
            ..Default::default()
        };

        let message = formatter().format(&bare, &stub).await.unwrap();
        let fields = &message.embeds[0].fields;
        assert!(fields.iter().all(|f| f.value == UNKNOWN));
        assert_eq!(
            stub.calls.lock().unwrap().as_slice(),
            [(UNKNOWN.to_string(), UNKNOWN.to_string())]
        );
    }

    #[test]
    fn test_commit_link_requires_shas_and_repo() {
        let f = formatter();
        let details = BuildDetails {
            repo_name: "web1".to_string(),
            ref_name: "main".to_string(),
            trigger_name: "t".to_string(),
            trigger_config_path: "c".to_string(),
            short_sha: "abc".to_string(),
            commit_sha: "abcdef".to_string(),
        };
        assert_eq!(
            f.commit_link(&details),
            "[abc](https://github.com/acme/web1/commit/abcdef)"
        );

        let no_short = BuildDetails {
            short_sha: String::new(),
            ..details.clone()
        };
        assert_eq!(f.commit_link(&no_short), UNKNOWN);

        let no_repo = BuildDetails {
            repo_name: UNKNOWN.to_string(),
            ..details.clone()
        };
        assert_eq!(f.commit_link(&no_repo), UNKNOWN);
    }
}
