//! Dashboard URL resolution
//!
//! Maps a repository, trigger name and trigger config path onto the GKE
//! console page of the service the build deployed. Rules are evaluated in
//! order and the first match wins.

use regex::Regex;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::{BTreeMap, HashMap};
use std::iter;
use tracing::debug;

use crate::NotifierConfig;
use crate::error::{NotifierError, Result};

pub const DEFAULT_URL_TEMPLATE: &str = "https://console.cloud.google.com/kubernetes/service/{location}/{namespace}/{service}/overview?project={project}";

/// Pattern as written in the configuration file.
///
/// A plain pattern is an ordinary regex. A guarded pattern stands in for a
/// negative lookahead: the text matches when it can be split so that `head`
/// matches everything before the split, `tail` matches everything after it,
/// and the part after the split does not start with `reject`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(try_from = "RawPattern")]
pub enum PatternConfig {
    Plain(String),
    Guarded {
        head: String,
        tail: String,
        reject: String,
    },
}

#[derive(Deserialize)]
#[serde(
    untagged,
    expecting = "a regex string or a table with `head`, `tail` and `reject`"
)]
enum RawPattern {
    Plain(String),
    Table(RawGuarded),
}

#[derive(Deserialize)]
struct RawGuarded {
    head: Option<String>,
    tail: Option<String>,
    reject: Option<String>,
    #[serde(flatten)]
    unknown: BTreeMap<String, IgnoredAny>,
}

impl TryFrom<RawPattern> for PatternConfig {
    type Error = String;

    fn try_from(raw: RawPattern) -> std::result::Result<Self, Self::Error> {
        let table = match raw {
            RawPattern::Plain(pattern) => return Ok(PatternConfig::Plain(pattern)),
            RawPattern::Table(table) => table,
        };

        if let Some(key) = table.unknown.keys().next() {
            return Err(format!(
                "guarded pattern has unknown key `{}` (expected `head`, `tail` and `reject`)",
                key
            ));
        }
        match (table.head, table.tail, table.reject) {
            (Some(head), Some(tail), Some(reject)) => {
                Ok(PatternConfig::Guarded { head, tail, reject })
            }
            (head, tail, reject) => {
                let missing: Vec<&str> = [("head", head), ("tail", tail), ("reject", reject)]
                    .into_iter()
                    .filter(|(_, value)| value.is_none())
                    .map(|(name, _)| name)
                    .collect();
                Err(format!(
                    "guarded pattern is missing `{}`",
                    missing.join("`, `")
                ))
            }
        }
    }
}

impl PatternConfig {
    fn guarded(head: &str, tail: &str, reject: &str) -> Self {
        PatternConfig::Guarded {
            head: head.to_string(),
            tail: tail.to_string(),
            reject: reject.to_string(),
        }
    }
}

/// Compiled form of [`PatternConfig`]
#[derive(Debug, Clone)]
pub enum Pattern {
    Plain(Regex),
    Guarded {
        head: Regex,
        tail: Regex,
        reject: String,
    },
}

impl Pattern {
    pub fn compile(config: &PatternConfig) -> Result<Self> {
        match config {
            PatternConfig::Plain(pattern) => Ok(Pattern::Plain(compile_regex(pattern)?)),
            PatternConfig::Guarded { head, tail, reject } => {
                if reject.is_empty() {
                    return Err(NotifierError::ConfigError(format!(
                        "guarded pattern '{}' / '{}' has an empty reject literal",
                        head, tail
                    )));
                }
                Ok(Pattern::Guarded {
                    head: compile_regex(&format!("^(?:{})$", head))?,
                    tail: compile_regex(&format!("^(?:{})$", tail))?,
                    reject: reject.clone(),
                })
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Pattern::Plain(re) => re.is_match(text),
            Pattern::Guarded { head, tail, reject } => text
                .char_indices()
                .map(|(idx, _)| idx)
                .chain(iter::once(text.len()))
                .any(|split| {
                    let (before, after) = text.split_at(split);
                    !after.starts_with(reject.as_str())
                        && head.is_match(before)
                        && tail.is_match(after)
                }),
        }
    }
}

fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| NotifierError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// One entry of the URL rule table, as configured
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UrlRuleConfig {
    pub trigger_name: PatternConfig,
    pub config_path: Option<PatternConfig>,
    /// `<region>/<cluster>`
    pub location: String,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct UrlRule {
    trigger_name: Pattern,
    config_path: Option<Pattern>,
    location: String,
    namespace: String,
}

impl UrlRule {
    pub fn compile(config: &UrlRuleConfig) -> Result<Self> {
        Ok(Self {
            trigger_name: Pattern::compile(&config.trigger_name)?,
            config_path: config.config_path.as_ref().map(Pattern::compile).transpose()?,
            location: config.location.clone(),
            namespace: config.namespace.clone(),
        })
    }

    fn matches(&self, trigger_name: &str, config_path: &str) -> bool {
        self.trigger_name.is_match(trigger_name)
            && self
                .config_path
                .as_ref()
                .is_none_or(|p| p.is_match(config_path))
    }
}

/// Rule table used when the configuration does not provide one
pub fn default_url_rules() -> Vec<UrlRuleConfig> {
    let service_trigger = |stage: &str| PatternConfig::guarded(".*-", &format!(".*-({})", stage), "app");

    vec![
        UrlRuleConfig {
            trigger_name: service_trigger("develop|feature|issue"),
            config_path: None,
            location: "asia-east1/temp-cluster-01".to_string(),
            namespace: "namespace1".to_string(),
        },
        UrlRuleConfig {
            trigger_name: service_trigger("prod"),
            config_path: Some(PatternConfig::guarded("ci_cd", r".*\.yaml", "_b2b")),
            location: "asia-southeast1/prod-asia-01".to_string(),
            namespace: "namespace2".to_string(),
        },
        UrlRuleConfig {
            trigger_name: service_trigger("b2b-preprod"),
            config_path: None,
            location: "asia-east1/temp-cluster-01".to_string(),
            namespace: "namespace3".to_string(),
        },
        UrlRuleConfig {
            trigger_name: service_trigger("prod"),
            config_path: Some(PatternConfig::Plain(r"^ci_cd_b2b.*\.yaml$".to_string())),
            location: "asia-southeast1/temp-cluster-02".to_string(),
            namespace: "namespace4".to_string(),
        },
    ]
}

/// Repository name to deployment name, used when the configuration does not provide one
pub fn default_service_aliases() -> HashMap<String, String> {
    [
        ("server1", "game-ap"),
        ("web1", "game-web"),
        ("server2", "admin-ap"),
        ("web2", "admin-web"),
    ]
    .into_iter()
    .map(|(repo, service)| (repo.to_string(), service.to_string()))
    .collect()
}

#[derive(Debug, Clone)]
pub struct UrlResolver {
    rules: Vec<UrlRule>,
    service_aliases: HashMap<String, String>,
    url_template: String,
    project_id: String,
}

impl UrlResolver {
    pub fn new(
        rules: Vec<UrlRule>,
        service_aliases: HashMap<String, String>,
        url_template: String,
        project_id: String,
    ) -> Self {
        Self {
            rules,
            service_aliases,
            url_template,
            project_id,
        }
    }

    /// Compile the rule table and aliases from configuration, falling back to the built-in tables
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let rule_configs = config.url_rules.clone().unwrap_or_else(default_url_rules);
        let rules = rule_configs
            .iter()
            .map(UrlRule::compile)
            .collect::<Result<Vec<_>>>()?;

        let service_aliases = config
            .service_aliases
            .clone()
            .unwrap_or_else(default_service_aliases);

        Ok(Self::new(
            rules,
            service_aliases,
            config.console.get_url_template().to_string(),
            config.console.get_project_id().to_string(),
        ))
    }

    /// Deployment name for a repository. Repositories without an alias map to themselves.
    pub fn service_name<'a>(&'a self, repo_name: &'a str) -> &'a str {
        self.service_aliases
            .get(repo_name)
            .map(String::as_str)
            .unwrap_or(repo_name)
    }

    /// Returns the console URL of the first matching rule, or None when no rule matches.
    pub fn resolve(&self, repo_name: &str, trigger_name: &str, config_path: &str) -> Option<String> {
        let (index, rule) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(trigger_name, config_path))?;

        let service = self.service_name(repo_name);
        debug!(
            "Trigger '{}' ({}) matched URL rule {} -> {}/{}",
            trigger_name, config_path, index, rule.location, rule.namespace
        );

        Some(
            self.url_template
                .replace("{location}", &rule.location)
                .replace("{namespace}", &rule.namespace)
                .replace("{service}", service)
                .replace("{project}", &self.project_id),
        )
    }
}
