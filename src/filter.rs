//! Decides which builds produce a notification

use regex::Regex;
use serde::Deserialize;

use crate::build::{BuildEvent, BuildStatus, TRIGGER_NAME};
use crate::error::{NotifierError, Result};

/// Selects the builds to notify for. A build matching every configured criterion is
/// notified and anything else is skipped. This is the reverse of a drop filter, where
/// a matching build would be discarded, so a rule ported from one must be negated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Only notify for these statuses (e.g. "SUCCESS", "FAILURE")
    pub statuses: Option<Vec<String>>,
    /// Only notify for triggers whose name matches this regex
    pub trigger_name: Option<String>,
}

/// Compiled event filter. An event passes when every configured criterion matches.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    statuses: Option<Vec<BuildStatus>>,
    trigger_name: Option<Regex>,
}

impl EventFilter {
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let trigger_name = config
            .trigger_name
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| NotifierError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            statuses: config
                .statuses
                .as_ref()
                .map(|s| s.iter().map(|name| BuildStatus::from(name.as_str())).collect()),
            trigger_name,
        })
    }

    pub fn allows(&self, event: &BuildEvent) -> bool {
        let status_ok = self
            .statuses
            .as_ref()
            .is_none_or(|statuses| statuses.contains(&event.status));

        let trigger_ok = self.trigger_name.as_ref().is_none_or(|re| {
            event
                .substitutions
                .get(TRIGGER_NAME)
                .is_some_and(|name| re.is_match(name))
        });

        status_ok && trigger_ok
    }
}
