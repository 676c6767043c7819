//! Per-event notification flow: filter, format, deliver

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::NotifierConfig;
use crate::build::BuildEvent;
use crate::error::Result;
use crate::filter::EventFilter;
use crate::formatter::MessageFormatter;
use crate::github::{CommitAuthorLookup, GithubClient};
use crate::resolver::UrlResolver;
use crate::webhook::WebhookSender;

/// What happened to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The event filter rejected the build
    Filtered,
    /// The build status has no message
    Skipped,
    Delivered,
}

pub struct Notifier {
    filter: EventFilter,
    formatter: MessageFormatter,
    authors: Arc<dyn CommitAuthorLookup>,
    sender: WebhookSender,
}

impl Notifier {
    pub fn new(
        filter: EventFilter,
        formatter: MessageFormatter,
        authors: Arc<dyn CommitAuthorLookup>,
        sender: WebhookSender,
    ) -> Self {
        Self {
            filter,
            formatter,
            authors,
            sender,
        }
    }

    /// Wire up the notifier with the GitHub client and webhook sender described by the configuration
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let filter = match &config.filter {
            Some(filter) => EventFilter::from_config(filter)?,
            None => EventFilter::default(),
        };
        let formatter = MessageFormatter::new(
            UrlResolver::from_config(config)?,
            config.github.get_web_base(),
            config.github.get_owner(),
        );

        Ok(Self::new(
            filter,
            formatter,
            Arc::new(GithubClient::new(&config.github)?),
            WebhookSender::new(&config.webhook)?,
        ))
    }

    /// Send the notification for one build event. Errors are not retried.
    pub async fn send_notification(&self, event: &BuildEvent) -> Result<Outcome> {
        if !self.filter.allows(event) {
            debug!("Build {} ({}) rejected by filter", event.id, event.status);
            return Ok(Outcome::Filtered);
        }

        info!(
            "Sending discord webhook for build {:?} (status: {})",
            event.id, event.status
        );
        let Some(message) = self.formatter.format(event, self.authors.as_ref()).await else {
            return Ok(Outcome::Skipped);
        };

        self.sender.send(&message).await?;
        if let (Some(created), Some(finished)) = (event.create_time, event.finish_time) {
            info!(
                "Notified build {} finished after {}s",
                event.id,
                (finished - created).num_seconds()
            );
        }
        Ok(Outcome::Delivered)
    }
}
