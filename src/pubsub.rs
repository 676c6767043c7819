//! Pub/Sub push delivery envelope
//!
//! Cloud Build publishes every build update to the `cloud-builds` topic. A push
//! subscription POSTs each message to the notifier wrapped in this envelope,
//! with the Build resource as base64-encoded JSON in `message.data`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::collections::HashMap;

use crate::build::BuildEvent;
use crate::error::{NotifierError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub message_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: String,
}

impl PushEnvelope {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| NotifierError::EventDecodeError(format!("invalid push envelope: {}", e)))
    }

    /// Decode the build carried in the message payload
    pub fn build_event(&self) -> Result<BuildEvent> {
        let raw = STANDARD.decode(self.message.data.trim()).map_err(|e| {
            NotifierError::EventDecodeError(format!(
                "message {} data is not base64: {}",
                self.message.message_id, e
            ))
        })?;

        serde_json::from_slice(&raw).map_err(|e| {
            NotifierError::EventDecodeError(format!(
                "message {} does not hold a build: {}",
                self.message.message_id, e
            ))
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::build::BuildStatus;
    use serde_json::json;

    pub(crate) fn envelope_for(build: &serde_json::Value) -> serde_json::Value {
        json!({
            "message": {
                "data": STANDARD.encode(build.to_string()),
                "attributes": { "buildId": "b-7", "status": "TIMEOUT" },
                "messageId": "m-1"
            },
            "subscription": "projects/p/subscriptions/cloud-builds-notifier"
        })
    }

    #[test]
    fn test_decodes_build_from_envelope() {
        let body = envelope_for(&json!({ "id": "b-7", "status": "TIMEOUT", "logUrl": "https://l" }));
        let envelope = PushEnvelope::from_slice(body.to_string().as_bytes()).unwrap();

        assert_eq!(envelope.message.message_id, "m-1");
        assert_eq!(envelope.message.attributes["buildId"], "b-7");

        let event = envelope.build_event().unwrap();
        assert_eq!(event.id, "b-7");
        assert_eq!(event.status, BuildStatus::Timeout);
        assert_eq!(event.log_url, "https://l");
    }

    #[test]
    fn test_rejects_bad_payloads() {
        assert!(matches!(
            PushEnvelope::from_slice(b"not json"),
            Err(NotifierError::EventDecodeError(_))
        ));

        let not_base64 = json!({ "message": { "data": "%%%", "messageId": "m-2" } });
        let envelope = PushEnvelope::from_slice(not_base64.to_string().as_bytes()).unwrap();
        assert!(matches!(
            envelope.build_event(),
            Err(NotifierError::EventDecodeError(_))
        ));

        let not_build = json!({ "message": { "data": STANDARD.encode("[1, 2]") } });
        let envelope = PushEnvelope::from_slice(not_build.to_string().as_bytes()).unwrap();
        assert!(envelope.build_event().is_err());
    }
}
