//! Pub/Sub push handler for Cloud Build events

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::SharedState;
use crate::notifier::Outcome;
use crate::pubsub::PushEnvelope;

#[derive(Debug, Deserialize)]
pub struct PushQuery {
    token: Option<String>,
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Handles one push delivery.
///
/// Delivery failures are acknowledged with 200 so Pub/Sub does not redeliver;
/// the event is dropped and the error is only logged.
pub async fn handle_push(
    AxumState(state): AxumState<SharedState>,
    Query(query): Query<PushQuery>,
    body: Bytes,
) -> Response {
    if let Some(expected) = &state.push_token {
        if query.token.as_deref() != Some(expected.as_str()) {
            warn!("Rejected push delivery with missing or wrong token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let envelope = match PushEnvelope::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("{}", e);
            return bad_request(e.to_string());
        }
    };
    let event = match envelope.build_event() {
        Ok(event) => event,
        Err(e) => {
            warn!("{}", e);
            return bad_request(e.to_string());
        }
    };

    info!(
        "Received message {} for build {} ({})",
        envelope.message.message_id, event.id, event.status
    );

    match state.notifier.send_notification(&event).await {
        Ok(Outcome::Delivered) => (
            StatusCode::OK,
            Json(json!({ "status": Outcome::Delivered, "build_id": event.id })),
        )
            .into_response(),
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Failed to notify for build {}: {}", event.id, e);
            (
                StatusCode::OK,
                Json(json!({
                    "status": "dropped",
                    "build_id": event.id,
                    "error": e.to_string()
                })),
            )
                .into_response()
        }
    }
}
