//! LINE webhook ingress — POST /webhook.
//!
//! The platform expects a fast 200, so events are filtered here and the
//! accepted messages are handed to a background task before responding.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use linebridge_line::{signature, IncomingText, WebhookPayload};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::app::AppState;

/// POST /webhook
///
/// Returns 200 `{"status":"ok"}` once the payload is accepted, 401 when a
/// configured channel secret does not match the signature, 400 on bad JSON.
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(secret) = state.config.line.channel_secret.as_deref() {
        let header = headers
            .get(signature::SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        signature::verify(secret, &body, header).map_err(|e| {
            warn!(reason = %e, "webhook signature rejected");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"status": "error", "error": "invalid signature"})),
            )
        })?;
    }

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "invalid JSON in webhook body");
        (StatusCode::BAD_REQUEST, Json(json!({"status": "error"})))
    })?;

    let accepted: Vec<IncomingText> = payload
        .events
        .iter()
        .filter_map(|event| {
            let incoming = event.to_incoming(state.user_id());
            if incoming.is_none() {
                debug!(
                    kind = %event.kind,
                    user_id = event.source_user_id().unwrap_or("-"),
                    "event skipped"
                );
            }
            incoming
        })
        .collect();

    info!(
        events = payload.events.len(),
        accepted = accepted.len(),
        "webhook arrived"
    );

    if !accepted.is_empty() {
        tokio::spawn(crate::handler::process_messages(Arc::clone(&state), accepted));
    }

    Ok(Json(json!({"status": "ok"})))
}
