//! Inbound webhook transport.
//!
//! Verifies the delivery signature, decodes the payload into a
//! [`WebhookEvent`] and hands it to the registered handlers. Every failure
//! past signature verification goes through [`on_error`], which logs it;
//! GitHub is not asked to redeliver and nothing is queued for retry.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::{
    agent::AgentRuntime,
    error::{Error, Result},
    events::WebhookEvent,
    handlers::WebhookHandlers,
    types::Forge,
};

/// Path the App's webhook URL points at.
pub const WEBHOOK_PATH: &str = "/api/github/webhooks";

const EVENT_HEADER: &str = "x-github-event";
const DELIVERY_HEADER: &str = "x-github-delivery";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Checks an `X-Hub-Signature-256` header (`sha256=<hex>`) against the
/// HMAC-SHA256 of `payload` keyed with the webhook secret.
pub fn verify_signature(secret: &str, payload: &[u8], signature_header: &str) -> Result<()> {
    let digest_hex = signature_header
        .trim()
        .strip_prefix("sha256=")
        .ok_or_else(|| Error::Signature("signature must use sha256=<hex> format".to_string()))?;

    let expected = hex::decode(digest_hex)
        .map_err(|err| Error::Signature(format!("signature digest is not hex: {err}")))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|err| Error::Signature(err.to_string()))?;
    mac.update(payload);

    mac.verify_slice(&expected)
        .map_err(|_| Error::Signature("signature mismatch".to_string()))
}

/// Catch-all error callback: logs a failed delivery and drops it.
pub fn on_error(err: &Error, event: &str, delivery: &str) {
    error!(%event, %delivery, error = %err, "Error processing the GitHub webhook");
}

struct WebhookState<F, R> {
    handlers: Arc<WebhookHandlers<F, R>>,
    secret: String,
}

/// Builds the router serving [`WEBHOOK_PATH`].
pub fn router<F, R>(handlers: Arc<WebhookHandlers<F, R>>, secret: impl Into<String>) -> Router
where
    F: Forge + 'static,
    R: AgentRuntime + 'static,
{
    let state = Arc::new(WebhookState {
        handlers,
        secret: secret.into(),
    });

    Router::new()
        .route(WEBHOOK_PATH, post(receive::<F, R>))
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

async fn receive<F, R>(
    State(state): State<Arc<WebhookState<F, R>>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode
where
    F: Forge + 'static,
    R: AgentRuntime + 'static,
{
    let delivery = header(&headers, DELIVERY_HEADER).unwrap_or("unknown");

    let Some(event_name) = header(&headers, EVENT_HEADER) else {
        warn!(%delivery, "webhook delivery without event header");
        return StatusCode::BAD_REQUEST;
    };

    let signature = header(&headers, SIGNATURE_HEADER).unwrap_or_default();
    if let Err(err) = verify_signature(&state.secret, &body, signature) {
        warn!(event = %event_name, %delivery, error = %err, "rejected webhook delivery");
        return StatusCode::UNAUTHORIZED;
    }

    let event = match WebhookEvent::decode(event_name, &body) {
        Ok(event) => event,
        Err(err) => {
            on_error(&err, event_name, delivery);
            return StatusCode::BAD_REQUEST;
        }
    };

    let name = event.name();
    info!(event = %name, %delivery, "received webhook");

    match state.handlers.dispatch(event).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            on_error(&err, &name, delivery);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
