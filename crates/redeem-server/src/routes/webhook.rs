//! EventSub webhook endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use redeem_core::webhook::{
    Envelope, HEADER_MESSAGE_ID, HEADER_MESSAGE_TYPE, HEADER_SIGNATURE, HEADER_TIMESTAMP,
    MessageType, SignedHeaders,
};

use crate::state::AppState;

/// Body written for requests that fail signature verification.
pub const UNVERIFIED_RESPONSE: &str = "you're my good puppy\n";

/// Why a required header could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    Missing(&'static str),
    Duplicate(&'static str),
    NotText(&'static str),
}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderError::Missing(name) => write!(f, "missing header {}", name),
            HeaderError::Duplicate(name) => write!(f, "too many {} headers", name),
            HeaderError::NotText(name) => write!(f, "header {} is not valid text", name),
        }
    }
}

/// Returns the value of a header that must appear exactly once.
pub fn single_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, HeaderError> {
    let mut values = headers.get_all(name).iter();
    let value = values.next().ok_or(HeaderError::Missing(name))?;
    if values.next().is_some() {
        return Err(HeaderError::Duplicate(name));
    }
    value.to_str().map_err(|_| HeaderError::NotText(name))
}

/// Checks the request signature against every candidate secret.
fn verify_request(state: &AppState, headers: &HeaderMap, body: &[u8]) -> bool {
    let signed = match (
        single_header(headers, HEADER_SIGNATURE),
        single_header(headers, HEADER_TIMESTAMP),
        single_header(headers, HEADER_MESSAGE_ID),
    ) {
        (Ok(signature), Ok(timestamp), Ok(message_id)) => SignedHeaders {
            signature,
            timestamp,
            message_id,
        },
        (sig, ts, id) => {
            for err in [sig.err(), ts.err(), id.err()].into_iter().flatten() {
                tracing::warn!("{}", err);
            }
            return false;
        }
    };

    state.verifier.verify(&signed, body)
}

/// Handler for EventSub webhooks.
///
/// POST /webhook
///
/// Always answers with the transport's default success status; the body is
/// the challenge for handshakes, empty for events, and a fixed placeholder
/// when verification fails.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> String {
    // 1. Verify signature (constant-time)
    if !verify_request(&state, &headers, &body) {
        tracing::warn!("Failed to verify webhook signature");
        return UNVERIFIED_RESPONSE.to_string();
    }

    // 2. Read message type
    let message_type = match single_header(&headers, HEADER_MESSAGE_TYPE) {
        Ok(value) => MessageType::parse(value),
        Err(e) => {
            tracing::warn!("{}", e);
            return String::new();
        }
    };

    // 3. Decode envelope
    let envelope = match Envelope::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("Bad webhook body: {}", e);
            return String::new();
        }
    };

    // 4. Branch on message type
    match message_type {
        MessageType::Verification => {
            tracing::info!("Got verification callback, challenge {}", envelope.challenge);
            envelope.challenge
        }
        MessageType::Notification => {
            let reward = &envelope.event.reward.title;
            tracing::debug!("Reward {:?} redeemed", reward);
            if let Err(e) = state.router.dispatch(reward, &envelope.event.user_input).await {
                tracing::error!("Reward {:?} failed: {}", reward, e);
            }
            String::new()
        }
        MessageType::Other(other) => {
            tracing::info!("Got something else: {}", other);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_single_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            single_header(&headers, HEADER_MESSAGE_ID),
            Err(HeaderError::Missing(HEADER_MESSAGE_ID))
        );

        headers.insert("twitch-eventsub-message-id", HeaderValue::from_static("abc"));
        assert_eq!(single_header(&headers, HEADER_MESSAGE_ID), Ok("abc"));

        headers.append("twitch-eventsub-message-id", HeaderValue::from_static("def"));
        assert_eq!(
            single_header(&headers, HEADER_MESSAGE_ID),
            Err(HeaderError::Duplicate(HEADER_MESSAGE_ID))
        );
    }

    #[test]
    fn test_single_header_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.insert("twitch-eventsub-message-type", HeaderValue::from_static("notification"));
        assert_eq!(single_header(&headers, HEADER_MESSAGE_TYPE), Ok("notification"));
    }

    #[test]
    fn test_single_header_rejects_non_text() {
        let mut headers = HeaderMap::new();
        headers.insert("twitch-eventsub-message-timestamp", HeaderValue::from_bytes(b"\xff\xfe").unwrap());
        assert_eq!(
            single_header(&headers, HEADER_TIMESTAMP),
            Err(HeaderError::NotText(HEADER_TIMESTAMP))
        );
    }
}
