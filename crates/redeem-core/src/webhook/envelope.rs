//! EventSub notification envelope and message types.

use serde::{Deserialize, Deserializer};

use crate::error::Result;

/// Header carrying `<algorithm>=<hex-digest>`.
pub const HEADER_SIGNATURE: &str = "Twitch-Eventsub-Message-Signature";
/// Header carrying the message timestamp.
pub const HEADER_TIMESTAMP: &str = "Twitch-Eventsub-Message-Timestamp";
/// Header carrying the unique message id.
pub const HEADER_MESSAGE_ID: &str = "Twitch-Eventsub-Message-Id";
/// Header carrying the message type.
pub const HEADER_MESSAGE_TYPE: &str = "Twitch-Eventsub-Message-Type";

/// Decoded request body.
///
/// Fields absent from the payload or set to `null` decode to empty values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub challenge: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event: Event,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_input: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reward: RewardInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RewardInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Envelope {
    /// Decodes an envelope from the raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Value of the message type header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    /// Challenge handshake proving control of the endpoint.
    Verification,
    /// A delivered event.
    Notification,
    Other(String),
}

impl MessageType {
    pub fn parse(value: &str) -> Self {
        match value {
            "webhook_callback_verification" => MessageType::Verification,
            "notification" => MessageType::Notification,
            other => MessageType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Verification => write!(f, "webhook_callback_verification"),
            MessageType::Notification => write!(f, "notification"),
            MessageType::Other(s) => write!(f, "{}", s),
        }
    }
}
