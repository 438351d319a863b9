//! Application state for the Redeem server.

use redeem_core::lighting::BulbAddresses;
use redeem_core::router::{ActionSettings, RewardRouter};
use redeem_core::webhook::EventSubVerifier;
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Environment variables holding the candidate webhook secrets.
pub const SECRET_ENV_VARS: [&str; 2] = ["DOM_SECRET", "SUB_SECRET"];

/// PEM certificate and key used for the TLS listener.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Server configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: SocketAddr,
    /// TLS material; `None` only in dev mode.
    pub tls: Option<TlsPaths>,
    /// Whether dev mode is enabled (plain HTTP).
    pub dev_mode: bool,
    /// Directory holding scrollo cache entries.
    pub cache_dir: PathBuf,
    /// Well-known path linked to the current scrollo entry.
    pub scrollo_link: PathBuf,
    /// Per-action timeout.
    pub action_timeout: Duration,
    /// Hardware addresses of the two bulbs.
    pub bulbs: BulbAddresses,
    /// How long to listen for discovery replies.
    pub discovery_timeout: Duration,
    /// Commands and files used by reward actions.
    pub actions: ActionSettings,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_secs(name: &str, default: u64) -> Result<Duration, String> {
    match std::env::var(name) {
        Ok(val) => val
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("Invalid {}: {}", name, e)),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let bind_addr = env_or("REDEEM_BIND_ADDR", "0.0.0.0:6969")
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid REDEEM_BIND_ADDR: {}", e))?;

        let dev_mode = std::env::var("REDEEM_DEV_MODE").ok() == Some("true".to_string());

        let tls = match (
            std::env::var("REDEEM_TLS_CERT").ok(),
            std::env::var("REDEEM_TLS_KEY").ok(),
        ) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            _ if dev_mode => None,
            _ => {
                return Err(
                    "REDEEM_TLS_CERT and REDEEM_TLS_KEY are required. Set REDEEM_DEV_MODE=true to serve plain HTTP."
                        .to_string(),
                );
            }
        };

        let defaults = ActionSettings::default();
        let actions = ActionSettings {
            stream_process: env_or("REDEEM_STREAM_PROCESS", &defaults.stream_process),
            silence_script: env_or("REDEEM_SILENCE_SCRIPT", &defaults.silence_script),
            sound_default: env_or("REDEEM_SOUND_DEFAULT", &defaults.sound_default),
            sound_rare: env_or("REDEEM_SOUND_RARE", &defaults.sound_rare),
            audio_device: env_or("REDEEM_AUDIO_DEVICE", &defaults.audio_device),
        };

        let default_bulbs = BulbAddresses::default();
        let bulbs = BulbAddresses {
            bed: env_or("REDEEM_BED_BULB_MAC", &default_bulbs.bed),
            ceiling: env_or("REDEEM_CEILING_BULB_MAC", &default_bulbs.ceiling),
        };

        Ok(Self {
            bind_addr,
            tls,
            dev_mode,
            cache_dir: PathBuf::from(env_or("REDEEM_CACHE_DIR", ".scrollocache")),
            scrollo_link: PathBuf::from(env_or("REDEEM_SCROLLO_LINK", "scrollo.txt")),
            action_timeout: env_secs("REDEEM_ACTION_TIMEOUT_SECS", 30)?,
            bulbs,
            discovery_timeout: env_secs("REDEEM_DISCOVERY_TIMEOUT_SECS", 3)?,
            actions,
        })
    }
}

/// Reads the candidate webhook secrets.
///
/// An unset variable becomes an empty secret, which is still a valid HMAC key.
pub fn secrets_from_env() -> Vec<SecretString> {
    SECRET_ENV_VARS
        .iter()
        .map(|name| match std::env::var(name) {
            Ok(value) => SecretString::from(value),
            Err(_) => {
                tracing::warn!("{} is not set, using an empty secret", name);
                SecretString::from(String::new())
            }
        })
        .collect()
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Signature verifier over the candidate secrets.
    pub verifier: Arc<EventSubVerifier>,
    /// Reward router with its collaborators.
    pub router: Arc<RewardRouter>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(verifier: EventSubVerifier, router: RewardRouter) -> Self {
        Self {
            verifier: Arc::new(verifier),
            router: Arc::new(router),
        }
    }
}
