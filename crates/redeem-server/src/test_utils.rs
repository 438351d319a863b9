//! Test utilities for redeem-server integration tests.

use async_trait::async_trait;
use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use redeem_core::cache::ScrolloCache;
use redeem_core::crypto::{SignatureAlgorithm, sign_message};
use redeem_core::executor::{ActionCommand, CommandRunner};
use redeem_core::lighting::{BulbAddresses, BulbSlot, Hsbk, LightController};
use redeem_core::router::{ActionSettings, RewardRouter};
use redeem_core::webhook::EventSubVerifier;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::state::{AppState, ServerConfig};

/// First candidate secret accepted by the test app.
pub const TEST_DOM_SECRET: &str = "test-dom-secret";
/// Second candidate secret accepted by the test app.
pub const TEST_SUB_SECRET: &str = "test-sub-secret";

pub const TEST_MESSAGE_ID: &str = "e76c6bd4-55c9-4987-8304-da1588d8988b";
pub const TEST_TIMESTAMP: &str = "2021-11-16T10:11:12.634234626Z";

/// Light controller that records every colour change.
#[derive(Default)]
pub struct RecordingLights {
    pub calls: Mutex<Vec<(BulbSlot, Hsbk)>>,
}

impl RecordingLights {
    pub fn calls(&self) -> Vec<(BulbSlot, Hsbk)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LightController for RecordingLights {
    async fn set_color(
        &self,
        slot: BulbSlot,
        color: Hsbk,
        _transition: Duration,
    ) -> redeem_core::Result<()> {
        self.calls.lock().unwrap().push((slot, color));
        Ok(())
    }
}

/// Command runner that records commands instead of launching them.
#[derive(Default)]
pub struct RecordingRunner {
    pub commands: Mutex<Vec<ActionCommand>>,
}

impl RecordingRunner {
    pub fn commands(&self) -> Vec<ActionCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &ActionCommand) -> redeem_core::Result<()> {
        self.commands.lock().unwrap().push(command.clone());
        Ok(())
    }
}

/// Handles to the collaborators behind a test app.
pub struct TestContext {
    /// Keeps the cache directory alive for the duration of the test.
    pub tmp: TempDir,
    pub lights: Arc<RecordingLights>,
    pub runner: Arc<RecordingRunner>,
    pub cache_dir: PathBuf,
    pub scrollo_link: PathBuf,
}

/// Creates test server configuration rooted in `tmp`.
pub fn test_config(tmp: &TempDir) -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        tls: None,
        dev_mode: true,
        cache_dir: tmp.path().join("scrollocache"),
        scrollo_link: tmp.path().join("scrollo.txt"),
        action_timeout: Duration::from_secs(5),
        bulbs: BulbAddresses::default(),
        discovery_timeout: Duration::from_secs(1),
        actions: ActionSettings::default(),
    }
}

/// Creates test application state with recording collaborators and a temporary cache.
pub fn setup_test_state() -> (AppState, TestContext) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(&tmp);
    std::fs::create_dir_all(&config.cache_dir).expect("Failed to create cache dir");

    let lights = Arc::new(RecordingLights::default());
    let runner = Arc::new(RecordingRunner::default());
    let router = RewardRouter::new(
        lights.clone(),
        runner.clone(),
        ScrolloCache::new(&config.cache_dir, &config.scrollo_link),
        config.actions.clone(),
    );
    let verifier = EventSubVerifier::new(vec![
        SecretString::from(TEST_DOM_SECRET.to_string()),
        SecretString::from(TEST_SUB_SECRET.to_string()),
    ]);

    let context = TestContext {
        cache_dir: config.cache_dir.clone(),
        scrollo_link: config.scrollo_link.clone(),
        tmp,
        lights,
        runner,
    };

    (AppState::new(verifier, router), context)
}

/// Creates a test application with recording collaborators.
/// Returns the router and test context.
pub fn create_test_app_with_state() -> (Router, TestContext) {
    let (state, context) = setup_test_state();
    (crate::app_router(state), context)
}

/// Headers for a message signed with `secret` using `algorithm`.
pub fn signed_headers(
    algorithm: SignatureAlgorithm,
    secret: &str,
    message_type: &str,
    body: &[u8],
) -> Vec<(HeaderName, HeaderValue)> {
    let signature = sign_message(algorithm, secret.as_bytes(), TEST_MESSAGE_ID, TEST_TIMESTAMP, body);
    vec![
        header("twitch-eventsub-message-signature", &signature),
        header("twitch-eventsub-message-timestamp", TEST_TIMESTAMP),
        header("twitch-eventsub-message-id", TEST_MESSAGE_ID),
        header("twitch-eventsub-message-type", message_type),
    ]
}

/// Builds a header pair from a lowercase name.
pub fn header(name: &'static str, value: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(name),
        HeaderValue::from_str(value).expect("valid header value"),
    )
}
