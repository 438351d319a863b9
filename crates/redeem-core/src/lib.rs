//! Redeem Core Library
//!
//! Webhook signature verification, reward routing, the scrollo cache, and the
//! side-effect collaborators (commands and smart bulbs) used by the Redeem
//! webhook server.

pub mod cache;
pub mod crypto;
pub mod error;
pub mod executor;
pub mod lighting;
pub mod reward;
pub mod router;
pub mod webhook;

pub use error::{RedeemError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
