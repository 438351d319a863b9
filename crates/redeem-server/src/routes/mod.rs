//! HTTP route handlers.

pub mod webhook;
