//! HTTP control plane for the Hangar distribution backend.
//!
//! This crate provides:
//! - The download session lifecycle engine and its endpoints
//! - Release catalog endpoints
//! - Credential-to-identity resolution middleware
//! - Per-IP request throttling
//! - Prometheus metrics

pub mod audit;
pub mod auth;
pub mod bootstrap;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use audit::BestEffortAudit;
pub use cooldown::{CooldownGate, CooldownStatus};
pub use engine::SessionEngine;
pub use error::ApiError;
pub use ratelimit::RateLimitState;
pub use routes::create_router;
pub use state::AppState;
