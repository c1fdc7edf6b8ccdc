//! Onboarding submission receiver.
//!
//! Exposes config, error handling, the router builder and routes so the
//! binary entrypoint and the integration tests share one middleware stack.

pub mod config;
pub mod error;
pub mod router;
pub mod routes;
