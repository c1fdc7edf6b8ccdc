//! The onboarding form session engine.
//!
//! [`FormSession`] owns the form state and step navigation and publishes
//! every interaction on a [`FormBus`](onboard_events::FormBus). Three
//! background consumers subscribe to it:
//!
//! - the validation trigger ([`consumers::run_validation_trigger`]),
//! - debounced draft persistence ([`autosave::run_autosave`]),
//! - telemetry ([`consumers::run_telemetry`]).
//!
//! All three stop when the session is shut down or dropped.

pub mod autosave;
pub mod config;
pub mod consumers;
pub mod session;
pub mod submission;

pub use autosave::{AutoSaveSession, SaveStatus};
pub use config::SessionConfig;
pub use session::FormSession;
pub use submission::{HttpSubmission, SubmissionConfig, SubmissionGateway, SubmitError};
