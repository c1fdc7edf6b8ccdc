//! Onboarding form domain logic.
//!
//! Pure, I/O-free building blocks shared by every other crate in the
//! workspace:
//!
//! - [`form`]: the closed field enumeration, raw [`FormDraft`] state and the
//!   validated [`FormRecord`].
//! - [`validation`]: the field rules gating navigation and submission.
//! - [`wizard`]: the step table and the step-navigation state machine.
//! - [`budget`]: budget suggestions derived from the selected services.

pub mod budget;
pub mod error;
pub mod form;
pub mod types;
pub mod validation;
pub mod wizard;

pub use error::CoreError;
pub use form::{FieldId, FieldValue, FormDraft, FormRecord, ServiceOption};
pub use types::{today, Timestamp};
pub use validation::{validate_all, validate_field, validate_fields, ValidationReport};
pub use wizard::{
    AdvanceOutcome, StepDefinition, StepTable, SubmissionBlocked, WizardController, WizardState,
};
