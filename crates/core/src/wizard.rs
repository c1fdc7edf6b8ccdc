//! Onboarding wizard step table and navigation state machine.
//!
//! The form is split into ordered steps, each owning a fixed subset of
//! [`FieldId`]s. [`WizardController`] tracks the current step and only lets
//! the user move forward once the fields owned by the current step pass
//! validation. Moving backward is never gated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::form::{FieldId, FormDraft, FormRecord};
use crate::validation::{validate_all, validate_fields, ValidationReport};

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

// ---------------------------------------------------------------------------
// Step table
// ---------------------------------------------------------------------------

/// One page of the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    /// 1-based position in the wizard.
    pub index: u8,
    pub title: &'static str,
    /// Fields validated before leaving this step.
    pub fields: &'static [FieldId],
}

/// The default three-step layout.
pub const DEFAULT_STEPS: [StepDefinition; 3] = [
    StepDefinition {
        index: 1,
        title: "Personal Information",
        fields: &[FieldId::FullName, FieldId::Email, FieldId::CompanyName],
    },
    StepDefinition {
        index: 2,
        title: "Project Details",
        fields: &[FieldId::Services, FieldId::BudgetUsd, FieldId::ProjectStartDate],
    },
    StepDefinition {
        index: 3,
        title: "Review & Submit",
        fields: &[FieldId::AcceptTerms],
    },
];

/// Ordered steps whose field ownership partitions [`FieldId::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTable {
    steps: Vec<StepDefinition>,
}

impl StepTable {
    /// Build a table, rejecting layouts where steps are not numbered
    /// `1..=N` in order or where a field is owned by zero or several steps.
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, CoreError> {
        if steps.is_empty() {
            return Err(CoreError::Validation(
                "A wizard needs at least one step".to_string(),
            ));
        }
        if steps.len() > u8::MAX as usize {
            return Err(CoreError::Validation(format!(
                "A wizard supports at most {} steps",
                u8::MAX
            )));
        }

        for (position, step) in steps.iter().enumerate() {
            let expected = position as u8 + MIN_STEP;
            if step.index != expected {
                return Err(CoreError::Validation(format!(
                    "Step '{}' has index {}, expected {expected}",
                    step.title, step.index
                )));
            }
        }

        for field in FieldId::ALL {
            let owners: Vec<u8> = steps
                .iter()
                .filter(|s| s.fields.contains(&field))
                .map(|s| s.index)
                .collect();
            match owners.len() {
                1 => {}
                0 => {
                    return Err(CoreError::Validation(format!(
                        "Field '{field}' is not owned by any step"
                    )))
                }
                _ => {
                    return Err(CoreError::Validation(format!(
                        "Field '{field}' is owned by several steps: {owners:?}"
                    )))
                }
            }
        }

        Ok(Self { steps })
    }

    /// Number of steps.
    pub fn len(&self) -> u8 {
        self.steps.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up a step by its 1-based index.
    pub fn step(&self, index: u8) -> Result<&StepDefinition, CoreError> {
        index
            .checked_sub(MIN_STEP)
            .and_then(|i| self.steps.get(i as usize))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Step {index} is out of range ({MIN_STEP}..{})",
                    self.len()
                ))
            })
    }

    /// The step that owns `field`.
    pub fn owner_of(&self, field: FieldId) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.fields.contains(&field))
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }
}

impl Default for StepTable {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wizard state
// ---------------------------------------------------------------------------

/// Snapshot of the wizard position, for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub current_step: u8,
    pub total_steps: u8,
    pub is_first_step: bool,
    pub is_last_step: bool,
    /// `current_step / total_steps` as a percentage.
    pub progress: f64,
}

/// Result of [`WizardController::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// The current step validated. `to == from` on the last step.
    Advanced { from: u8, to: u8 },
    /// The current step has failing fields; the step did not change.
    Blocked(ValidationReport),
}

/// Why a submission was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionBlocked {
    #[error("Cannot submit from step {current} of {total}; submission is only allowed from the final step")]
    NotOnFinalStep { current: u8, total: u8 },

    #[error("Form is invalid: {0}")]
    Invalid(ValidationReport),
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Step navigation for one form session.
///
/// Starts on step 1. The position is never persisted; a restored draft
/// always starts again from the first step.
#[derive(Debug, Clone)]
pub struct WizardController {
    table: StepTable,
    current: u8,
}

impl WizardController {
    pub fn new(table: StepTable) -> Self {
        Self {
            table,
            current: MIN_STEP,
        }
    }

    pub fn current_step(&self) -> u8 {
        self.current
    }

    pub fn total_steps(&self) -> u8 {
        self.table.len()
    }

    pub fn is_first_step(&self) -> bool {
        self.current == MIN_STEP
    }

    pub fn is_last_step(&self) -> bool {
        self.current == self.table.len()
    }

    /// Current position as a percentage of the total.
    pub fn progress(&self) -> f64 {
        f64::from(self.current) / f64::from(self.table.len()) * 100.0
    }

    pub fn table(&self) -> &StepTable {
        &self.table
    }

    /// The definition of the step the user is on.
    pub fn current_definition(&self) -> &StepDefinition {
        &self.table.steps[(self.current - MIN_STEP) as usize]
    }

    pub fn state(&self) -> WizardState {
        WizardState {
            current_step: self.current,
            total_steps: self.total_steps(),
            is_first_step: self.is_first_step(),
            is_last_step: self.is_last_step(),
            progress: self.progress(),
        }
    }

    /// Validate the current step's fields and move forward one step if they
    /// pass. Capped at the last step.
    pub fn advance(&mut self, draft: &FormDraft, today: NaiveDate) -> AdvanceOutcome {
        let from = self.current;
        let report = validate_fields(draft, self.current_definition().fields, today);
        if !report.is_valid() {
            return AdvanceOutcome::Blocked(report);
        }
        self.current = from.saturating_add(1).min(self.table.len());
        AdvanceOutcome::Advanced {
            from,
            to: self.current,
        }
    }

    /// Move back one step. Never blocked; a no-op on the first step.
    pub fn retreat(&mut self) -> u8 {
        self.current = self.current.saturating_sub(1).max(MIN_STEP);
        self.current
    }

    /// Jump directly to `step`, clamped into range.
    ///
    /// Intermediate steps are not validated. Submission still requires the
    /// whole form to validate.
    pub fn go_to(&mut self, step: u8) -> u8 {
        self.current = step.clamp(MIN_STEP, self.table.len());
        self.current
    }

    /// Check that the form may be submitted from the current position.
    pub fn authorize_submission(
        &self,
        draft: &FormDraft,
        today: NaiveDate,
    ) -> Result<FormRecord, SubmissionBlocked> {
        if !self.is_last_step() {
            return Err(SubmissionBlocked::NotOnFinalStep {
                current: self.current,
                total: self.total_steps(),
            });
        }
        validate_all(draft, today).map_err(SubmissionBlocked::Invalid)
    }
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new(StepTable::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldValue;
    use assert_matches::assert_matches;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn step_one_draft() -> FormDraft {
        let mut draft = FormDraft::initial();
        draft.apply(FieldValue::FullName("John Doe".into()));
        draft.apply(FieldValue::Email("john@example.com".into()));
        draft.apply(FieldValue::CompanyName("Test Corp".into()));
        draft
    }

    fn complete_draft() -> FormDraft {
        let mut draft = step_one_draft();
        draft.apply(FieldValue::Services(vec!["UI/UX".into()]));
        draft.apply(FieldValue::ProjectStartDate("2099-01-01".into()));
        draft.apply(FieldValue::AcceptTerms(true));
        draft
    }

    // -- StepTable --

    #[test]
    fn default_table_partitions_fields() {
        let table = StepTable::new(DEFAULT_STEPS.to_vec()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.owner_of(FieldId::BudgetUsd).unwrap().index, 2);
        assert_eq!(table.owner_of(FieldId::AcceptTerms).unwrap().index, 3);
        assert_eq!(table, StepTable::default());
    }

    #[test]
    fn table_rejects_unowned_field() {
        let mut steps = DEFAULT_STEPS.to_vec();
        steps[2].fields = &[];
        let err = StepTable::new(steps).unwrap_err();
        assert!(err.to_string().contains("acceptTerms"));
    }

    #[test]
    fn table_rejects_doubly_owned_field() {
        let mut steps = DEFAULT_STEPS.to_vec();
        steps[2].fields = &[FieldId::AcceptTerms, FieldId::Email];
        assert!(StepTable::new(steps).is_err());
    }

    #[test]
    fn table_rejects_misnumbered_steps() {
        let mut steps = DEFAULT_STEPS.to_vec();
        steps[1].index = 5;
        assert!(StepTable::new(steps).is_err());
        assert!(StepTable::new(Vec::new()).is_err());
    }

    #[test]
    fn single_step_table_is_valid() {
        let table = StepTable::new(vec![StepDefinition {
            index: 1,
            title: "Everything",
            fields: &FieldId::ALL,
        }])
        .unwrap();
        let wizard = WizardController::new(table);
        assert!(wizard.is_first_step());
        assert!(wizard.is_last_step());
        assert_eq!(wizard.progress(), 100.0);
    }

    #[test]
    fn step_lookup_out_of_range() {
        let table = StepTable::default();
        assert_eq!(table.step(1).unwrap().title, "Personal Information");
        assert!(table.step(0).is_err());
        assert!(table.step(4).is_err());
    }

    // -- initial state --

    #[test]
    fn starts_on_first_step() {
        let wizard = WizardController::default();
        let state = wizard.state();
        assert_eq!(state.current_step, 1);
        assert_eq!(state.total_steps, 3);
        assert!(state.is_first_step);
        assert!(!state.is_last_step);
        assert!((state.progress - 33.333).abs() < 0.01);
    }

    // -- advance --

    #[test]
    fn advance_blocked_when_step_invalid() {
        let mut wizard = WizardController::default();
        let outcome = wizard.advance(&FormDraft::initial(), today());

        assert_matches!(outcome, AdvanceOutcome::Blocked(report) => {
            assert_eq!(report.message_for(FieldId::FullName), Some("Full name is required"));
            assert_eq!(report.errors.len(), 3);
        });
        assert_eq!(wizard.current_step(), 1);
    }

    #[test]
    fn advance_moves_forward_when_step_valid() {
        let mut wizard = WizardController::default();
        let outcome = wizard.advance(&step_one_draft(), today());
        assert_eq!(outcome, AdvanceOutcome::Advanced { from: 1, to: 2 });
        assert!((wizard.progress() - 66.666).abs() < 0.01);
    }

    #[test]
    fn advance_ignores_fields_of_other_steps() {
        // Step 2 and 3 fields are empty, but only step 1 is checked.
        let mut wizard = WizardController::default();
        assert_matches!(
            wizard.advance(&step_one_draft(), today()),
            AdvanceOutcome::Advanced { .. }
        );
    }

    #[test]
    fn advance_blocked_on_empty_services() {
        let mut wizard = WizardController::default();
        wizard.go_to(2);

        let mut draft = complete_draft();
        draft.apply(FieldValue::Services(vec![]));

        assert_matches!(wizard.advance(&draft, today()), AdvanceOutcome::Blocked(report) => {
            assert_eq!(report.failed_fields(), vec![FieldId::Services]);
            assert_eq!(
                report.message_for(FieldId::Services),
                Some("Please select at least one service")
            );
        });
        assert_eq!(wizard.current_step(), 2);
    }

    #[test]
    fn advance_is_capped_at_last_step() {
        let mut wizard = WizardController::default();
        wizard.go_to(3);
        let outcome = wizard.advance(&complete_draft(), today());
        assert_eq!(outcome, AdvanceOutcome::Advanced { from: 3, to: 3 });
        assert!(wizard.is_last_step());
    }

    // -- retreat --

    #[test]
    fn retreat_from_first_step_is_noop() {
        let mut wizard = WizardController::default();
        assert_eq!(wizard.retreat(), 1);
    }

    #[test]
    fn retreat_is_never_validated() {
        let mut wizard = WizardController::default();
        wizard.go_to(3);
        // Draft is completely empty, yet retreat still works.
        assert_eq!(wizard.retreat(), 2);
        assert_eq!(wizard.retreat(), 1);
        assert!(wizard.is_first_step());
    }

    // -- go_to --

    #[test]
    fn go_to_clamps_into_range() {
        let mut wizard = WizardController::default();
        assert_eq!(wizard.go_to(0), 1);
        assert_eq!(wizard.go_to(2), 2);
        assert_eq!(wizard.go_to(200), 3);
    }

    // -- authorize_submission --

    #[test]
    fn submission_requires_final_step() {
        let wizard = WizardController::default();
        assert_matches!(
            wizard.authorize_submission(&complete_draft(), today()),
            Err(SubmissionBlocked::NotOnFinalStep { current: 1, total: 3 })
        );
    }

    #[test]
    fn submission_requires_full_validation_after_deep_link() {
        let mut wizard = WizardController::default();
        wizard.go_to(3);

        let mut draft = complete_draft();
        draft.apply(FieldValue::Email("nope".into()));

        assert_matches!(
            wizard.authorize_submission(&draft, today()),
            Err(SubmissionBlocked::Invalid(report)) => {
                assert_eq!(report.failed_fields(), vec![FieldId::Email]);
            }
        );
    }

    #[test]
    fn submission_authorized_with_valid_form_on_last_step() {
        let mut wizard = WizardController::default();
        wizard.go_to(3);
        let record = wizard.authorize_submission(&complete_draft(), today()).unwrap();
        assert_eq!(record.company_name, "Test Corp");
    }
}
