//! The form session orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use onboard_core::{
    today, AdvanceOutcome, FieldId, FieldValue, FormDraft, FormRecord, SubmissionBlocked,
    Timestamp, ValidationReport, WizardController, WizardState,
};
use onboard_events::{
    ChangeOrigin, FormBus, FormEvent, SessionSummary, Telemetry, TelemetrySink,
};
use onboard_store::{DraftRepo, DraftStore, StoreError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::autosave::{self, run_autosave, AutoSaveSession, SaveStatus};
use crate::config::SessionConfig;
use crate::consumers::{run_telemetry, run_validation_trigger};
use crate::submission::{SubmissionGateway, SubmitError};

/// One user's pass through the onboarding form.
///
/// Holds the draft and the wizard position, and publishes every interaction
/// on its [`FormBus`]. The validation, autosave and telemetry consumers run
/// as tasks tied to the session: [`shutdown`](Self::shutdown) or dropping
/// the session cancels all of them.
///
/// Ending a session that was never submitted records a `form_abandon` as
/// the last entry of its telemetry log.
pub struct FormSession {
    draft: FormDraft,
    wizard: WizardController,
    bus: FormBus,
    telemetry: Telemetry,
    autosave: Arc<Mutex<AutoSaveSession>>,
    status: watch::Receiver<SaveStatus>,
    cancel: CancellationToken,
    autosave_cancel: CancellationToken,
    tasks: TaskTracker,
    submitted: bool,
    abandon_requested: AtomicBool,
    /// Read by the telemetry task after its final drain.
    ended_unsubmitted: Arc<AtomicBool>,
}

impl FormSession {
    /// Open a session, restoring any stored draft, and spawn its consumers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: SessionConfig,
        store: Arc<dyn DraftStore>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        let bus = FormBus::default();
        let telemetry = Telemetry::new(sink);

        let repo = DraftRepo::new(store, config.draft_key.clone());
        let mut draft = FormDraft::initial();
        let (autosave, restored) = AutoSaveSession::open(repo, &config, &mut draft);
        let status = autosave.subscribe_status();
        let autosave = Arc::new(Mutex::new(autosave));

        let cancel = CancellationToken::new();
        let autosave_cancel = cancel.child_token();
        // Telemetry stops only once the validation trigger has published
        // its last errors, so they land in the log before teardown.
        let validation_done = CancellationToken::new();
        let ended_unsubmitted = Arc::new(AtomicBool::new(false));
        let tasks = TaskTracker::new();

        let done_guard = validation_done.clone().drop_guard();
        let validation = run_validation_trigger(bus.clone(), bus.subscribe(), cancel.clone());
        tasks.spawn(async move {
            let _done = done_guard;
            validation.await;
        });
        tasks.spawn(run_autosave(
            Arc::clone(&autosave),
            bus.subscribe(),
            autosave_cancel.clone(),
        ));
        let consumer = run_telemetry(telemetry.clone(), bus.subscribe(), validation_done);
        let recorder = telemetry.clone();
        let abandon_on_exit = Arc::clone(&ended_unsubmitted);
        tasks.spawn(async move {
            consumer.await;
            if abandon_on_exit.load(Ordering::SeqCst) {
                recorder.mark_abandoned();
            }
        });

        for field in &restored {
            bus.publish(FormEvent::FieldChanged {
                field: *field,
                origin: ChangeOrigin::Restored,
                draft: draft.clone(),
            });
        }

        tracing::info!(
            session_id = %telemetry.session_id(),
            restored_fields = restored.len(),
            "Form session started"
        );

        Self {
            draft,
            wizard: WizardController::new(config.steps),
            bus,
            telemetry,
            autosave,
            status,
            cancel,
            autosave_cancel,
            tasks,
            submitted: false,
            abandon_requested: AtomicBool::new(false),
            ended_unsubmitted,
        }
    }

    // -- form state --

    pub fn draft(&self) -> &FormDraft {
        &self.draft
    }

    pub fn set_field(&mut self, value: FieldValue) {
        let field = value.field();
        self.draft.apply(value);
        self.publish_change(field);
    }

    /// Pre-select a service named by an inbound link. Unknown names are
    /// ignored.
    pub fn apply_service_hint(&mut self, hint: Option<&str>) -> bool {
        let applied = self.draft.apply_service_hint(hint);
        if applied {
            self.publish_change(FieldId::Services);
        }
        applied
    }

    pub fn focus(&self, field: FieldId) {
        self.bus.publish(FormEvent::FieldFocused { field });
    }

    pub fn blur(&self, field: FieldId) {
        self.bus.publish(FormEvent::FieldBlurred {
            field,
            value: self.draft.value_of(field),
        });
    }

    pub fn fill_progress(&self) -> u8 {
        self.draft.fill_progress()
    }

    // -- navigation --

    pub fn wizard(&self) -> WizardState {
        self.wizard.state()
    }

    pub fn current_step(&self) -> u8 {
        self.wizard.current_step()
    }

    /// Validate the current step and move forward if it passes. Failing
    /// fields are reported as errors on the bus.
    pub fn advance(&mut self) -> AdvanceOutcome {
        let outcome = self.wizard.advance(&self.draft, today());
        match &outcome {
            AdvanceOutcome::Advanced { from, to } if from != to => {
                self.bus.publish(FormEvent::StepChanged {
                    from: *from,
                    to: *to,
                });
            }
            AdvanceOutcome::Advanced { .. } => {}
            AdvanceOutcome::Blocked(report) => self.publish_errors(report),
        }
        outcome
    }

    pub fn retreat(&mut self) -> u8 {
        let from = self.wizard.current_step();
        let to = self.wizard.retreat();
        self.publish_step(from, to);
        to
    }

    /// Jump to `step` without validating the steps in between.
    pub fn go_to(&mut self, step: u8) -> u8 {
        let from = self.wizard.current_step();
        let to = self.wizard.go_to(step);
        self.publish_step(from, to);
        to
    }

    // -- submission --

    /// Validate the whole form and hand it to `gateway`.
    ///
    /// On success the submission is tracked, autosave stops and the stored
    /// draft is removed. On failure the draft is kept and the reason
    /// returned.
    pub async fn submit(
        &mut self,
        gateway: &dyn SubmissionGateway,
    ) -> Result<FormRecord, SubmitError> {
        let record = match self.wizard.authorize_submission(&self.draft, today()) {
            Ok(record) => record,
            Err(blocked) => {
                if let SubmissionBlocked::Invalid(report) = &blocked {
                    self.publish_errors(report);
                }
                return Err(blocked.into());
            }
        };

        if let Err(e) = gateway.submit(&record).await {
            tracing::warn!(
                session_id = %self.telemetry.session_id(),
                error = %e,
                "Form submission failed"
            );
            return Err(e);
        }

        self.submitted = true;
        self.bus.publish(FormEvent::Submitted);
        self.autosave_cancel.cancel();
        if let Err(e) = autosave::lock(&self.autosave).clear_draft() {
            tracing::warn!(error = %e, "Failed to clear draft after submission");
        }
        tracing::info!(session_id = %self.telemetry.session_id(), "Form session submitted");
        Ok(record)
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    // -- draft --

    pub fn clear_draft(&self) -> Result<(), StoreError> {
        autosave::lock(&self.autosave).clear_draft()
    }

    pub fn has_draft(&self) -> Result<bool, StoreError> {
        autosave::lock(&self.autosave).has_draft()
    }

    pub fn save_status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    pub fn last_saved(&self) -> Option<Timestamp> {
        autosave::lock(&self.autosave).last_saved()
    }

    // -- telemetry --

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn summary(&self) -> SessionSummary {
        self.telemetry.summary()
    }

    /// Record that the user walked away. Only the first call has an effect.
    ///
    /// The `form_abandon` entry follows every interaction published before
    /// this call.
    pub fn abandon(&self) -> bool {
        if self.abandon_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.bus.publish(FormEvent::Abandoned);
        true
    }

    // -- lifecycle --

    /// Stop every consumer and wait for them to finish.
    pub async fn shutdown(self) {
        self.finish();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!(session_id = %self.telemetry.session_id(), "Form session closed");
    }

    fn finish(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        if !self.submitted {
            self.ended_unsubmitted.store(true, Ordering::SeqCst);
        }
        self.cancel.cancel();
    }

    fn publish_change(&self, field: FieldId) {
        self.bus.publish(FormEvent::FieldChanged {
            field,
            origin: ChangeOrigin::User,
            draft: self.draft.clone(),
        });
    }

    fn publish_step(&self, from: u8, to: u8) {
        if from != to {
            self.bus.publish(FormEvent::StepChanged { from, to });
        }
    }

    fn publish_errors(&self, report: &ValidationReport) {
        for (field, message) in report.iter() {
            self.bus.publish(FormEvent::FieldInvalid {
                field,
                message: message.to_string(),
            });
        }
    }
}

impl Drop for FormSession {
    fn drop(&mut self) {
        self.finish();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
