//! Background consumers of the form bus.
//!
//! Each consumer owns its receiver and exits on cancellation, releasing the
//! subscription. Events already queued when cancellation arrives are still
//! handled.

use onboard_core::{today, validate_field};
use onboard_events::{AnalyticsEvent, ChangeOrigin, FormBus, FormEvent, Telemetry};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;

/// Validate each user-edited field and republish failures as
/// [`FormEvent::FieldInvalid`].
pub async fn run_validation_trigger(
    bus: FormBus,
    mut receiver: broadcast::Receiver<FormEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                drain(&mut receiver, |event| check(&bus, event));
                break;
            }
            received = receiver.recv() => match received {
                Ok(event) => check(&bus, event),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Validation trigger lagged behind the form bus");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    tracing::debug!("Validation trigger stopped");
}

fn check(bus: &FormBus, event: FormEvent) {
    if let FormEvent::FieldChanged {
        field,
        origin: ChangeOrigin::User,
        draft,
    } = event
    {
        if let Err(message) = validate_field(&draft, field, today()) {
            bus.publish(FormEvent::FieldInvalid { field, message });
        }
    }
}

/// Record focus, blur, error, step, submit and abandon events on
/// `telemetry`, in bus order.
pub async fn run_telemetry(
    telemetry: Telemetry,
    mut receiver: broadcast::Receiver<FormEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                drain(&mut receiver, |event| record(&telemetry, event));
                break;
            }
            received = receiver.recv() => match received {
                Ok(event) => record(&telemetry, event),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Telemetry lagged behind the form bus");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    tracing::debug!(session_id = %telemetry.session_id(), "Telemetry consumer stopped");
}

fn record(telemetry: &Telemetry, event: FormEvent) {
    let analytics = match event {
        FormEvent::FieldFocused { field } => AnalyticsEvent::field_focus(field),
        FormEvent::FieldBlurred { field, value } => AnalyticsEvent::field_blur(field, value),
        FormEvent::FieldInvalid { field, message } => AnalyticsEvent::field_error(field, message),
        FormEvent::StepChanged { to, .. } => AnalyticsEvent::step_change(to),
        FormEvent::Submitted => AnalyticsEvent::form_submit(),
        FormEvent::Abandoned => {
            telemetry.mark_abandoned();
            return;
        }
        FormEvent::FieldChanged { .. } => return,
    };
    telemetry.track(analytics);
}

/// Hand every event still buffered in `receiver` to `handle`.
fn drain(receiver: &mut broadcast::Receiver<FormEvent>, mut handle: impl FnMut(FormEvent)) {
    loop {
        match receiver.try_recv() {
            Ok(event) => handle(event),
            Err(TryRecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Dropped events while draining the form bus");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
