//! In-process change stream backed by a `tokio::sync::broadcast` channel.
//!
//! The form session is the only producer. Each consumer (validation
//! trigger, autosave, telemetry) owns its own receiver and drops it when it
//! shuts down.

use onboard_core::{FieldId, FormDraft};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// FormEvent
// ---------------------------------------------------------------------------

/// Where a field change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Replayed from a stored draft while the session was opening.
    Restored,
    /// Typed, picked or toggled by the user.
    User,
}

/// Something that happened to the form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// A field value changed. `draft` is the whole form after the change.
    FieldChanged {
        field: FieldId,
        origin: ChangeOrigin,
        draft: FormDraft,
    },

    FieldFocused { field: FieldId },

    /// Focus left a field; `value` is what the field held at that moment.
    FieldBlurred {
        field: FieldId,
        value: serde_json::Value,
    },

    /// A changed field failed validation.
    FieldInvalid { field: FieldId, message: String },

    StepChanged { from: u8, to: u8 },

    /// The form was accepted by the submission endpoint.
    Submitted,

    /// The user walked away from the form.
    Abandoned,
}

impl FormEvent {
    /// The field this event concerns, if any.
    pub fn field(&self) -> Option<FieldId> {
        match self {
            Self::FieldChanged { field, .. }
            | Self::FieldFocused { field }
            | Self::FieldBlurred { field, .. }
            | Self::FieldInvalid { field, .. } => Some(*field),
            Self::StepChanged { .. } | Self::Submitted | Self::Abandoned => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FormBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus for [`FormEvent`]s.
///
/// ```rust
/// use onboard_core::FieldId;
/// use onboard_events::{FormBus, FormEvent};
///
/// let bus = FormBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(FormEvent::FieldFocused { field: FieldId::Email });
/// ```
#[derive(Debug, Clone)]
pub struct FormBus {
    sender: broadcast::Sender<FormEvent>,
}

impl FormBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Receivers that fall more than `capacity` events behind observe
    /// `RecvError::Lagged` and skip the oldest events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every current subscriber. Dropped if there are none.
    pub fn publish(&self, event: FormEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for FormBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_each_event() {
        let bus = FormBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let mut draft = FormDraft::initial();
        draft.full_name = Some("Ada".into());
        bus.publish(FormEvent::FieldChanged {
            field: FieldId::FullName,
            origin: ChangeOrigin::User,
            draft: draft.clone(),
        });

        for rx in [&mut rx1, &mut rx2] {
            let event = rx.recv().await.expect("should receive the event");
            assert_eq!(
                event,
                FormEvent::FieldChanged {
                    field: FieldId::FullName,
                    origin: ChangeOrigin::User,
                    draft: draft.clone(),
                }
            );
        }
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = FormBus::default();
        bus.publish(FormEvent::StepChanged { from: 1, to: 2 });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn dropping_a_receiver_unsubscribes() {
        let bus = FormBus::default();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn field_accessor() {
        let event = FormEvent::FieldInvalid {
            field: FieldId::Email,
            message: "Email is required".into(),
        };
        assert_eq!(event.field(), Some(FieldId::Email));
        assert_eq!(FormEvent::StepChanged { from: 2, to: 1 }.field(), None);
        assert_eq!(FormEvent::Abandoned.field(), None);
    }
}
