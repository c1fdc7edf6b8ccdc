//! Debounced draft persistence.
//!
//! [`AutoSaveSession`] is a timer-owning state machine:
//!
//! ```text
//!            user edit                 deadline reached, write ok
//!   Idle ───────────────▶ Pending ─────────────────────────────▶ CoolingDown
//!    ▲                     │  ▲ user edit (re-arm)                   │
//!    │   write failed /    │  └─────┘                                │
//!    └──── cancelled ──────┘◀──────────── cool-down elapsed ─────────┘
//! ```
//!
//! Time is passed in explicitly, so the machine itself never sleeps.
//! [`run_autosave`] drives it from the form bus and the tokio clock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use onboard_core::{FieldId, FormDraft, Timestamp};
use onboard_events::{ChangeOrigin, FormEvent};
use onboard_store::{DraftRepo, StoreError};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;

/// What the save indicator shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

#[derive(Debug)]
enum TimerState {
    Idle,
    Pending { deadline: Instant, draft: FormDraft },
    CoolingDown { until: Instant },
}

pub struct AutoSaveSession {
    repo: DraftRepo,
    debounce: Duration,
    cooldown: Duration,
    state: TimerState,
    status: watch::Sender<SaveStatus>,
    last_saved: Option<Timestamp>,
}

impl AutoSaveSession {
    /// Restore the stored draft into `draft` and start idle.
    ///
    /// Returns the session and the fields taken from the stored draft. A
    /// draft that cannot be read or decoded is left in storage untouched,
    /// `draft` is not modified and the status starts as
    /// [`SaveStatus::Error`].
    pub fn open(
        repo: DraftRepo,
        config: &SessionConfig,
        draft: &mut FormDraft,
    ) -> (Self, Vec<FieldId>) {
        let (status, _) = watch::channel(SaveStatus::Idle);
        let mut session = Self {
            repo,
            debounce: config.debounce,
            cooldown: config.saved_cooldown,
            state: TimerState::Idle,
            status,
            last_saved: None,
        };

        let restored = match session.repo.load() {
            Ok(Some(snapshot)) => {
                session.last_saved = Some(snapshot.last_saved.unwrap_or_else(Utc::now));
                let fields = draft.merge(&snapshot.draft);
                tracing::info!(
                    key = session.repo.key(),
                    fields = fields.len(),
                    "Restored saved draft"
                );
                fields
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key = session.repo.key(), error = %e, "Failed to load saved draft");
                session.set_status(SaveStatus::Error);
                Vec::new()
            }
        };

        (session, restored)
    }

    /// React to a form change at `now`.
    ///
    /// Changes replayed from storage are ignored. A user edit (re)arms the
    /// debounce timer with the latest draft, superseding any pending write.
    pub fn on_change(&mut self, origin: ChangeOrigin, draft: &FormDraft, now: Instant) {
        if origin == ChangeOrigin::Restored {
            return;
        }
        self.state = TimerState::Pending {
            deadline: now + self.debounce,
            draft: draft.clone(),
        };
        self.set_status(SaveStatus::Saving);
    }

    /// Fire whatever timer has expired by `now`.
    pub fn poll(&mut self, now: Instant) {
        match std::mem::replace(&mut self.state, TimerState::Idle) {
            TimerState::Pending { deadline, draft } if now >= deadline => self.write(&draft, now),
            TimerState::CoolingDown { until } if now >= until => {
                self.set_status(SaveStatus::Idle);
            }
            unexpired => self.state = unexpired,
        }
    }

    /// When the driver should next call [`poll`](Self::poll).
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            TimerState::Idle => None,
            TimerState::Pending { deadline, .. } => Some(*deadline),
            TimerState::CoolingDown { until } => Some(*until),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TimerState::Pending { .. })
    }

    /// Drop any pending write.
    pub fn cancel_pending(&mut self) {
        if self.is_pending() {
            tracing::debug!(key = self.repo.key(), "Pending draft write cancelled");
        }
        self.state = TimerState::Idle;
    }

    /// Remove the stored draft and reset the indicator. Safe to repeat.
    pub fn clear_draft(&mut self) -> Result<(), StoreError> {
        self.cancel_pending();
        if let Err(e) = self.repo.clear() {
            self.set_status(SaveStatus::Error);
            return Err(e);
        }
        self.last_saved = None;
        self.set_status(SaveStatus::Idle);
        Ok(())
    }

    /// Whether a draft exists in storage, regardless of the save status.
    pub fn has_draft(&self) -> Result<bool, StoreError> {
        self.repo.exists()
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    pub fn last_saved(&self) -> Option<Timestamp> {
        self.last_saved
    }

    pub fn repo(&self) -> &DraftRepo {
        &self.repo
    }

    fn write(&mut self, draft: &FormDraft, now: Instant) {
        match self.repo.save(draft, Utc::now()) {
            Ok(snapshot) => {
                self.last_saved = snapshot.last_saved;
                self.state = TimerState::CoolingDown {
                    until: now + self.cooldown,
                };
                self.set_status(SaveStatus::Saved);
            }
            Err(e) => {
                tracing::warn!(key = self.repo.key(), error = %e, "Failed to save draft");
                self.set_status(SaveStatus::Error);
            }
        }
    }

    fn set_status(&self, next: SaveStatus) {
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub(crate) fn lock(session: &Mutex<AutoSaveSession>) -> MutexGuard<'_, AutoSaveSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feed bus changes into `session` and fire its timers until `cancel`.
///
/// On cancellation any pending write is dropped and the subscription is
/// released; nothing is written after that.
pub async fn run_autosave(
    session: Arc<Mutex<AutoSaveSession>>,
    mut receiver: broadcast::Receiver<FormEvent>,
    cancel: CancellationToken,
) {
    loop {
        let deadline = lock(&session).next_deadline();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                lock(&session).cancel_pending();
                tracing::debug!("Autosave stopped");
                break;
            }
            received = receiver.recv() => match received {
                Ok(FormEvent::FieldChanged { origin, draft, .. }) => {
                    lock(&session).on_change(origin, &draft, Instant::now());
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Autosave lagged behind the form bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    lock(&session).cancel_pending();
                    break;
                }
            },
            _ = sleep_until(deadline) => {
                lock(&session).poll(Instant::now());
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
