//! Per-session analytics log and the metrics derived from it.
//!
//! A [`TelemetryRecorder`] is created for each form session with a fresh
//! session id. Every tracked [`AnalyticsEvent`] is timestamped, appended to
//! the log and handed to the configured [`TelemetrySink`]. All metric
//! queries are pure reads over the log.
//!
//! [`Telemetry`] is the cloneable handle consumers share; there is no
//! process-wide recorder.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use onboard_core::{FieldId, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sink::TelemetrySink;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FieldFocus,
    FieldBlur,
    FieldError,
    StepChange,
    FormSubmit,
    FormAbandon,
}

/// One entry in the analytics log.
///
/// Built with the kind-specific constructors and optionally enriched with
/// the `with_*` methods. The timestamp is overwritten when the event is
/// tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Milliseconds between the field's focus and this blur.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    pub timestamp: Timestamp,
}

impl AnalyticsEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            field: None,
            step: None,
            value: None,
            error: None,
            duration_ms: None,
            timestamp: Utc::now(),
        }
    }

    pub fn field_focus(field: FieldId) -> Self {
        Self::new(EventKind::FieldFocus).with_field(field)
    }

    pub fn field_blur(field: FieldId, value: serde_json::Value) -> Self {
        Self::new(EventKind::FieldBlur)
            .with_field(field)
            .with_value(value)
    }

    pub fn field_error(field: FieldId, message: impl Into<String>) -> Self {
        Self::new(EventKind::FieldError)
            .with_field(field)
            .with_error(message)
    }

    /// Entered `step`.
    pub fn step_change(step: u8) -> Self {
        Self::new(EventKind::StepChange).with_step(step)
    }

    pub fn form_submit() -> Self {
        Self::new(EventKind::FormSubmit)
    }

    pub fn form_abandon() -> Self {
        Self::new(EventKind::FormAbandon)
    }

    pub fn with_field(mut self, field: FieldId) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_step(mut self, step: u8) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// What a sink receives for each tracked event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub session_id: Uuid,
    pub event: AnalyticsEvent,
}

/// Session-level metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub duration_ms: u64,
    pub field_completion_times: BTreeMap<FieldId, u64>,
    pub error_count: usize,
    pub most_problematic_field: Option<FieldId>,
    pub error_fields: Vec<FieldId>,
    pub completion_rate: f64,
    pub abandoned: bool,
}

// ---------------------------------------------------------------------------
// TelemetryRecorder
// ---------------------------------------------------------------------------

pub struct TelemetryRecorder {
    session_id: Uuid,
    started_at: Timestamp,
    events: Vec<AnalyticsEvent>,
    focus_times: HashMap<FieldId, Timestamp>,
    sink: Arc<dyn TelemetrySink>,
}

impl TelemetryRecorder {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self::started_at(sink, Utc::now())
    }

    /// Create a recorder whose session began at `started_at`.
    pub fn started_at(sink: Arc<dyn TelemetrySink>, started_at: Timestamp) -> Self {
        Self {
            session_id: Uuid::now_v7(),
            started_at,
            events: Vec::new(),
            focus_times: HashMap::new(),
            sink,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn session_start(&self) -> Timestamp {
        self.started_at
    }

    pub fn events(&self) -> &[AnalyticsEvent] {
        &self.events
    }

    pub fn track(&mut self, event: AnalyticsEvent) {
        self.track_at(event, Utc::now());
    }

    /// Stamp `event` with `at`, append it and emit it to the sink.
    ///
    /// A focus remembers when the field was entered; every blur of that
    /// field carries the time since its latest focus as `duration_ms`.
    pub fn track_at(&mut self, mut event: AnalyticsEvent, at: Timestamp) {
        event.timestamp = at;

        match (event.kind, event.field) {
            (EventKind::FieldFocus, Some(field)) => {
                self.focus_times.insert(field, at);
            }
            (EventKind::FieldBlur, Some(field)) => {
                if let Some(&focused) = self.focus_times.get(&field) {
                    event.duration_ms = Some(millis_between(focused, at));
                }
            }
            _ => {}
        }

        tracing::trace!(session_id = %self.session_id, kind = ?event.kind, "Telemetry event");
        self.sink.emit(&TelemetryRecord {
            session_id: self.session_id,
            event: event.clone(),
        });
        self.events.push(event);
    }

    /// Record that the session was abandoned.
    ///
    /// Only the first call appends a `form_abandon` event; returns whether
    /// this call did.
    pub fn mark_abandoned_at(&mut self, at: Timestamp) -> bool {
        if self.is_abandoned() {
            return false;
        }
        self.track_at(AnalyticsEvent::form_abandon(), at);
        true
    }

    pub fn mark_abandoned(&mut self) -> bool {
        self.mark_abandoned_at(Utc::now())
    }

    // -- queries --

    /// Percentage of required fields that were left holding a value.
    ///
    /// A required field counts once it has been blurred with a filled value
    /// (non-blank string, non-empty list, `true`, non-zero number).
    pub fn completion_rate(&self) -> f64 {
        let completed = FieldId::REQUIRED
            .iter()
            .filter(|required| {
                self.of_kind(EventKind::FieldBlur).any(|e| {
                    e.field == Some(**required) && e.value.as_ref().is_some_and(is_filled_value)
                })
            })
            .count();
        completed as f64 / FieldId::REQUIRED.len() as f64 * 100.0
    }

    /// Fields that raised at least one error, in order of first error.
    pub fn error_fields(&self) -> Vec<FieldId> {
        let mut fields = Vec::new();
        for field in self.of_kind(EventKind::FieldError).filter_map(|e| e.field) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    pub fn error_count(&self) -> usize {
        self.of_kind(EventKind::FieldError).count()
    }

    /// The field with the most errors. On a tie, the field that reached the
    /// top count first wins.
    pub fn most_problematic_field(&self) -> Option<FieldId> {
        let mut counts: HashMap<FieldId, usize> = HashMap::new();
        let mut top: Option<(FieldId, usize)> = None;

        for field in self.of_kind(EventKind::FieldError).filter_map(|e| e.field) {
            let count = counts.entry(field).or_default();
            *count += 1;
            if top.map_or(true, |(_, best)| *count > best) {
                top = Some((field, *count));
            }
        }
        top.map(|(field, _)| field)
    }

    /// Time spent on each field, taken from its first timed blur.
    pub fn field_completion_times(&self) -> BTreeMap<FieldId, u64> {
        let mut times = BTreeMap::new();
        for event in self.of_kind(EventKind::FieldBlur) {
            if let (Some(field), Some(ms)) = (event.field, event.duration_ms) {
                times.entry(field).or_insert(ms);
            }
        }
        times
    }

    pub fn session_duration_at(&self, now: Timestamp) -> u64 {
        millis_between(self.started_at, now)
    }

    /// True once any `form_abandon` was recorded, even if a submit followed.
    pub fn is_abandoned(&self) -> bool {
        self.of_kind(EventKind::FormAbandon).next().is_some()
    }

    pub fn summary_at(&self, now: Timestamp) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            duration_ms: self.session_duration_at(now),
            field_completion_times: self.field_completion_times(),
            error_count: self.error_count(),
            most_problematic_field: self.most_problematic_field(),
            error_fields: self.error_fields(),
            completion_rate: self.completion_rate(),
            abandoned: self.is_abandoned(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary_at(Utc::now())
    }

    fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &AnalyticsEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}

fn millis_between(from: Timestamp, to: Timestamp) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

/// Whether a blurred value counts as "filled in".
fn is_filled_value(value: &serde_json::Value) -> bool {
    use serde_json::Value;

    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Telemetry handle
// ---------------------------------------------------------------------------

/// Shared handle to one session's [`TelemetryRecorder`].
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<Mutex<TelemetryRecorder>>,
}

impl Telemetry {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self::from_recorder(TelemetryRecorder::new(sink))
    }

    pub fn from_recorder(recorder: TelemetryRecorder) -> Self {
        Self {
            inner: Arc::new(Mutex::new(recorder)),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.lock().session_id()
    }

    pub fn track(&self, event: AnalyticsEvent) {
        self.lock().track(event);
    }

    pub fn track_at(&self, event: AnalyticsEvent, at: Timestamp) {
        self.lock().track_at(event, at);
    }

    pub fn mark_abandoned(&self) -> bool {
        self.lock().mark_abandoned()
    }

    pub fn is_abandoned(&self) -> bool {
        self.lock().is_abandoned()
    }

    pub fn completion_rate(&self) -> f64 {
        self.lock().completion_rate()
    }

    pub fn summary(&self) -> SessionSummary {
        self.lock().summary()
    }

    pub fn summary_at(&self, now: Timestamp) -> SessionSummary {
        self.lock().summary_at(now)
    }

    /// Copy of the log so far.
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.lock().events().to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, TelemetryRecorder> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap()
    }

    fn at(ms: i64) -> Timestamp {
        t0() + Duration::milliseconds(ms)
    }

    fn recorder() -> TelemetryRecorder {
        let (sink, _rx) = ChannelSink::new();
        TelemetryRecorder::started_at(Arc::new(sink), t0())
    }

    fn blur(rec: &mut TelemetryRecorder, field: FieldId, value: serde_json::Value) {
        rec.track_at(AnalyticsEvent::field_blur(field, value), at(0));
    }

    // -- tracking --

    #[test]
    fn blur_carries_time_since_focus() {
        let mut rec = recorder();
        rec.track_at(AnalyticsEvent::field_focus(FieldId::Email), at(1_000));
        rec.track_at(
            AnalyticsEvent::field_blur(FieldId::Email, json!("a@b.co")),
            at(3_500),
        );

        let blur = &rec.events()[1];
        assert_eq!(blur.duration_ms, Some(2_500));
        assert_eq!(blur.timestamp, at(3_500));
    }

    #[test]
    fn repeated_blur_measures_from_the_latest_focus() {
        let mut rec = recorder();
        rec.track_at(AnalyticsEvent::field_focus(FieldId::Email), at(1_000));
        rec.track_at(AnalyticsEvent::field_blur(FieldId::Email, json!("a")), at(2_000));
        rec.track_at(AnalyticsEvent::field_blur(FieldId::Email, json!("a@b")), at(4_000));
        rec.track_at(AnalyticsEvent::field_focus(FieldId::Email), at(5_000));
        rec.track_at(AnalyticsEvent::field_blur(FieldId::Email, json!("a@b.co")), at(5_500));

        let durations: Vec<_> = rec.events().iter().map(|e| e.duration_ms).collect();
        assert_eq!(
            durations,
            vec![None, Some(1_000), Some(3_000), None, Some(500)]
        );
        assert_eq!(rec.field_completion_times()[&FieldId::Email], 1_000);
    }

    #[test]
    fn blur_without_focus_has_no_duration() {
        let mut rec = recorder();
        blur(&mut rec, FieldId::Email, json!("a@b.co"));
        assert_eq!(rec.events()[0].duration_ms, None);
    }

    #[test]
    fn tracked_events_reach_the_sink() {
        let (sink, mut rx) = ChannelSink::new();
        let mut rec = TelemetryRecorder::started_at(Arc::new(sink), t0());
        rec.track_at(AnalyticsEvent::step_change(2), at(10));

        let record = rx.try_recv().expect("record emitted");
        assert_eq!(record.session_id, rec.session_id());
        assert_eq!(record.event.kind, EventKind::StepChange);
        assert_eq!(record.event.step, Some(2));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(recorder().session_id(), recorder().session_id());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = AnalyticsEvent::field_error(FieldId::FullName, "Full name is required");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "field_error");
        assert_eq!(value["field"], "fullName");
        assert_eq!(value["error"], "Full name is required");
        assert!(value.get("step").is_none());
    }

    // -- completion rate --

    #[test]
    fn completion_rate_counts_filled_required_fields() {
        let mut rec = recorder();
        assert_eq!(rec.completion_rate(), 0.0);

        blur(&mut rec, FieldId::FullName, json!("Ada"));
        blur(&mut rec, FieldId::FullName, json!("Ada Lovelace"));
        blur(&mut rec, FieldId::Email, json!(""));
        blur(&mut rec, FieldId::Services, json!([]));
        blur(&mut rec, FieldId::AcceptTerms, json!(false));
        blur(&mut rec, FieldId::BudgetUsd, json!(5000));
        assert!((rec.completion_rate() - 100.0 / 6.0).abs() < 1e-9);

        blur(&mut rec, FieldId::Email, json!("ada@example.com"));
        blur(&mut rec, FieldId::CompanyName, json!("Acme"));
        blur(&mut rec, FieldId::Services, json!(["UI/UX"]));
        blur(&mut rec, FieldId::ProjectStartDate, json!("2026-04-01"));
        blur(&mut rec, FieldId::AcceptTerms, json!(true));
        assert_eq!(rec.completion_rate(), 100.0);
    }

    // -- errors --

    #[test]
    fn error_metrics() {
        let mut rec = recorder();
        for field in [
            FieldId::Email,
            FieldId::FullName,
            FieldId::FullName,
            FieldId::Email,
        ] {
            rec.track_at(AnalyticsEvent::field_error(field, "bad"), at(0));
        }

        assert_eq!(rec.error_count(), 4);
        assert_eq!(rec.error_fields(), vec![FieldId::Email, FieldId::FullName]);
        // Both have two errors; fullName got there first.
        assert_eq!(rec.most_problematic_field(), Some(FieldId::FullName));
    }

    #[test]
    fn no_errors_means_no_problematic_field() {
        let rec = recorder();
        assert_eq!(rec.most_problematic_field(), None);
        assert!(rec.error_fields().is_empty());
    }

    // -- timing --

    #[test]
    fn completion_times_use_first_blur() {
        let mut rec = recorder();
        rec.track_at(AnalyticsEvent::field_focus(FieldId::FullName), at(0));
        rec.track_at(AnalyticsEvent::field_blur(FieldId::FullName, json!("A")), at(400));
        rec.track_at(AnalyticsEvent::field_focus(FieldId::FullName), at(1_000));
        rec.track_at(AnalyticsEvent::field_blur(FieldId::FullName, json!("Ab")), at(5_000));

        assert_eq!(
            rec.field_completion_times(),
            BTreeMap::from([(FieldId::FullName, 400)])
        );
    }

    #[test]
    fn session_duration() {
        let rec = recorder();
        assert_eq!(rec.session_duration_at(at(90_000)), 90_000);
        assert_eq!(rec.session_duration_at(at(-5)), 0);
    }

    // -- abandonment --

    #[test]
    fn abandon_is_recorded_once() {
        let mut rec = recorder();
        assert!(rec.mark_abandoned_at(at(100)));
        assert!(!rec.mark_abandoned_at(at(200)));
        assert!(!rec.mark_abandoned());

        let abandons = rec
            .events()
            .iter()
            .filter(|e| e.kind == EventKind::FormAbandon)
            .count();
        assert_eq!(abandons, 1);
    }

    #[test]
    fn submit_after_abandon_stays_abandoned() {
        let mut rec = recorder();
        rec.mark_abandoned_at(at(100));
        rec.track_at(AnalyticsEvent::form_submit(), at(200));
        assert!(rec.is_abandoned());
        assert!(rec.summary_at(at(300)).abandoned);
    }

    // -- handle --

    #[test]
    fn handle_clones_share_one_log() {
        let (sink, _rx) = ChannelSink::new();
        let telemetry = Telemetry::from_recorder(TelemetryRecorder::started_at(Arc::new(sink), t0()));
        let other = telemetry.clone();

        other.track_at(AnalyticsEvent::field_error(FieldId::Email, "bad"), at(10));
        telemetry.track_at(AnalyticsEvent::form_submit(), at(20));

        let summary = telemetry.summary_at(at(1_000));
        assert_eq!(summary.session_id, other.session_id());
        assert_eq!(summary.duration_ms, 1_000);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.error_fields, vec![FieldId::Email]);
        assert!(!summary.abandoned);
        assert_eq!(other.events().len(), 2);
    }
}
