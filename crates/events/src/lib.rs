//! Form change stream and session telemetry.
//!
//! - [`FormBus`]: in-process publish/subscribe hub for [`FormEvent`]s,
//!   backed by `tokio::sync::broadcast`.
//! - [`TelemetryRecorder`]: append-only analytics log with derived session
//!   metrics, shared through the cloneable [`Telemetry`] handle.
//! - [`sink`]: where tracked events go once recorded (log, channel, webhook).
//! - [`delivery`]: HTTP delivery of telemetry records with retry.

pub mod bus;
pub mod delivery;
pub mod sink;
pub mod telemetry;

pub use bus::{ChangeOrigin, FormBus, FormEvent};
pub use delivery::{DeliveryError, TelemetryDelivery};
pub use sink::{ChannelSink, TelemetrySink, TracingSink, WebhookSink};
pub use telemetry::{
    AnalyticsEvent, EventKind, SessionSummary, Telemetry, TelemetryRecord, TelemetryRecorder,
};
