//! EmotionalTelemetryEstimator for the Warden gating pipeline.
//!
//! Derives a point-in-time estimate of the operator's stress, fatigue, time
//! pressure and decision-quality trend from a bounded sliding window of
//! interaction records plus device context. Every numeric output is clamped
//! to [0, 100]. The estimate is recomputed on demand and never persisted as
//! ground truth.

pub mod config;
pub mod error;
pub mod estimator;
pub mod record;
pub mod snapshot;
pub mod source;

pub use config::{ClassBaseline, SessionBreakpoint, TelemetryConfig, TimeOfDayFatigue, TrendThresholds};
pub use error::{TelemetryError, TelemetryResult};
pub use estimator::EmotionalTelemetryEstimator;
pub use record::{DecisionSample, DeviceContext, InteractionKind, InteractionRecord, PerformanceClass, TimeOfDay};
pub use snapshot::{estimate, DecisionQualityTrend, EmotionalTelemetrySnapshot, EstimateInput, InteractionSentiment};
pub use source::{FixedTelemetry, TelemetrySource};
