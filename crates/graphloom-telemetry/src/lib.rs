//! Run telemetry: the append-only metrics ring buffer and the quality
//! guards evaluated over each run's normalization summaries.

pub mod guard;
pub mod metrics;

pub use guard::{
    evaluate_normalization_guards, AlertSeverity, GuardAlert, GuardInput, GuardMode, GuardOptions,
    GuardReport,
};
pub use metrics::MetricsStore;
