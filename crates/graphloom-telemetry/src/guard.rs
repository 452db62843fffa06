//! Threshold guards over the current run's normalization summaries.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_LLM_FAILURE_THRESHOLD: u64 = 50;
pub const DEFAULT_FALLBACK_THRESHOLD: u64 = 100;

/// What a guard breach does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// No checks at all.
    Off,
    /// Alerts are logged; the run proceeds.
    #[default]
    Warn,
    /// An error-severity alert aborts the write phase.
    Fail,
}

impl FromStr for GuardMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown guard mode: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardOptions {
    pub mode: GuardMode,
    pub llm_failure_threshold: u64,
    pub fallback_threshold: u64,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            mode: GuardMode::default(),
            llm_failure_threshold: DEFAULT_LLM_FAILURE_THRESHOLD,
            fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
        }
    }
}

impl GuardOptions {
    /// Environment-driven configuration: `GRAPHLOOM_GUARD_MODE`,
    /// `GRAPHLOOM_GUARD_LLM_FAILURES`, `GRAPHLOOM_GUARD_FALLBACKS`.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(raw) = std::env::var("GRAPHLOOM_GUARD_MODE") {
            if let Ok(mode) = raw.parse() {
                options.mode = mode;
            }
        }
        if let Some(threshold) = env_u64("GRAPHLOOM_GUARD_LLM_FAILURES") {
            options.llm_failure_threshold = threshold;
        }
        if let Some(threshold) = env_u64("GRAPHLOOM_GUARD_FALLBACKS") {
            options.fallback_threshold = threshold;
        }
        options
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Per-domain counters the guards evaluate; built from each normalizer's
/// run summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardInput {
    pub domain: String,
    pub llm_failures: u64,
    pub fallback_count: u64,
    pub total: u64,
    pub updated: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardAlert {
    pub scope: String,
    pub message: String,
    pub severity: AlertSeverity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardReport {
    pub alerts: Vec<GuardAlert>,
    pub should_fail: bool,
}

/// Evaluate the guards. LLM-failure breaches are `error` severity;
/// fallback breaches and the `updated == 0 of total > 0` condition are
/// `warning`. Only `fail` mode with an error alert sets `should_fail`.
pub fn evaluate_normalization_guards(
    inputs: &[GuardInput],
    options: &GuardOptions,
) -> GuardReport {
    if options.mode == GuardMode::Off {
        return GuardReport::default();
    }

    let mut alerts = Vec::new();
    for input in inputs {
        if options.llm_failure_threshold > 0 && input.llm_failures >= options.llm_failure_threshold
        {
            alerts.push(GuardAlert {
                scope: format!("guard.{}", input.domain),
                message: format!(
                    "{} LLM failures {} exceed threshold {}",
                    input.domain, input.llm_failures, options.llm_failure_threshold
                ),
                severity: AlertSeverity::Error,
            });
        }
        if options.fallback_threshold > 0 && input.fallback_count >= options.fallback_threshold {
            alerts.push(GuardAlert {
                scope: format!("guard.{}", input.domain),
                message: format!(
                    "{} fallback count {} exceeds threshold {}",
                    input.domain, input.fallback_count, options.fallback_threshold
                ),
                severity: AlertSeverity::Warning,
            });
        }
        if input.total > 0 && input.updated == 0 {
            alerts.push(GuardAlert {
                scope: format!("guard.{}", input.domain),
                message: format!(
                    "{} normalization updated 0 / {}, please inspect logs",
                    input.domain, input.total
                ),
                severity: AlertSeverity::Warning,
            });
        }
    }

    let should_fail = options.mode == GuardMode::Fail
        && alerts.iter().any(|alert| alert.severity == AlertSeverity::Error);
    GuardReport { alerts, should_fail }
}
