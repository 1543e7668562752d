//! Governance-reporter thresholds (§4.13), consumed by `signals` (C13).

use serde::{Deserialize, Serialize};

/// Thresholds the governance reporter compares aggregated rates against
/// (§4.13). All rates are percentages in `[0, 100]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceThresholds {
    /// Below this adoption rate, raise a warning.
    #[serde(default = "default_adoption_warn")]
    pub adoption_rate_warn_below: f64,
    /// Below this execution success rate, raise an alert.
    #[serde(default = "default_success_alert")]
    pub execution_success_rate_alert_below: f64,
    /// Above this rollback rate, raise an alert.
    #[serde(default = "default_rollback_alert")]
    pub rollback_rate_alert_above: f64,
    /// Above this security-intercept rate, raise a warning (expected to be
    /// nonzero; a spike suggests policy is mis-tuned upstream).
    #[serde(default = "default_security_intercept_warn")]
    pub security_intercept_rate_warn_above: f64,
    /// Above this block rate for any stage, raise an alert.
    #[serde(default = "default_block_alert")]
    pub block_rate_alert_above: f64,
    /// Below this average satisfaction score, raise a warning.
    #[serde(default = "default_satisfaction_warn")]
    pub satisfaction_avg_score_warn_below: f64,
}

fn default_adoption_warn() -> f64 {
    40.0
}
fn default_success_alert() -> f64 {
    85.0
}
fn default_rollback_alert() -> f64 {
    15.0
}
fn default_security_intercept_warn() -> f64 {
    25.0
}
fn default_block_alert() -> f64 {
    30.0
}
fn default_satisfaction_warn() -> f64 {
    3.0
}

impl Default for GovernanceThresholds {
    fn default() -> Self {
        Self {
            adoption_rate_warn_below: default_adoption_warn(),
            execution_success_rate_alert_below: default_success_alert(),
            rollback_rate_alert_above: default_rollback_alert(),
            security_intercept_rate_warn_above: default_security_intercept_warn(),
            block_rate_alert_above: default_block_alert(),
            satisfaction_avg_score_warn_below: default_satisfaction_warn(),
        }
    }
}
