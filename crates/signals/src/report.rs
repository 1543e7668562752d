//! Governance reporter (§4.13): aggregates decoded signal/feedback records
//! over a window into metrics, matches them against configurable
//! thresholds, and emits alerts/recommendations. Aggregation is a pure
//! function of already-decoded slices (§9 DESIGN NOTES: "Signal streams:
//! treat each JSONL as the source of truth; all aggregates are views").

use crate::feedback::FeedbackRecord;
use crate::signal::{Signal, SignalStage};
use chrono::{DateTime, Utc};
use gov_core::{BusinessMode, Decision};
use policy_engine::GovernanceThresholds;
use serde::Serialize;
use std::collections::HashSet;

/// The reporting window (§4.13: `weekly | monthly | all | custom{from,to}`).
#[derive(Debug, Clone, Copy)]
pub enum Window {
    /// The trailing 7 days from `now`.
    Weekly,
    /// The trailing 30 days from `now`.
    Monthly,
    /// No time restriction.
    All,
    /// An explicit `[from, to)` range.
    Custom {
        /// Inclusive lower bound.
        from: DateTime<Utc>,
        /// Exclusive upper bound.
        to: DateTime<Utc>,
    },
}

impl Window {
    fn bounds(self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            Self::Weekly => Some((now - chrono::Duration::days(7), now)),
            Self::Monthly => Some((now - chrono::Duration::days(30), now)),
            Self::All => None,
            Self::Custom { from, to } => Some((from, to)),
        }
    }
}

fn in_window(ts: &str, bounds: Option<(DateTime<Utc>, DateTime<Utc>)>) -> bool {
    let Some((from, to)) = bounds else { return true };
    match DateTime::parse_from_rfc3339(ts) {
        Ok(t) => {
            let t = t.with_timezone(&Utc);
            t >= from && t < to
        }
        Err(_) => false,
    }
}

/// Filter `signals` to those whose `timestamp` falls in `window` relative to
/// `now`.
#[must_use]
pub fn filter_signals(signals: &[Signal], window: Window, now: DateTime<Utc>) -> Vec<Signal> {
    let bounds = window.bounds(now);
    signals.iter().filter(|s| in_window(&s.timestamp, bounds)).cloned().collect()
}

/// Filter `feedback` to those whose `timestamp` falls in `window` relative
/// to `now`.
#[must_use]
pub fn filter_feedback(feedback: &[FeedbackRecord], window: Window, now: DateTime<Utc>) -> Vec<FeedbackRecord> {
    let bounds = window.bounds(now);
    feedback.iter().filter(|f| in_window(&f.timestamp, bounds)).cloned().collect()
}

/// Pre-window-filtered execution ledger counts the caller supplies (kept
/// decoupled from the `adapter` crate's ledger type to keep aggregation a
/// pure function of plain data, per §9 DESIGN NOTES).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionCounts {
    /// Successful applies.
    pub success: u64,
    /// Failed live-apply attempts.
    pub failed: u64,
    /// Gate/restriction-skipped attempts.
    pub skipped: u64,
    /// Rollback records.
    pub rolled_back: u64,
}

impl ExecutionCounts {
    fn apply_total(self) -> u64 {
        self.success + self.failed + self.skipped
    }
}

/// Inputs to [`generate`]; every slice is assumed already window-filtered
/// (via [`filter_signals`]/[`filter_feedback`]).
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    /// Dialogue-governor signals.
    pub dialogue: &'a [Signal],
    /// Runtime policy evaluator signals.
    pub runtime: &'a [Signal],
    /// Authorization tier evaluator signals.
    pub authorization_tier: &'a [Signal],
    /// Matrix-baseline ingestion signals.
    pub matrix: &'a [Signal],
    /// Feedback records.
    pub feedback: &'a [FeedbackRecord],
    /// Total intents created in the window.
    pub intent_total: u64,
    /// Execution ledger counts in the window.
    pub execution: ExecutionCounts,
}

/// Per-stage `{allow, deny, review, block}` totals and `block_rate%` (§4.13).
/// `block` is equated with `deny` for these three gating stages — an
/// execution-level block is a downstream adapter concern already reflected
/// in `execution_success_rate`/`rollback_rate`.
#[derive(Debug, Clone, Serialize)]
pub struct StageBreakdown {
    /// Count of `allow` decisions.
    pub allow: u64,
    /// Count of `deny` decisions.
    pub deny: u64,
    /// Count of `review-required` decisions.
    pub review: u64,
    /// Count of blocking decisions (equal to `deny` for this stage).
    pub block: u64,
    /// `block / (allow + deny + review) * 100`, rounded to 2 places.
    pub block_rate: Option<f64>,
}

fn breakdown(signals: &[Signal]) -> StageBreakdown {
    let allow = signals.iter().filter(|s| s.decision == Decision::Allow).count() as u64;
    let deny = signals.iter().filter(|s| s.decision == Decision::Deny).count() as u64;
    let review = signals.iter().filter(|s| s.decision == Decision::ReviewRequired).count() as u64;
    let total = allow + deny + review;
    StageBreakdown { allow, deny, review, block: deny, block_rate: round_pct(deny, total) }
}

/// Matrix-ingestion rollup (§4.13).
#[derive(Debug, Clone, Serialize)]
pub struct MatrixBreakdown {
    /// Share of matrix records flagged `pass`.
    pub portfolio_pass_rate: Option<f64>,
    /// Share of matrix records flagging a positive regression.
    pub regression_positive_rate: Option<f64>,
    /// Share of matrix records flagging a scoring-stage error.
    pub stage_error_rate: Option<f64>,
    /// Mean of the numeric scores present.
    pub avg_score: Option<f64>,
    /// Share of matrix records flagged `valid`.
    pub avg_valid_rate: Option<f64>,
}

fn matrix_breakdown(signals: &[Signal]) -> MatrixBreakdown {
    let total = signals.len() as u64;
    let pass = signals.iter().filter(|s| s.matrix_pass == Some(true)).count() as u64;
    let regression = signals.iter().filter(|s| s.matrix_regression_positive == Some(true)).count() as u64;
    let errored = signals.iter().filter(|s| s.matrix_stage_error == Some(true)).count() as u64;
    let valid = signals.iter().filter(|s| s.matrix_valid == Some(true)).count() as u64;
    let scores: Vec<f64> = signals.iter().filter_map(|s| s.matrix_score).collect();
    let avg_score = (!scores.is_empty()).then(|| round2(scores.iter().sum::<f64>() / scores.len() as f64));
    MatrixBreakdown {
        portfolio_pass_rate: round_pct(pass, total),
        regression_positive_rate: round_pct(regression, total),
        stage_error_rate: round_pct(errored, total),
        avg_score,
        avg_valid_rate: round_pct(valid, total),
    }
}

/// Session counts by `business_mode`, with `unknown_total` tracked alongside
/// (§3: "business_mode breakdown with `unknown_total` tracked independently").
#[derive(Debug, Clone, Default, Serialize)]
pub struct BusinessModeBreakdown {
    /// Sessions in `user-mode`.
    pub user_mode: u64,
    /// Sessions in `ops-mode`.
    pub ops_mode: u64,
    /// Sessions in `dev-mode`.
    pub dev_mode: u64,
    /// Sessions whose mode could not be determined.
    pub unknown_total: u64,
}

fn business_mode_breakdown(all_signals: &[&[Signal]]) -> BusinessModeBreakdown {
    let mut out = BusinessModeBreakdown::default();
    for s in all_signals.iter().flat_map(|group| group.iter()) {
        match s.business_mode {
            BusinessMode::UserMode => out.user_mode += 1,
            BusinessMode::OpsMode => out.ops_mode += 1,
            BusinessMode::DevMode => out.dev_mode += 1,
            BusinessMode::Unknown => out.unknown_total += 1,
        }
    }
    out
}

/// The exhaustive metric set (§4.13).
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    /// Total intents in the window.
    pub intent_total: u64,
    /// Total apply attempts (success + failed + skipped).
    pub apply_total: u64,
    /// Total rollback records.
    pub rollback_total: u64,
    /// Total security-motivated intercepts.
    pub security_intercept_total: u64,
    /// `execution.success / intent_total * 100`.
    pub adoption_rate: Option<f64>,
    /// `execution.success / apply_total * 100`.
    pub execution_success_rate: Option<f64>,
    /// `rollback_total / apply_total * 100`.
    pub rollback_rate: Option<f64>,
    /// `security_intercept_total / intent_total * 100`.
    pub security_intercept_rate: Option<f64>,
    /// Mean feedback score across the window, if any feedback exists.
    pub satisfaction_avg_score: Option<f64>,
    /// Dialogue-governor breakdown.
    pub dialogue_authorization: StageBreakdown,
    /// Runtime policy evaluator breakdown.
    pub runtime: StageBreakdown,
    /// Authorization tier evaluator breakdown.
    pub authorization_tier: StageBreakdown,
    /// Matrix-ingestion breakdown.
    pub matrix: MatrixBreakdown,
    /// Business-mode breakdown across all gating stages.
    pub business_mode: BusinessModeBreakdown,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round_pct(n: u64, d: u64) -> Option<f64> {
    if d == 0 {
        None
    } else {
        Some(round2(n as f64 / d as f64 * 100.0))
    }
}

/// Alert severity; both qualify for `--fail-on-alert` ⇒ exit 2 (§4.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// A metric crossed its warning threshold.
    Medium,
    /// A metric crossed its alert (more severe) threshold.
    High,
}

/// One threshold breach.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    /// Severity of this breach.
    pub severity: AlertSeverity,
    /// Name of the metric that breached.
    pub metric: String,
    /// The metric's current value.
    pub value: f64,
    /// The threshold it breached.
    pub threshold: f64,
    /// Human-readable recommendation; alerts are deduplicated by this text.
    pub recommendation: String,
}

/// `{status, breaches, warnings}` (§4.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// No threshold breaches.
    Ok,
    /// Only warning-level breaches.
    Degraded,
    /// At least one alert-level breach.
    Critical,
}

/// Summary counts alongside the report's overall status.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// Count of high-severity alerts.
    pub breaches: usize,
    /// Count of medium-severity alerts.
    pub warnings: usize,
    /// Overall status derived from `breaches`/`warnings`.
    pub status: ReportStatus,
}

/// The full governance report (§4.13).
#[derive(Debug, Clone, Serialize)]
pub struct GovernanceReport {
    /// The computed metric set.
    pub metrics: Metrics,
    /// Threshold breaches, deduplicated by recommendation text.
    pub alerts: Vec<Alert>,
    /// Recommendations, one per surviving alert, in the same order.
    pub recommendations: Vec<String>,
    /// Summary counts and overall status.
    pub summary: ReportSummary,
}

fn push_alert(alerts: &mut Vec<Alert>, seen: &mut HashSet<String>, alert: Alert) {
    if seen.insert(alert.recommendation.clone()) {
        alerts.push(alert);
    }
}

/// Compute metrics and match them against `thresholds` (§4.13).
#[must_use]
pub fn generate(inputs: ReportInputs<'_>, thresholds: &GovernanceThresholds) -> GovernanceReport {
    let apply_total = inputs.execution.apply_total();
    let security_intercept_total = inputs
        .dialogue
        .iter()
        .chain(inputs.runtime.iter())
        .chain(inputs.authorization_tier.iter())
        .filter(|s| s.security_related)
        .count() as u64;

    let satisfaction_avg_score = (!inputs.feedback.is_empty()).then(|| {
        round2(inputs.feedback.iter().map(|f| f64::from(f.score)).sum::<f64>() / inputs.feedback.len() as f64)
    });

    let dialogue_authorization = breakdown(inputs.dialogue);
    let runtime = breakdown(inputs.runtime);
    let authorization_tier = breakdown(inputs.authorization_tier);

    let metrics = Metrics {
        intent_total: inputs.intent_total,
        apply_total,
        rollback_total: inputs.execution.rolled_back,
        security_intercept_total,
        adoption_rate: round_pct(inputs.execution.success, inputs.intent_total),
        execution_success_rate: round_pct(inputs.execution.success, apply_total),
        rollback_rate: round_pct(inputs.execution.rolled_back, apply_total),
        security_intercept_rate: round_pct(security_intercept_total, inputs.intent_total),
        satisfaction_avg_score,
        matrix: matrix_breakdown(inputs.matrix),
        business_mode: business_mode_breakdown(&[inputs.dialogue, inputs.runtime, inputs.authorization_tier]),
        dialogue_authorization,
        runtime,
        authorization_tier,
    };

    let mut alerts = Vec::new();
    let mut seen = HashSet::new();

    if let Some(v) = metrics.adoption_rate {
        if v < thresholds.adoption_rate_warn_below {
            push_alert(&mut alerts, &mut seen, Alert {
                severity: AlertSeverity::Medium,
                metric: "adoption_rate".to_string(),
                value: v,
                threshold: thresholds.adoption_rate_warn_below,
                recommendation: "Adoption rate is below the warning threshold; investigate dialogue/gate friction".to_string(),
            });
        }
    }
    if let Some(v) = metrics.execution_success_rate {
        if v < thresholds.execution_success_rate_alert_below {
            push_alert(&mut alerts, &mut seen, Alert {
                severity: AlertSeverity::High,
                metric: "execution_success_rate".to_string(),
                value: v,
                threshold: thresholds.execution_success_rate_alert_below,
                recommendation: "Execution success rate has dropped below the alert threshold; review recent live-apply failures".to_string(),
            });
        }
    }
    if let Some(v) = metrics.rollback_rate {
        if v > thresholds.rollback_rate_alert_above {
            push_alert(&mut alerts, &mut seen, Alert {
                severity: AlertSeverity::High,
                metric: "rollback_rate".to_string(),
                value: v,
                threshold: thresholds.rollback_rate_alert_above,
                recommendation: "Rollback rate exceeds the alert threshold; investigate plan quality".to_string(),
            });
        }
    }
    if let Some(v) = metrics.security_intercept_rate {
        if v > thresholds.security_intercept_rate_warn_above {
            push_alert(&mut alerts, &mut seen, Alert {
                severity: AlertSeverity::Medium,
                metric: "security_intercept_rate".to_string(),
                value: v,
                threshold: thresholds.security_intercept_rate_warn_above,
                recommendation: "Security intercept rate is elevated; review sensitive-data handling in recent plans".to_string(),
            });
        }
    }
    if let Some(v) = metrics.satisfaction_avg_score {
        if v < thresholds.satisfaction_avg_score_warn_below {
            push_alert(&mut alerts, &mut seen, Alert {
                severity: AlertSeverity::Medium,
                metric: "satisfaction_avg_score".to_string(),
                value: v,
                threshold: thresholds.satisfaction_avg_score_warn_below,
                recommendation: "Average satisfaction score is below the warning threshold; review recent feedback".to_string(),
            });
        }
    }
    for (stage, name) in [
        (&metrics.dialogue_authorization, SignalStage::DialogueAuthorization),
        (&metrics.runtime, SignalStage::Runtime),
        (&metrics.authorization_tier, SignalStage::AuthorizationTier),
    ] {
        if let Some(v) = stage.block_rate {
            if v > thresholds.block_rate_alert_above {
                push_alert(&mut alerts, &mut seen, Alert {
                    severity: AlertSeverity::High,
                    metric: format!("{name:?}_block_rate"),
                    value: v,
                    threshold: thresholds.block_rate_alert_above,
                    recommendation: format!("{name:?} block rate exceeds the alert threshold; review policy/catalog configuration"),
                });
            }
        }
    }

    let breaches = alerts.iter().filter(|a| a.severity == AlertSeverity::High).count();
    let warnings = alerts.iter().filter(|a| a.severity == AlertSeverity::Medium).count();
    let status = if breaches > 0 {
        ReportStatus::Critical
    } else if warnings > 0 {
        ReportStatus::Degraded
    } else {
        ReportStatus::Ok
    };

    let recommendations = alerts.iter().map(|a| a.recommendation.clone()).collect();

    GovernanceReport { metrics, alerts, recommendations, summary: ReportSummary { breaches, warnings, status } }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(stage: SignalStage, decision: Decision) -> Signal {
        Signal {
            stage,
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            session_id: "s1".to_string(),
            business_mode: BusinessMode::OpsMode,
            decision,
            security_related: false,
            matrix_pass: None,
            matrix_valid: None,
            matrix_regression_positive: None,
            matrix_stage_error: None,
            matrix_score: None,
        }
    }

    #[test]
    fn block_rate_breach_raises_high_alert() {
        let dialogue = vec![
            signal(SignalStage::DialogueAuthorization, Decision::Deny),
            signal(SignalStage::DialogueAuthorization, Decision::Deny),
            signal(SignalStage::DialogueAuthorization, Decision::Allow),
        ];
        let inputs = ReportInputs {
            dialogue: &dialogue,
            runtime: &[],
            authorization_tier: &[],
            matrix: &[],
            feedback: &[],
            intent_total: 3,
            execution: ExecutionCounts::default(),
        };
        let mut thresholds = GovernanceThresholds::default();
        thresholds.block_rate_alert_above = 30.0;
        let report = generate(inputs, &thresholds);
        assert!(report.alerts.iter().any(|a| a.metric.contains("block_rate")));
        assert_eq!(report.summary.status, ReportStatus::Critical);
    }

    #[test]
    fn empty_inputs_produce_ok_status_with_null_rates() {
        let inputs = ReportInputs {
            dialogue: &[],
            runtime: &[],
            authorization_tier: &[],
            matrix: &[],
            feedback: &[],
            intent_total: 0,
            execution: ExecutionCounts::default(),
        };
        let report = generate(inputs, &GovernanceThresholds::default());
        assert_eq!(report.summary.status, ReportStatus::Ok);
        assert!(report.metrics.adoption_rate.is_none());
    }
}
