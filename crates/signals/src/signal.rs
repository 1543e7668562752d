//! Per-stage signal emission: one append to a global stage stream and one
//! to a per-session copy, after every decision stage (§4.13, §3).

use event_log::{EventLogError, JsonlStream};
use gov_core::{BusinessMode, Decision};
use serde::{Deserialize, Serialize};

/// Which stage produced this signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStage {
    /// Dialogue governor decision.
    DialogueAuthorization,
    /// Runtime policy evaluator decision.
    Runtime,
    /// Authorization tier evaluator decision.
    AuthorizationTier,
    /// External matrix-baseline scoring ingestion (§4.13; scoring logic
    /// itself is out of scope, only its emitted record is ingested).
    Matrix,
}

/// One append-only signal row (§3: "always including `timestamp`,
/// `session_id`, `business_mode`, and decision").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Which stage this signal reports on.
    pub stage: SignalStage,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
    /// The session this signal was produced for.
    pub session_id: String,
    /// The business mode active for this session.
    pub business_mode: BusinessMode,
    /// The stage's decision (a placeholder `Allow` for matrix records, which
    /// are not decision-bearing).
    pub decision: Decision,
    /// Set by the caller when a deny/blocked decision is security-motivated
    /// (masking, plaintext-secret, or privilege-escalation related), feeding
    /// `security_intercept_total`/`security_intercept_rate%`.
    #[serde(default)]
    pub security_related: bool,
    /// Matrix record: whether the portfolio entry passed.
    #[serde(default)]
    pub matrix_pass: Option<bool>,
    /// Matrix record: whether the entry was valid.
    #[serde(default)]
    pub matrix_valid: Option<bool>,
    /// Matrix record: whether a regression was flagged positive.
    #[serde(default)]
    pub matrix_regression_positive: Option<bool>,
    /// Matrix record: whether the scoring stage itself errored.
    #[serde(default)]
    pub matrix_stage_error: Option<bool>,
    /// Matrix record: the numeric score, if any.
    #[serde(default)]
    pub matrix_score: Option<f64>,
}

/// Append `signal` to both the global, stage-specific stream and the
/// session's local copy.
pub fn emit(
    global: &JsonlStream,
    per_session: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    signal: &Signal,
) -> Result<(), EventLogError> {
    global.append(record_id, now_ms, signal)?;
    per_session.append(record_id, now_ms, signal)?;
    Ok(())
}
