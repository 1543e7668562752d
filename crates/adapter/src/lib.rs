//! Adapter (C10): `capabilities/plan/validate/apply/applyLowRisk/rollback`
//! over a change plan, backed by an append-only execution ledger (§4.10).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use context_bridge::Dialect;
use event_log::{EventLogError, EventRecord, JsonlStream};
use gov_core::{Decision, ExecutionMode, RiskLevel, StageOutcome};
use plan_gate::GateDecision;
use plan_synth::ChangePlan;
use policy_engine::CatalogPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors the adapter itself can raise (ledger I/O; everything else is a
/// recorded, non-error outcome per §4.10).
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The execution ledger could not be read or appended.
    #[error("ledger: {0}")]
    Ledger(#[from] EventLogError),
}

/// `capabilities()` response (§4.10): describes the provider dialect this
/// adapter instance targets.
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    /// Provider dialect this adapter targets.
    pub dialect: Dialect,
    /// Whether this adapter instance is wired with a live [`ErpClient`] or
    /// only the local simulated default.
    pub supports_live_apply: bool,
}

/// Query the adapter's capabilities.
#[must_use]
pub fn capabilities(dialect: Dialect, supports_live_apply: bool) -> Capabilities {
    Capabilities { dialect, supports_live_apply }
}

/// `execution_record.mode ∈ {dry-run, live-apply}` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionApplyMode {
    /// Simulated; no outward effect.
    DryRun,
    /// The opaque ERP call was actually made.
    LiveApply,
}

/// `execution_record.result ∈ {success, failed, skipped, rolled-back}` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionResult {
    /// The apply (or rollback) succeeded.
    Success,
    /// The live-apply call reported failure.
    Failed,
    /// The gate or an applyLowRisk restriction refused to run it.
    Skipped,
    /// A prior successful execution was rolled back.
    RolledBack,
}

/// One ledger row (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// `exec-…` typed id.
    pub execution_id: String,
    /// The plan this execution is for.
    pub plan_id: String,
    /// Outcome of this execution attempt.
    pub result: ExecutionResult,
    /// The gate decision this execution was run under.
    pub policy_decision: Decision,
    /// Dry-run vs live-apply.
    pub mode: ExecutionApplyMode,
    /// Action ids actually applied (empty when skipped/failed).
    #[serde(default)]
    pub actions_applied: Vec<String>,
    /// Reference to use for a subsequent rollback, for irreversible actions.
    #[serde(default)]
    pub rollback_reference: Option<String>,
    /// ISO-8601 UTC execution timestamp.
    pub executed_at: String,
    /// Human-readable reason, set when blocked/failed.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Options controlling an `apply`/`applyLowRisk` call (§4.10).
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Actually invoke the live [`ErpClient`] instead of simulating.
    pub live_apply: bool,
    /// Force a dry-run even if `live_apply` is set (dry-run is the default
    /// regardless; this only exists to make the intent explicit at call
    /// sites).
    pub dry_run: bool,
    /// Permit applying a `suggestion`-mode plan (refused by default).
    pub allow_suggestion_apply: bool,
}

/// The result of an `apply`/`applyLowRisk` call.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    /// Whether the gate or a suggestion-mode/low-risk restriction refused.
    pub blocked: bool,
    /// Reason for refusal, when blocked.
    pub reason: Option<String>,
    /// The ledger row appended for this attempt.
    pub record: ExecutionRecord,
}

/// Seam for the opaque outward ERP effect (§9 DESIGN NOTES: "Subprocess
/// dispatch ... is an implementation choice, not a contract"). The live wire
/// protocol for any concrete provider is out of scope (SPEC_FULL §6
/// Non-goals); callers needing one implement this trait.
pub trait ErpClient: Send + Sync {
    /// Apply `plan` against the live system, returning the ids of the
    /// actions that were actually applied, or an error message on failure.
    fn apply(&self, plan: &ChangePlan) -> Result<Vec<String>, String>;
}

/// Local default: simulates every apply as succeeding, applying every
/// action id unchanged. Used for dry-run and as the fallback when no real
/// [`ErpClient`] is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedErpClient;

impl ErpClient for SimulatedErpClient {
    fn apply(&self, plan: &ChangePlan) -> Result<Vec<String>, String> {
        Ok(plan.actions.iter().map(|a| a.action_id.clone()).collect())
    }
}

fn skipped_record(plan: &ChangePlan, execution_id: String, decision: Decision, now: &str, reason: String) -> ExecutionRecord {
    ExecutionRecord {
        execution_id,
        plan_id: plan.plan_id.clone(),
        result: ExecutionResult::Skipped,
        policy_decision: decision,
        mode: ExecutionApplyMode::DryRun,
        actions_applied: Vec::new(),
        rollback_reference: None,
        executed_at: now.to_string(),
        reason: Some(reason),
    }
}

fn do_apply(
    plan: &ChangePlan,
    gate: &GateDecision,
    client: &dyn ErpClient,
    ledger: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    execution_id: String,
    opts: ApplyOptions,
) -> Result<ApplyOutcome, AdapterError> {
    if gate.decision() == Decision::Deny {
        let record = skipped_record(
            plan,
            execution_id,
            gate.decision(),
            now,
            "plan gate denied this plan".to_string(),
        );
        ledger.append(record_id, now_ms, &record)?;
        return Ok(ApplyOutcome { blocked: true, reason: record.reason.clone(), record });
    }

    if plan.execution_mode == ExecutionMode::Suggestion && !opts.allow_suggestion_apply {
        let record = skipped_record(
            plan,
            execution_id,
            gate.decision(),
            now,
            "suggestion-mode plans require allow_suggestion_apply".to_string(),
        );
        ledger.append(record_id, now_ms, &record)?;
        return Ok(ApplyOutcome { blocked: true, reason: record.reason.clone(), record });
    }

    let live = opts.live_apply && !opts.dry_run;
    let applied = if live { client.apply(plan) } else { SimulatedErpClient.apply(plan) };

    let record = match applied {
        Ok(actions_applied) => ExecutionRecord {
            execution_id,
            plan_id: plan.plan_id.clone(),
            result: ExecutionResult::Success,
            policy_decision: gate.decision(),
            mode: if live { ExecutionApplyMode::LiveApply } else { ExecutionApplyMode::DryRun },
            actions_applied,
            rollback_reference: plan.rollback_plan.reference.clone(),
            executed_at: now.to_string(),
            reason: None,
        },
        Err(err) => ExecutionRecord {
            execution_id,
            plan_id: plan.plan_id.clone(),
            result: ExecutionResult::Failed,
            policy_decision: gate.decision(),
            mode: ExecutionApplyMode::LiveApply,
            actions_applied: Vec::new(),
            rollback_reference: None,
            executed_at: now.to_string(),
            reason: Some(err),
        },
    };

    ledger.append(record_id, now_ms, &record)?;
    Ok(ApplyOutcome { blocked: false, reason: record.reason.clone(), record })
}

/// `apply(plan, {liveApply, dryRun, allowSuggestionApply})` (§4.10): runs
/// `validate` first, then simulates or live-applies per `opts`.
pub fn apply(
    plan: &ChangePlan,
    catalog: &CatalogPolicy,
    approved: bool,
    client: &dyn ErpClient,
    ledger: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    execution_id: String,
    opts: ApplyOptions,
) -> Result<ApplyOutcome, AdapterError> {
    let gate = plan_gate::evaluate(plan, catalog, approved);
    do_apply(plan, &gate, client, ledger, record_id, now_ms, now, execution_id, opts)
}

/// `applyLowRisk(plan, …)` (§4.10): as [`apply`] but additionally refuses
/// unless `risk_level = low` and the gate decision is `allow`.
pub fn apply_low_risk(
    plan: &ChangePlan,
    catalog: &CatalogPolicy,
    approved: bool,
    client: &dyn ErpClient,
    ledger: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    execution_id: String,
    opts: ApplyOptions,
) -> Result<ApplyOutcome, AdapterError> {
    let gate = plan_gate::evaluate(plan, catalog, approved);
    if plan.risk_level != RiskLevel::Low || gate.decision() != Decision::Allow {
        let record = skipped_record(
            plan,
            execution_id,
            gate.decision(),
            now,
            "applyLowRisk requires risk_level=low and gate=allow".to_string(),
        );
        ledger.append(record_id, now_ms, &record)?;
        return Ok(ApplyOutcome { blocked: true, reason: record.reason.clone(), record });
    }
    do_apply(plan, &gate, client, ledger, record_id, now_ms, now, execution_id, opts)
}

/// `rollback(execution_id)` (§4.10): locates a prior `success` record in the
/// ledger and appends a `rolled-back` record; not found ⇒ `result=failed`.
pub fn rollback(
    ledger: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    target_execution_id: &str,
    new_execution_id: String,
) -> Result<ExecutionRecord, AdapterError> {
    let rows: Vec<EventRecord<ExecutionRecord>> = ledger.read_all()?;
    let prior = rows
        .into_iter()
        .map(|r| r.payload)
        .find(|r| r.execution_id == target_execution_id && r.result == ExecutionResult::Success);

    let record = match prior {
        Some(prior) => ExecutionRecord {
            execution_id: new_execution_id,
            plan_id: prior.plan_id,
            result: ExecutionResult::RolledBack,
            policy_decision: prior.policy_decision,
            mode: prior.mode,
            actions_applied: prior.actions_applied,
            rollback_reference: prior.rollback_reference,
            executed_at: now.to_string(),
            reason: None,
        },
        None => ExecutionRecord {
            execution_id: new_execution_id,
            plan_id: String::new(),
            result: ExecutionResult::Failed,
            policy_decision: Decision::Deny,
            mode: ExecutionApplyMode::DryRun,
            actions_applied: Vec::new(),
            rollback_reference: None,
            executed_at: now.to_string(),
            reason: Some(format!("no successful execution record found for {target_execution_id}")),
        },
    };

    ledger.append(record_id, now_ms, &record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_core::ActionType;
    use plan_synth::{ApprovalRequirement, PlanApproval, PlanAuthorization, PlanSecurity, RollbackPlan};

    fn plan_with(risk: RiskLevel, execution_mode: ExecutionMode, irreversible: bool) -> ChangePlan {
        ChangePlan {
            plan_id: "plan-1".into(),
            intent_id: "intent-1".into(),
            risk_level: risk,
            execution_mode,
            scope: "orders/order-list".into(),
            actions: vec![plan_synth::Action {
                action_id: "a1".into(),
                action_type: ActionType::UiFormFieldAdjust,
                touches_sensitive_data: false,
                requires_privilege_escalation: false,
                irreversible,
            }],
            impact_assessment: "x".into(),
            verification_checks: vec!["intent-to-plan consistency review".into()],
            rollback_plan: RollbackPlan {
                kind: if irreversible { "backup-restore".into() } else { "config-revert".into() },
                reference: irreversible.then(|| "backup-plan-1".to_string()),
                note: "x".into(),
            },
            approval: PlanApproval { status: ApprovalRequirement::NotRequired, dual_approved: false, approvers: vec![] },
            authorization: PlanAuthorization {
                password_required: false,
                password_scope: vec![],
                password_hash_env: "X".into(),
                password_ttl_seconds: 0,
                reason_codes: vec![],
            },
            security: PlanSecurity::default(),
            created_at: "t".into(),
        }
    }

    fn ledger() -> JsonlStream {
        JsonlStream::open(tempfile::NamedTempFile::new().unwrap().path()).unwrap()
    }

    #[test]
    fn dry_run_apply_succeeds_by_default() {
        let plan = plan_with(RiskLevel::Low, ExecutionMode::Apply, false);
        let l = ledger();
        let out = apply(
            &plan,
            &CatalogPolicy::default(),
            true,
            &SimulatedErpClient,
            &l,
            1,
            1,
            "t1",
            "exec-1".into(),
            ApplyOptions::default(),
        )
        .unwrap();
        assert!(!out.blocked);
        assert_eq!(out.record.result, ExecutionResult::Success);
        assert_eq!(out.record.mode, ExecutionApplyMode::DryRun);
    }

    #[test]
    fn suggestion_mode_is_refused_without_flag() {
        let plan = plan_with(RiskLevel::Low, ExecutionMode::Suggestion, false);
        let l = ledger();
        let out = apply(
            &plan,
            &CatalogPolicy::default(),
            true,
            &SimulatedErpClient,
            &l,
            1,
            1,
            "t1",
            "exec-1".into(),
            ApplyOptions::default(),
        )
        .unwrap();
        assert!(out.blocked);
        assert_eq!(out.record.result, ExecutionResult::Skipped);
    }

    #[test]
    fn apply_low_risk_refuses_medium_risk_plan() {
        let plan = plan_with(RiskLevel::Medium, ExecutionMode::Apply, false);
        let l = ledger();
        let out = apply_low_risk(
            &plan,
            &CatalogPolicy::default(),
            true,
            &SimulatedErpClient,
            &l,
            1,
            1,
            "t1",
            "exec-1".into(),
            ApplyOptions::default(),
        )
        .unwrap();
        assert!(out.blocked);
    }

    #[test]
    fn rollback_round_trips_a_successful_execution() {
        let plan = plan_with(RiskLevel::Low, ExecutionMode::Apply, true);
        let l = ledger();
        let applied = apply(
            &plan,
            &CatalogPolicy::default(),
            true,
            &SimulatedErpClient,
            &l,
            1,
            1,
            "t1",
            "exec-1".into(),
            ApplyOptions::default(),
        )
        .unwrap();
        assert_eq!(applied.record.result, ExecutionResult::Success);

        let rolled = rollback(&l, 2, 2, "t2", "exec-1", "exec-2".into()).unwrap();
        assert_eq!(rolled.result, ExecutionResult::RolledBack);
        assert_eq!(rolled.plan_id, plan.plan_id);
    }

    #[test]
    fn rollback_of_unknown_execution_fails() {
        let l = ledger();
        let rolled = rollback(&l, 1, 1, "t1", "exec-missing", "exec-2".into()).unwrap();
        assert_eq!(rolled.result, ExecutionResult::Failed);
    }
}
