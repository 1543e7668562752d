//! Runtime Policy Evaluator (C7): combines `runtime_mode × runtime_environment
//! × ui_mode` with a plan to classify deny/review/allow and emit apply
//! requirements (§4.7).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use gov_core::decision::{dedup_reasons, Severity, StageOutcome, Violation};
use gov_core::{Decision, ExecutionMode, RiskLevel};
use plan_synth::ChangePlan;
use policy_engine::{Policy, RuntimeEnvironmentConfig, RuntimeModeConfig};
use serde::Serialize;

/// Apply-eligibility requirements emitted alongside the decision (§3).
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeRequirements {
    /// Whether live apply is not blocked by this stage.
    pub allow_live_apply: bool,
    /// Whether a dry run must complete before a live apply (conservatively
    /// `true` whenever the environment also requires manual review).
    pub require_dry_run_before_live_apply: bool,
    /// Whether manual review is required for `execution_mode = apply`.
    pub manual_review_required_for_apply: bool,
    /// Whether a mutating apply is permitted under this runtime mode.
    pub allow_mutating_apply: bool,
    /// Whether a password is required for mutating applies.
    pub require_password_for_apply_mutations: bool,
    /// Whether this plan's risk level requires an approval.
    pub require_approval: bool,
    /// Whether that approval (if required) is currently satisfied.
    pub approval_satisfied: bool,
    /// Highest risk level this environment permits for apply.
    pub max_risk_level_for_apply: RiskLevel,
    /// Highest risk level eligible for auto-execution.
    pub max_auto_execute_risk_level: RiskLevel,
    /// Whether this plan is eligible for auto-execution.
    pub auto_execute_allowed: bool,
}

/// Action/risk/review counts (§3).
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeSummary {
    /// Number of actions on the plan.
    pub action_count: usize,
    /// The plan's risk level.
    pub risk_level: RiskLevel,
    /// Total violations recorded.
    pub violation_count: usize,
}

/// The runtime policy evaluator's decision (§3).
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeDecision {
    /// Overall decision.
    pub decision: Decision,
    /// Deduplicated human-readable reasons.
    pub reasons: Vec<String>,
    /// Individual violations recorded.
    pub violations: Vec<Violation>,
    /// Aggregate counts.
    pub summary: RuntimeSummary,
    /// Apply-eligibility requirements.
    pub requirements: RuntimeRequirements,
}

impl StageOutcome for RuntimeDecision {
    fn decision(&self) -> Decision {
        self.decision
    }
    fn reasons(&self) -> &[String] {
        &self.reasons
    }
    fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

fn violation(id: &str, severity: Severity, detail: String) -> Violation {
    Violation { id: id.to_string(), severity, detail }
}

/// Evaluate the runtime policy for `plan` under the resolved mode/environment
/// (and, if the policy declares one, the ui_mode) configs. `ui_mode_name`
/// is the raw ui_mode token the caller requested, looked up against
/// `policy.ui_modes`; `None` skips the ui_mode checks entirely. `approved`
/// reflects whether the plan's approval workflow instance currently has
/// `status = approved` (§4.7, §4.9).
#[must_use]
pub fn evaluate(
    plan: &ChangePlan,
    policy: &Policy,
    mode_cfg: &RuntimeModeConfig,
    mode_name: &str,
    env_cfg: &RuntimeEnvironmentConfig,
    ui_mode_name: Option<&str>,
    approved: bool,
) -> RuntimeDecision {
    let mut violations = Vec::new();
    let any_mutating = plan.actions.iter().any(|a| a.action_type != gov_core::ActionType::AnalysisOnly);

    if !mode_cfg.allow_execution_modes.contains(&plan.execution_mode) {
        violations.push(violation(
            "execution-mode-not-allowed",
            Severity::Deny,
            format!("runtime mode {mode_name} does not allow execution_mode {}", plan.execution_mode),
        ));
    }
    if let Some(a) = plan.actions.iter().find(|a| mode_cfg.deny_action_types.contains(&a.action_type)) {
        violations.push(violation(
            "mode-deny-action-type",
            Severity::Deny,
            format!("runtime mode {mode_name} denies action type {:?}", a.action_type),
        ));
    }

    if let Some(ui_mode_name) = ui_mode_name {
        match policy.ui_modes.get(ui_mode_name) {
            None => {
                violations.push(violation(
                    "ui-mode-undefined",
                    Severity::Deny,
                    format!("ui_mode {ui_mode_name} is not defined in policy"),
                ));
            }
            Some(ui_cfg) => {
                if !ui_cfg.allowed_runtime_modes.is_empty()
                    && !ui_cfg.allowed_runtime_modes.iter().any(|m| m == mode_name)
                {
                    violations.push(violation(
                        "ui-mode-runtime-not-allowed",
                        Severity::Deny,
                        format!("ui_mode {ui_mode_name} does not permit runtime mode {mode_name}"),
                    ));
                }
                if !ui_cfg.allowed_execution_modes.contains(&plan.execution_mode) {
                    violations.push(violation(
                        "ui-mode-execution-not-allowed",
                        Severity::Deny,
                        format!("ui_mode {ui_mode_name} does not permit execution_mode {}", plan.execution_mode),
                    ));
                }
            }
        }
    }

    if mode_cfg.forbid_mutating_apply && plan.execution_mode == ExecutionMode::Apply && any_mutating {
        violations.push(violation(
            "mode-forbids-mutating-apply",
            Severity::Deny,
            format!("runtime mode {mode_name} forbids mutating apply"),
        ));
    }

    if plan.execution_mode == ExecutionMode::Apply && plan.risk_level > env_cfg.max_risk_level_for_apply {
        violations.push(violation(
            "risk-exceeds-environment-ceiling",
            Severity::Deny,
            format!(
                "risk level {} exceeds max_risk_level_for_apply {}",
                plan.risk_level, env_cfg.max_risk_level_for_apply
            ),
        ));
    }

    if plan.actions.iter().any(|a| mode_cfg.review_required_action_types.contains(&a.action_type)) {
        violations.push(violation(
            "mode-review-required-action-type",
            Severity::Review,
            "action type requires review under this runtime mode".to_string(),
        ));
    }
    if env_cfg.manual_review_required_for_apply && plan.execution_mode == ExecutionMode::Apply {
        violations.push(violation(
            "environment-manual-review-required",
            Severity::Review,
            "environment requires manual review for apply".to_string(),
        ));
    }
    let require_approval = env_cfg.require_approval_for_risk_levels.contains(&plan.risk_level);
    if require_approval && !approved {
        violations.push(violation(
            "risk-requires-approval",
            Severity::Review,
            format!("risk level {} requires an approved plan", plan.risk_level),
        ));
    }
    if env_cfg.require_password_for_apply_mutations
        && plan.execution_mode == ExecutionMode::Apply
        && any_mutating
        && !plan.authorization.password_required
    {
        violations.push(violation(
            "password-required-for-apply-mutations",
            Severity::Review,
            "environment requires password authorization for mutating apply".to_string(),
        ));
    }

    let decision = Decision::combine(violations.iter().map(|v| match v.severity {
        Severity::Deny => Decision::Deny,
        Severity::Review => Decision::ReviewRequired,
    }));

    let auto_execute_allowed = plan.execution_mode == ExecutionMode::Apply
        && plan.risk_level <= env_cfg.max_auto_execute_risk_level
        && decision == Decision::Allow;

    let reasons = dedup_reasons(violations.iter().map(|v| v.detail.clone()).collect());
    let violation_count = violations.len();

    RuntimeDecision {
        decision,
        reasons,
        summary: RuntimeSummary { action_count: plan.actions.len(), risk_level: plan.risk_level, violation_count },
        requirements: RuntimeRequirements {
            allow_live_apply: decision == Decision::Allow && plan.execution_mode == ExecutionMode::Apply,
            require_dry_run_before_live_apply: env_cfg.manual_review_required_for_apply,
            manual_review_required_for_apply: env_cfg.manual_review_required_for_apply,
            allow_mutating_apply: !mode_cfg.forbid_mutating_apply,
            require_password_for_apply_mutations: env_cfg.require_password_for_apply_mutations,
            require_approval,
            approval_satisfied: approved,
            max_risk_level_for_apply: env_cfg.max_risk_level_for_apply,
            max_auto_execute_risk_level: env_cfg.max_auto_execute_risk_level,
            auto_execute_allowed,
        },
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_core::{ActionType, ExecutionMode as EM, RiskLevel as RL};
    use plan_synth::{Action, ApprovalRequirement, PlanApproval, PlanAuthorization, PlanSecurity, RollbackPlan};

    fn plan_with(actions: Vec<Action>, mode: EM, risk: RL) -> ChangePlan {
        ChangePlan {
            plan_id: "plan-1".into(),
            intent_id: "intent-1".into(),
            risk_level: risk,
            execution_mode: mode,
            scope: "orders/order-list".into(),
            actions,
            impact_assessment: "x".into(),
            verification_checks: vec![],
            rollback_plan: RollbackPlan { kind: "config-revert".into(), reference: None, note: "x".into() },
            approval: PlanApproval { status: ApprovalRequirement::NotRequired, dual_approved: false, approvers: vec![] },
            authorization: PlanAuthorization {
                password_required: true,
                password_scope: vec!["execute".into()],
                password_hash_env: "X".into(),
                password_ttl_seconds: 0,
                reason_codes: vec![],
            },
            security: PlanSecurity::default(),
            created_at: "t".into(),
        }
    }

    fn action(t: ActionType) -> Action {
        let (s, e, i) = t.defaults();
        Action { action_id: "a1".into(), action_type: t, touches_sensitive_data: s, requires_privilege_escalation: e, irreversible: i }
    }

    #[test]
    fn allow_when_nothing_violates() {
        let policy = Policy::load(None).unwrap();
        let plan = plan_with(vec![action(ActionType::UiFormFieldAdjust)], EM::Suggestion, RL::Low);
        let mode = policy.runtime_mode(gov_core::RuntimeMode::OpsFix).unwrap();
        let env = policy.runtime_environment(gov_core::RuntimeEnvironment::Dev).unwrap();
        let d = evaluate(&plan, &policy, mode, "ops-fix", env, None, true);
        assert_eq!(d.decision, Decision::Allow);
    }

    #[test]
    fn risk_above_environment_ceiling_denies() {
        let policy = Policy::load(None).unwrap();
        let plan = plan_with(vec![action(ActionType::BulkDeleteWithoutFilter)], EM::Apply, RL::High);
        let mode = policy.runtime_mode(gov_core::RuntimeMode::OpsFix).unwrap();
        let env = policy.runtime_environment(gov_core::RuntimeEnvironment::Prod).unwrap();
        let d = evaluate(&plan, &policy, mode, "ops-fix", env, None, true);
        assert_eq!(d.decision, Decision::Deny);
    }

    #[test]
    fn auto_execute_allowed_only_on_low_risk_apply_allow() {
        let policy = Policy::load(None).unwrap();
        let plan = plan_with(vec![action(ActionType::UiFormFieldAdjust)], EM::Apply, RL::Low);
        let mode = policy.runtime_mode(gov_core::RuntimeMode::OpsFix).unwrap();
        let env = policy.runtime_environment(gov_core::RuntimeEnvironment::Staging).unwrap();
        let d = evaluate(&plan, &policy, mode, "ops-fix", env, None, true);
        assert!(d.requirements.auto_execute_allowed);
    }
}
