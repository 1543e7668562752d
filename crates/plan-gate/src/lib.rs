//! Plan Gate (C6): applies the nine catalog/policy guardrail checks to a
//! change plan and folds them into a single decision (§4.6).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use gov_core::decision::{dedup_reasons, Severity, StageOutcome, Violation};
use gov_core::{ActionType, Decision};
use plan_synth::{ApprovalRequirement, ChangePlan};
use policy_engine::CatalogPolicy;
use serde::Serialize;

/// One check's outcome (§4.6).
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    /// Stable check id, e.g. `"deny-action-types"`.
    pub id: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Severity the check carries when it fails.
    pub severity: Severity,
    /// Optional human-readable detail.
    pub details: Option<String>,
}

/// Check-count breakdown (§3).
#[derive(Debug, Clone, Serialize)]
pub struct GateSummary {
    /// Total checks evaluated.
    pub check_total: usize,
    /// Total checks that failed.
    pub failed_total: usize,
    /// Deny-severity checks that failed.
    pub failed_deny_total: usize,
    /// Review-severity checks that failed.
    pub failed_review_total: usize,
    /// Number of actions on the plan.
    pub action_count: usize,
    /// The plan's risk level, echoed for convenience.
    pub risk_level: gov_core::RiskLevel,
}

/// The plan gate's decision (§3).
#[derive(Debug, Clone, Serialize)]
pub struct GateDecision {
    /// Overall decision.
    pub decision: Decision,
    /// Every check evaluated, in check order.
    pub checks: Vec<Check>,
    /// Ids of checks that failed at deny severity.
    pub failed_deny_checks: Vec<String>,
    /// Ids of checks that failed at review severity.
    pub failed_review_checks: Vec<String>,
    /// Deduplicated human-readable reasons.
    pub reasons: Vec<String>,
    /// Aggregate counts.
    pub summary: GateSummary,
}

impl StageOutcome for GateDecision {
    fn decision(&self) -> Decision {
        self.decision
    }
    fn reasons(&self) -> &[String] {
        &self.reasons
    }
    fn violations(&self) -> &[Violation] {
        &[]
    }
}

fn check(id: &str, passed: bool, severity: Severity, details: Option<String>) -> Check {
    Check { id: id.to_string(), passed, severity, details }
}

/// Run the nine plan-gate checks against `plan` under `catalog`. `approved`
/// reflects whether the approval workflow instance for this plan currently
/// has `status = approved` (tracked separately by `approval`, §4.9); plan
/// synthesis itself never sets this (§4.6).
#[must_use]
pub fn evaluate(plan: &ChangePlan, catalog: &CatalogPolicy, approved: bool) -> GateDecision {
    let mut checks = Vec::new();

    checks.push(check(
        "plan-shape",
        !plan.plan_id.is_empty() && !plan.intent_id.is_empty() && !plan.actions.is_empty(),
        Severity::Deny,
        None,
    ));

    let deny_hit = plan.actions.iter().find(|a| catalog.deny_action_types.contains(&a.action_type));
    checks.push(check(
        "deny-action-types",
        deny_hit.is_none(),
        Severity::Deny,
        deny_hit.map(|a| format!("action type {:?} is in deny_action_types", a.action_type)),
    ));

    let review_hit =
        plan.actions.iter().any(|a| catalog.review_action_types.contains(&a.action_type));
    checks.push(check(
        "review-action-types",
        !review_hit || approved,
        Severity::Review,
        review_hit.then(|| "review-listed action type present without approval".to_string()),
    ));

    let risk_requires_approval = catalog.require_approval_for_risk_levels.contains(&plan.risk_level);
    checks.push(check(
        "risk-approval",
        !risk_requires_approval || approved,
        Severity::Review,
        risk_requires_approval.then(|| format!("risk level {} requires approval", plan.risk_level)),
    ));

    let over_action_count = plan.actions.len() > catalog.max_actions_without_approval;
    checks.push(check(
        "action-count-approval",
        !over_action_count || approved,
        Severity::Review,
        over_action_count.then(|| {
            format!(
                "{} actions exceeds max_actions_without_approval {}",
                plan.actions.len(),
                catalog.max_actions_without_approval
            )
        }),
    ));

    let needs_dual = plan.actions.iter().any(|a| a.requires_privilege_escalation)
        && catalog.require_dual_approval_for_privilege_escalation;
    checks.push(check(
        "privilege-escalation-dual-approval",
        !needs_dual || plan.approval.dual_approved,
        Severity::Review,
        needs_dual.then(|| "privilege escalation requires dual approval".to_string()),
    ));

    let needs_masking =
        plan.actions.iter().any(|a| a.touches_sensitive_data) && catalog.require_masking_when_sensitive_data;
    checks.push(check(
        "sensitive-data-masking",
        !needs_masking || plan.security.masking_applied,
        Severity::Deny,
        needs_masking.then(|| "sensitive data present without masking".to_string()),
    ));

    checks.push(check(
        "plaintext-secrets",
        !(catalog.forbid_plaintext_secrets && plan.security.plaintext_secrets_in_payload),
        Severity::Deny,
        (catalog.forbid_plaintext_secrets && plan.security.plaintext_secrets_in_payload)
            .then(|| "plaintext secrets present in plan payload".to_string()),
    ));

    let needs_backup = plan.actions.iter().any(|a| a.irreversible)
        && catalog.require_backup_for_irreversible_actions;
    checks.push(check(
        "irreversible-backup",
        !needs_backup || plan.security.backup_reference.as_deref().is_some_and(|r| !r.is_empty()),
        Severity::Deny,
        needs_backup.then(|| "irreversible action requires a backup reference".to_string()),
    ));

    let failed_deny_checks: Vec<String> = checks
        .iter()
        .filter(|c| !c.passed && c.severity == Severity::Deny)
        .map(|c| c.id.clone())
        .collect();
    let failed_review_checks: Vec<String> = checks
        .iter()
        .filter(|c| !c.passed && c.severity == Severity::Review)
        .map(|c| c.id.clone())
        .collect();

    let decision = if !failed_deny_checks.is_empty() {
        Decision::Deny
    } else if !failed_review_checks.is_empty() {
        Decision::ReviewRequired
    } else {
        Decision::Allow
    };

    let reasons = dedup_reasons(checks.iter().filter_map(|c| c.details.clone()).collect());
    let failed_total = failed_deny_checks.len() + failed_review_checks.len();

    GateDecision {
        decision,
        summary: GateSummary {
            check_total: checks.len(),
            failed_total,
            failed_deny_total: failed_deny_checks.len(),
            failed_review_total: failed_review_checks.len(),
            action_count: plan.actions.len(),
            risk_level: plan.risk_level,
        },
        failed_deny_checks,
        failed_review_checks,
        reasons,
        checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_core::ExecutionMode;
    use plan_synth::{Action, PlanApproval, PlanAuthorization, PlanSecurity, RollbackPlan};

    fn base_plan() -> ChangePlan {
        ChangePlan {
            plan_id: "plan-1".into(),
            intent_id: "intent-1".into(),
            risk_level: gov_core::RiskLevel::Low,
            execution_mode: ExecutionMode::Suggestion,
            scope: "orders/order-list".into(),
            actions: vec![Action {
                action_id: "1".into(),
                action_type: ActionType::UiFormFieldAdjust,
                touches_sensitive_data: false,
                requires_privilege_escalation: false,
                irreversible: false,
            }],
            impact_assessment: "low risk".into(),
            verification_checks: vec!["intent-to-plan consistency review".into()],
            rollback_plan: RollbackPlan {
                kind: "config-revert".into(),
                reference: None,
                note: "revert".into(),
            },
            approval: PlanApproval {
                status: ApprovalRequirement::NotRequired,
                dual_approved: false,
                approvers: vec![],
            },
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

    #[test]
    fn clean_low_risk_plan_is_allowed() {
        let decision = evaluate(&base_plan(), &CatalogPolicy::default(), false);
        assert_eq!(decision.decision, Decision::Allow);
    }

    #[test]
    fn deny_action_type_denies() {
        let mut plan = base_plan();
        plan.actions[0].action_type = ActionType::BulkDeleteWithoutFilter;
        plan.risk_level = gov_core::RiskLevel::High;
        let decision = evaluate(&plan, &CatalogPolicy::default(), false);
        assert_eq!(decision.decision, Decision::Deny);
        assert!(decision.failed_deny_checks.contains(&"deny-action-types".to_string()));
    }

    #[test]
    fn masking_check_is_deny_severity() {
        let mut plan = base_plan();
        plan.actions[0].touches_sensitive_data = true;
        let denied = evaluate(&plan, &CatalogPolicy::default(), false);
        assert_eq!(denied.decision, Decision::Deny);
        plan.security.masking_applied = true;
        let allowed = evaluate(&plan, &CatalogPolicy::default(), false);
        assert_eq!(allowed.decision, Decision::Allow);
    }
}
