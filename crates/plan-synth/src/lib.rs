//! Plan Synthesizer (C5): infers action types from the goal and context,
//! computes risk, and builds the verification/rollback/approval/
//! authorization blocks of a [`ChangePlan`] (§4.5).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use gov_core::{ActionType, ExecutionMode, RiskLevel};
use intent::ChangeIntent;
use serde::{Deserialize, Serialize};

const HIGH_RISK_GOAL_KEYWORDS: &[&str] = &[
    "delete", "drop", "permission", "privilege", "payment", "credential", "secret", "token",
];
const MEDIUM_RISK_GOAL_KEYWORDS: &[&str] =
    &["approval", "workflow", "inventory", "customer", "order", "pricing", "refund"];

const ACTION_TRIGGERS: &[(ActionType, &[&str])] = &[
    (ActionType::CredentialExport, &["export credential", "export secret", "dump credential", "credential export"]),
    (ActionType::PermissionGrantSuperAdmin, &["super admin", "grant admin", "make admin", "permission grant"]),
    (ActionType::BulkDeleteWithoutFilter, &["bulk delete", "delete all", "drop permission table", "delete without filter"]),
    (ActionType::WorkflowApprovalChainChange, &["approval chain", "approval workflow"]),
    (ActionType::PaymentRuleChange, &["payment rule", "payment setting"]),
    (ActionType::InventoryAdjustmentBulk, &["bulk inventory", "inventory adjustment"]),
    (ActionType::UpdateRuleThreshold, &["threshold", "rule value"]),
    (ActionType::UiFormFieldAdjust, &["field layout", "form field", "ui field", "field adjust"]),
];

/// One action in a change plan (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// `action-…` typed id.
    pub action_id: String,
    /// Closed action type.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Whether this action touches sensitive data.
    pub touches_sensitive_data: bool,
    /// Whether this action requires privilege escalation.
    pub requires_privilege_escalation: bool,
    /// Whether this action is irreversible.
    pub irreversible: bool,
}

/// `rollback_plan{type, reference?, note}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackPlan {
    /// `"backup-restore"` or `"config-revert"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Generated reference for a backup-restore rollback.
    #[serde(default)]
    pub reference: Option<String>,
    /// Human-readable note.
    pub note: String,
}

/// `approval.status ∈ {pending, not-required}` on the plan itself, distinct
/// from the [`ApprovalStatus`](gov_core::ApprovalStatus) FSM state used once
/// a workflow instance exists (§4.5 vs §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalRequirement {
    /// No approval gate applies to this plan.
    NotRequired,
    /// The plan requires an approval before it may be applied.
    Pending,
}

/// `approval{status, dual_approved, approvers[]}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanApproval {
    /// Whether an approval gate applies.
    pub status: ApprovalRequirement,
    /// Whether dual approval has been recorded (set later by the approval
    /// workflow; always `false` at synthesis time).
    pub dual_approved: bool,
    /// Approver actor ids (empty at synthesis time).
    pub approvers: Vec<String>,
}

/// `authorization{password_required, password_scope[], password_hash_env,
/// password_ttl_seconds, reason_codes[]}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanAuthorization {
    /// Whether a password is required to execute the plan.
    pub password_required: bool,
    /// Scopes a provided password grants; `["execute"]` when required.
    pub password_scope: Vec<String>,
    /// Name of the environment variable holding the expected password hash.
    pub password_hash_env: String,
    /// How long a verified password remains valid.
    pub password_ttl_seconds: u64,
    /// Reason codes recorded for why authorization is required.
    pub reason_codes: Vec<String>,
}

/// `security{masking_applied, plaintext_secrets_in_payload, backup_reference?}` (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSecurity {
    /// Whether sensitive-data masking has been applied.
    pub masking_applied: bool,
    /// Whether plaintext secrets are present in the plan payload.
    pub plaintext_secrets_in_payload: bool,
    /// Reference to a backup snapshot, required for irreversible actions.
    #[serde(default)]
    pub backup_reference: Option<String>,
}

/// The change plan (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePlan {
    /// `plan-…` typed id.
    pub plan_id: String,
    /// The intent this plan was synthesized from.
    pub intent_id: String,
    /// Computed risk level.
    pub risk_level: RiskLevel,
    /// Requested execution mode.
    pub execution_mode: ExecutionMode,
    /// Free-form scope label, carried from the intent's context ref.
    pub scope: String,
    /// Inferred actions.
    pub actions: Vec<Action>,
    /// Free-form impact narrative.
    pub impact_assessment: String,
    /// Deduplicated verification checks.
    pub verification_checks: Vec<String>,
    /// Rollback plan.
    pub rollback_plan: RollbackPlan,
    /// Approval requirement block.
    pub approval: PlanApproval,
    /// Authorization block.
    pub authorization: PlanAuthorization,
    /// Security block (masking/secrets/backup), defaulted until the adapter
    /// or a caller sets it explicitly.
    pub security: PlanSecurity,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

fn infer_actions(goal: &str, module: &str) -> Vec<ActionType> {
    let haystack = format!("{goal} {module}").to_ascii_lowercase();
    let mut found: Vec<ActionType> = ACTION_TRIGGERS
        .iter()
        .filter(|(_, kws)| kws.iter().any(|kw| haystack.contains(kw)))
        .map(|(t, _)| *t)
        .collect();
    if found.is_empty() {
        found.push(ActionType::AnalysisOnly);
    }
    found
}

fn risk_level(actions: &[ActionType], goal: &str, module: &str) -> RiskLevel {
    let haystack = format!("{goal} {module}").to_ascii_lowercase();
    let high_actions = [
        ActionType::CredentialExport,
        ActionType::PermissionGrantSuperAdmin,
        ActionType::BulkDeleteWithoutFilter,
    ];
    let medium_actions = [
        ActionType::WorkflowApprovalChainChange,
        ActionType::PaymentRuleChange,
        ActionType::InventoryAdjustmentBulk,
    ];
    if actions.iter().any(|a| high_actions.contains(a))
        || HIGH_RISK_GOAL_KEYWORDS.iter().any(|k| haystack.contains(k))
    {
        RiskLevel::High
    } else if actions.iter().any(|a| medium_actions.contains(a))
        || MEDIUM_RISK_GOAL_KEYWORDS.iter().any(|k| haystack.contains(k))
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn verification_checks_for(actions: &[Action]) -> Vec<String> {
    let mut checks = Vec::new();
    for a in actions {
        let check = format!("verify-{}", action_type_key(a.action_type));
        if !checks.contains(&check) {
            checks.push(check);
        }
    }
    checks.push("intent-to-plan consistency review".to_string());
    checks
}

fn action_type_key(t: ActionType) -> &'static str {
    match t {
        ActionType::AnalysisOnly => "analysis_only",
        ActionType::WorkflowApprovalChainChange => "workflow_approval_chain_change",
        ActionType::UpdateRuleThreshold => "update_rule_threshold",
        ActionType::UiFormFieldAdjust => "ui_form_field_adjust",
        ActionType::InventoryAdjustmentBulk => "inventory_adjustment_bulk",
        ActionType::PaymentRuleChange => "payment_rule_change",
        ActionType::BulkDeleteWithoutFilter => "bulk_delete_without_filter",
        ActionType::PermissionGrantSuperAdmin => "permission_grant_super_admin",
        ActionType::CredentialExport => "credential_export",
    }
}

fn rollback_plan_for(actions: &[Action], plan_id: &str) -> RollbackPlan {
    if actions.iter().any(|a| a.irreversible) {
        RollbackPlan {
            kind: "backup-restore".to_string(),
            reference: Some(format!("backup-{plan_id}")),
            note: "mandatory backup required before apply".to_string(),
        }
    } else {
        RollbackPlan {
            kind: "config-revert".to_string(),
            reference: None,
            note: "revert to previous-config-snapshot".to_string(),
        }
    }
}

/// Synthesize a change plan from `intent` and the execution mode the caller
/// requested (§4.5). `plan_id`/`created_at` are injected for determinism.
#[must_use]
pub fn synthesize(
    intent: &ChangeIntent,
    execution_mode: ExecutionMode,
    plan_id: String,
    created_at: String,
) -> ChangePlan {
    let action_types = infer_actions(&intent.business_goal, &intent.context_ref.module);
    let actions: Vec<Action> = action_types
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let (touches_sensitive_data, requires_privilege_escalation, irreversible) = t.defaults();
            Action {
                action_id: format!("action-{plan_id}-{i}"),
                action_type: t,
                touches_sensitive_data,
                requires_privilege_escalation,
                irreversible,
            }
        })
        .collect();

    let risk_level = risk_level(
        &actions.iter().map(|a| a.action_type).collect::<Vec<_>>(),
        &intent.business_goal,
        &intent.context_ref.module,
    );

    let any_mutating = actions.iter().any(|a| a.action_type != ActionType::AnalysisOnly);
    let any_privilege_escalation = actions.iter().any(|a| a.requires_privilege_escalation);

    let approval_status = if risk_level == RiskLevel::High
        || (risk_level == RiskLevel::Medium && execution_mode == ExecutionMode::Apply)
        || any_privilege_escalation
    {
        ApprovalRequirement::Pending
    } else {
        ApprovalRequirement::NotRequired
    };

    let password_required = any_mutating && execution_mode == ExecutionMode::Apply;
    let mut reason_codes = Vec::new();
    if password_required {
        reason_codes.push("mutating-action-apply-mode".to_string());
    }
    if any_privilege_escalation {
        reason_codes.push("privilege-escalation-detected".to_string());
    }
    if risk_level == RiskLevel::High {
        reason_codes.push("high-risk-plan".to_string());
    }

    let verification_checks = verification_checks_for(&actions);
    let rollback_plan = rollback_plan_for(&actions, &plan_id);

    ChangePlan {
        scope: format!("{}/{}", intent.context_ref.module, intent.context_ref.page),
        impact_assessment: format!(
            "{} action(s) inferred at {} risk for {}",
            actions.len(),
            risk_level,
            intent.context_ref.module
        ),
        actions,
        risk_level,
        execution_mode,
        verification_checks,
        rollback_plan,
        approval: PlanApproval { status: approval_status, dual_approved: false, approvers: Vec::new() },
        authorization: PlanAuthorization {
            password_required,
            password_scope: if password_required { vec!["execute".to_string()] } else { Vec::new() },
            password_hash_env: "GOV_APPROVAL_PASSWORD_HASH".to_string(),
            password_ttl_seconds: 900,
            reason_codes,
        },
        security: PlanSecurity::default(),
        plan_id,
        intent_id: intent.intent_id.clone(),
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_core::{Priority, RiskLevel as RL};
    use intent::{ChangeIntent, ContextRef, ContextSummary, IntentMetadata};

    fn sample_intent(goal: &str) -> ChangeIntent {
        ChangeIntent {
            intent_id: "intent-1".into(),
            session_id: "s1".into(),
            user_id: "u1".into(),
            context_ref: ContextRef {
                product: "moqui".into(),
                module: "orders".into(),
                page: "order-list".into(),
                entity: None,
                scene_id: None,
                workflow_node: None,
                screen: None,
                component: None,
            },
            business_goal: goal.to_string(),
            constraints: vec![],
            priority: Priority::Medium,
            created_at: "t".into(),
            metadata: IntentMetadata {
                mode: "read-only".into(),
                risk_hint: RL::Low,
                context_summary: ContextSummary::default(),
                contract_validation_issue_count: 0,
            },
        }
    }

    #[test]
    fn no_keyword_match_falls_back_to_analysis_only() {
        let intent = sample_intent("Please review the page");
        let plan = synthesize(&intent, ExecutionMode::Suggestion, "plan-1".into(), "t".into());
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].action_type, ActionType::AnalysisOnly);
        assert_eq!(plan.risk_level, RiskLevel::Low);
    }

    #[test]
    fn bulk_delete_inference_is_high_risk() {
        let intent = sample_intent("drop permission table for cleanup");
        let plan = synthesize(&intent, ExecutionMode::Apply, "plan-1".into(), "t".into());
        assert_eq!(plan.risk_level, RiskLevel::High);
        assert!(plan.actions.iter().any(|a| a.action_type == ActionType::BulkDeleteWithoutFilter));
        assert_eq!(plan.approval.status, ApprovalRequirement::Pending);
    }

    #[test]
    fn password_required_only_for_mutating_apply() {
        let intent = sample_intent("adjust form field layout");
        let suggestion = synthesize(&intent, ExecutionMode::Suggestion, "plan-1".into(), "t".into());
        assert!(!suggestion.authorization.password_required);
        let apply = synthesize(&intent, ExecutionMode::Apply, "plan-2".into(), "t".into());
        assert!(apply.authorization.password_required);
    }

    #[test]
    fn irreversible_action_gets_backup_restore_rollback() {
        let intent = sample_intent("bulk inventory adjustment needed");
        let plan = synthesize(&intent, ExecutionMode::Apply, "plan-1".into(), "t".into());
        assert_eq!(plan.rollback_plan.kind, "backup-restore");
    }
}
