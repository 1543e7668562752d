//! Work-Order Builder (C11): deterministic aggregation of every stage's
//! decision into `{status, priority, next_actions}` (§4.11).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use adapter::ExecutionResult;
use authz_tier::AuthorizationTierDecision;
use dialogue::{DialogueDecision, DialogueOutcome};
use gov_core::{Decision, Priority, RiskLevel, StageOutcome, WorkOrderStatus};
use plan_gate::GateDecision;
use runtime_policy::RuntimeDecision;
use serde::{Deserialize, Serialize};

/// Whether, and how, a live execution attempt was made for this session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionSummary {
    /// Whether `adapter::apply`/`apply_low_risk` was invoked at all.
    pub attempted: bool,
    /// Whether the attempt was refused by a gate/restriction.
    pub blocked: bool,
    /// The ledger result, if an attempt was made.
    pub result: Option<ExecutionResult>,
}

/// Every stage decision available for one session, in pipeline order. Later
/// stages are `None` when an earlier one short-circuited the pipeline (e.g.
/// a dialogue deny means no plan was ever synthesized).
#[derive(Debug, Clone, Copy)]
pub struct WorkOrderInputs<'a> {
    /// The dialogue governor's outcome (always present; the first stage).
    pub dialogue: &'a DialogueOutcome,
    /// The plan gate's decision, if a plan reached the gate.
    pub gate: Option<&'a GateDecision>,
    /// The runtime policy evaluator's decision, if the gate allowed.
    pub runtime: Option<&'a RuntimeDecision>,
    /// The authorization tier evaluator's decision, if runtime allowed.
    pub authorization: Option<&'a AuthorizationTierDecision>,
    /// The plan's risk level, if a plan was synthesized.
    pub risk_level: Option<RiskLevel>,
    /// Whether, and how, execution was attempted.
    pub execution: ExecutionSummary,
}

/// The work order (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    /// `wo-…` typed id.
    pub work_order_id: String,
    /// The session this work order summarizes.
    pub session_id: String,
    /// Free-form scope label, carried from the plan/intent when available.
    pub scope: String,
    /// Aggregate status.
    pub status: WorkOrderStatus,
    /// Aggregate priority.
    pub priority: Priority,
    /// Next actions, blocker-first, housekeeping-last.
    pub next_actions: Vec<String>,
    /// Creation timestamp.
    pub created_at: String,
}

fn any_deny(inputs: &WorkOrderInputs<'_>) -> bool {
    inputs.dialogue.decision == DialogueDecision::Deny
        || inputs.gate.is_some_and(|g| g.decision() == Decision::Deny)
        || inputs.runtime.is_some_and(|r| r.decision() == Decision::Deny)
        || inputs.authorization.is_some_and(|a| a.decision() == Decision::Deny)
}

fn any_review(inputs: &WorkOrderInputs<'_>) -> bool {
    inputs.dialogue.decision == DialogueDecision::Clarify
        || inputs.gate.is_some_and(|g| g.decision() == Decision::ReviewRequired)
        || inputs.runtime.is_some_and(|r| r.decision() == Decision::ReviewRequired)
        || inputs.authorization.is_some_and(|a| a.decision() == Decision::ReviewRequired)
}

fn status_for(inputs: &WorkOrderInputs<'_>) -> WorkOrderStatus {
    if any_deny(inputs) || (inputs.execution.attempted && inputs.execution.blocked) {
        return WorkOrderStatus::Blocked;
    }
    if inputs.execution.attempted && inputs.execution.result == Some(ExecutionResult::Success) {
        return WorkOrderStatus::Completed;
    }
    if any_review(inputs) {
        return WorkOrderStatus::PendingReview;
    }
    let gate_allows = inputs.gate.is_some_and(|g| g.decision() == Decision::Allow);
    let runtime_allows = inputs.runtime.is_some_and(|r| r.decision() == Decision::Allow);
    if gate_allows && runtime_allows {
        return WorkOrderStatus::ReadyForApply;
    }
    WorkOrderStatus::PendingReview
}

fn priority_for(inputs: &WorkOrderInputs<'_>) -> Priority {
    if any_deny(inputs) || inputs.risk_level == Some(RiskLevel::High) {
        return Priority::High;
    }
    if any_review(inputs) || inputs.risk_level == Some(RiskLevel::Medium) {
        return Priority::Medium;
    }
    Priority::Low
}

fn next_actions_for(inputs: &WorkOrderInputs<'_>, status: WorkOrderStatus) -> Vec<String> {
    let mut actions = Vec::new();

    if inputs.dialogue.decision == DialogueDecision::Deny {
        actions.push("Revise the business goal; the dialogue governor denied it".to_string());
    }
    if inputs.dialogue.decision == DialogueDecision::Clarify {
        actions.push("Answer the dialogue governor's clarification questions".to_string());
    }
    if let Some(gate) = inputs.gate {
        if gate.decision() == Decision::Deny {
            actions.push("Refactor plan actions to remove catalog-denied action types".to_string());
        } else if gate.decision() == Decision::ReviewRequired {
            actions.push("Obtain plan approval before proceeding".to_string());
        }
    }
    if let Some(runtime) = inputs.runtime {
        if runtime.decision() == Decision::Deny {
            actions.push("Adjust runtime_mode/runtime_environment/ui_mode to permit this plan".to_string());
        } else if runtime.decision() == Decision::ReviewRequired {
            actions.push("Complete the manual review required by the runtime environment".to_string());
        }
    }
    if let Some(tier) = inputs.authorization {
        if tier.decision() == Decision::Deny {
            actions.push("Request a higher authorization tier or change dialogue_profile/runtime_environment".to_string());
        } else if tier.decision() == Decision::ReviewRequired {
            actions.push("Complete the manual review required by the authorization tier".to_string());
        }
    }
    if inputs.execution.attempted && inputs.execution.blocked {
        actions.push("Resolve the execution blocker before retrying apply".to_string());
    }
    if inputs.execution.attempted && inputs.execution.result == Some(ExecutionResult::Failed) {
        actions.push("Investigate the live-apply failure and retry or roll back".to_string());
    }

    if actions.is_empty() {
        match status {
            WorkOrderStatus::ReadyForApply => actions.push("Proceed to apply the approved plan".to_string()),
            WorkOrderStatus::Completed => actions.push("Archive the approval workflow".to_string()),
            WorkOrderStatus::PendingReview => actions.push("Await the pending review/approval".to_string()),
            WorkOrderStatus::Blocked => actions.push("Review the blocking stage before retrying".to_string()),
        }
    }
    actions
}

/// Build the work order for one session from every stage's decision (§4.11).
#[must_use]
pub fn build(
    work_order_id: String,
    session_id: String,
    scope: String,
    created_at: String,
    inputs: WorkOrderInputs<'_>,
) -> WorkOrder {
    let status = status_for(&inputs);
    let priority = priority_for(&inputs);
    let next_actions = next_actions_for(&inputs, status);
    WorkOrder { work_order_id, session_id, scope, status, priority, next_actions, created_at }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue::DialogueOutcome;

    fn dialogue_allow() -> DialogueOutcome {
        DialogueOutcome {
            decision: DialogueDecision::Allow,
            reasons: vec![],
            deny_hits: vec![],
            clarify_hits: vec![],
            clarification_questions: vec![],
            response_rules: vec![],
        }
    }

    fn dialogue_deny() -> DialogueOutcome {
        DialogueOutcome { decision: DialogueDecision::Deny, ..dialogue_allow() }
    }

    #[test]
    fn dialogue_deny_short_circuits_to_blocked_high_priority() {
        let d = dialogue_deny();
        let inputs = WorkOrderInputs {
            dialogue: &d,
            gate: None,
            runtime: None,
            authorization: None,
            risk_level: None,
            execution: ExecutionSummary::default(),
        };
        let wo = build("wo-1".into(), "s1".into(), "orders".into(), "t".into(), inputs);
        assert_eq!(wo.status, WorkOrderStatus::Blocked);
        assert_eq!(wo.priority, Priority::High);
        assert!(wo.next_actions[0].contains("dialogue"));
    }

    #[test]
    fn completed_execution_marks_status_completed() {
        let d = dialogue_allow();
        let inputs = WorkOrderInputs {
            dialogue: &d,
            gate: None,
            runtime: None,
            authorization: None,
            risk_level: Some(RiskLevel::Low),
            execution: ExecutionSummary { attempted: true, blocked: false, result: Some(ExecutionResult::Success) },
        };
        let wo = build("wo-1".into(), "s1".into(), "orders".into(), "t".into(), inputs);
        assert_eq!(wo.status, WorkOrderStatus::Completed);
        assert_eq!(wo.priority, Priority::Low);
    }
}
