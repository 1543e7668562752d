//! Plain Markdown renderings of the change plan, plan-gate decision, and
//! work order, in the same short-template style as
//! [`intent::render_explain_markdown`]. Markdown rendering logic itself is
//! out of scope beyond these plain templates (SPEC_FULL §6 Non-goals).

use gov_core::StageOutcome;
use plan_gate::GateDecision;
use plan_synth::ChangePlan;
use work_order::WorkOrder;

/// Render a [`ChangePlan`] as a short Markdown document.
#[must_use]
pub fn render_plan(plan: &ChangePlan) -> String {
    let mut md = format!(
        "# Change Plan `{}`\n\n- Intent: `{}`\n- Scope: `{}`\n- Risk level: `{}`\n- Execution mode: `{}`\n\n## Impact\n\n{}\n\n## Actions\n\n",
        plan.plan_id, plan.intent_id, plan.scope, plan.risk_level, plan.execution_mode, plan.impact_assessment,
    );
    for action in &plan.actions {
        md.push_str(&format!("- `{}` ({:?})\n", action.action_id, action.action_type));
    }
    md.push_str("\n## Verification Checks\n\n");
    for check in &plan.verification_checks {
        md.push_str(&format!("- {check}\n"));
    }
    md.push_str("\n## Rollback\n\n");
    md.push_str(&format!("- Type: `{}`\n- Note: {}\n", plan.rollback_plan.kind, plan.rollback_plan.note));
    if let Some(reference) = &plan.rollback_plan.reference {
        md.push_str(&format!("- Reference: `{reference}`\n"));
    }
    md
}

/// Render a [`GateDecision`] as a short Markdown document.
#[must_use]
pub fn render_gate(gate: &GateDecision) -> String {
    let mut md = format!("# Plan Gate Decision: `{}`\n\n## Checks\n\n", gate.decision());
    for check in &gate.checks {
        let mark = if check.passed { "x" } else { " " };
        md.push_str(&format!("- [{mark}] {} ({:?})\n", check.id, check.severity));
    }
    if !gate.reasons.is_empty() {
        md.push_str("\n## Reasons\n\n");
        for reason in &gate.reasons {
            md.push_str(&format!("- {reason}\n"));
        }
    }
    md
}

/// Render a [`WorkOrder`] as a short Markdown document.
#[must_use]
pub fn render_work_order(wo: &WorkOrder) -> String {
    let mut md = format!(
        "# Work Order `{}`\n\n- Session: `{}`\n- Scope: `{}`\n- Status: `{:?}`\n- Priority: `{:?}`\n\n## Next Actions\n\n",
        wo.work_order_id, wo.session_id, wo.scope, wo.status, wo.priority,
    );
    for action in &wo.next_actions {
        md.push_str(&format!("- {action}\n"));
    }
    md
}
