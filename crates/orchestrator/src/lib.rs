//! Loop Orchestrator (§4.12): drives one session through the full
//! governance pipeline — context bridge, dialogue governor, intent
//! builder, plan synthesizer, plan gate, runtime policy, authorization
//! tier, approval workflow, adapter, work order, signals — persisting
//! every stage's artifact before the next stage reads it, so a re-run with
//! the same `session_id` resumes rather than repeats.
//!
//! Decision logic lives entirely in the stage crates; this crate only
//! sequences them and writes their artifacts to disk.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod errors;
mod io;
mod markdown;
mod paths;

pub use paths::SessionPaths;

use adapter::{ApplyOptions, ErpClient, ExecutionResult, SimulatedErpClient};
use approval::{Actor, ApprovalState};
use authz_tier::{AuthorizationTierDecision, TierContext};
use context_bridge::{bridge, Dialect, PageContext};
use dialogue::{govern, ContextHint, DialogueDecision, DialogueOutcome};
use event_log::JsonlStream;
use gov_core::{
    ids, ApprovalStatus, BusinessMode, Decision, DialogueProfile, ExecutionMode, GovError, Priority,
    RiskLevel, RuntimeEnvironment, RuntimeMode, StageOutcome, UiMode, WorkOrderStatus,
};
use intent::ChangeIntent;
use plan_gate::GateDecision;
use plan_synth::ChangePlan;
use policy_engine::Policy;
use runtime_policy::RuntimeDecision;
use serde::Serialize;
use serde_json::Value;
use signals::{Signal, SignalStage};
use std::path::PathBuf;
use tracing::{info, info_span, instrument};
use work_order::{ExecutionSummary, WorkOrder, WorkOrderInputs};

/// Map a closed [`RuntimeMode`] to the policy-file key used by
/// `runtime_policy::evaluate`'s diagnostics (mirrors
/// `policy_engine::runtime::mode_key`, private to that crate).
fn mode_key(mode: RuntimeMode) -> &'static str {
    match mode {
        RuntimeMode::UserAssist => "user-assist",
        RuntimeMode::OpsFix => "ops-fix",
        RuntimeMode::FeatureDev => "feature-dev",
    }
}

/// Map a closed [`UiMode`] to its policy-file key.
fn ui_mode_key(mode: UiMode) -> &'static str {
    match mode {
        UiMode::UserApp => "user-app",
        UiMode::OpsConsole => "ops-console",
        UiMode::DevWorkbench => "dev-workbench",
    }
}

/// Every `gov run` input, already parsed from CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Session identifier; also the artifact subdirectory name.
    pub session_id: String,
    /// Root directory under which `<session_id>/` is created.
    pub out_dir: PathBuf,
    /// The raw, provider-shaped page-context payload.
    pub raw_context: Value,
    /// Provider dialect the raw payload was produced by.
    pub dialect: Dialect,
    /// Whether a contract violation should be a hard error.
    pub strict_contract: bool,
    /// The user proposing this change.
    pub user_id: String,
    /// The business goal, pre-dialogue-screening.
    pub goal: String,
    /// Dialogue profile to resolve (business-user / system-maintainer).
    pub dialogue_profile: DialogueProfile,
    /// Active runtime mode.
    pub runtime_mode: RuntimeMode,
    /// Active runtime environment.
    pub runtime_environment: RuntimeEnvironment,
    /// Active UI surface, if the caller reports one.
    pub ui_mode: Option<UiMode>,
    /// Requested execution mode (suggestion vs apply).
    pub execution_mode: ExecutionMode,
    /// Fast-path: auto-submit-and-approve when the plan is low-risk.
    pub auto_approve_low_risk: bool,
    /// Fast-path: auto-execute once auto-approved, subject to live-apply
    /// and dry-run-first constraints.
    pub auto_execute_low_risk: bool,
    /// Actually invoke the live adapter rather than simulate.
    pub live_apply: bool,
    /// Plaintext password for the approval execute guard, if any.
    pub auth_password: Option<String>,
    /// Map a dialogue deny to exit code 2 (otherwise only gate/runtime
    /// denial and execution blocks do).
    pub fail_on_dialogue_deny: bool,
}

/// The outcome of one full `gov run` pass, enough for the CLI to print a
/// one-line summary and compute the process exit code.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// The session this summary covers.
    pub session_id: String,
    /// The dialogue governor's decision.
    pub dialogue_decision: DialogueDecision,
    /// The plan gate's decision, if a plan reached the gate.
    pub gate_decision: Option<Decision>,
    /// The runtime policy evaluator's decision, if the gate allowed.
    pub runtime_decision: Option<Decision>,
    /// The authorization tier evaluator's decision, if runtime allowed.
    pub authorization_decision: Option<Decision>,
    /// The approval workflow's status after this run.
    pub approval_status: Option<ApprovalStatus>,
    /// The adapter's result, if an apply was attempted.
    pub execution_result: Option<ExecutionResult>,
    /// The work order's aggregate status.
    pub work_order_status: WorkOrderStatus,
    /// The work order's aggregate priority.
    pub work_order_priority: Priority,
    /// Process exit code per §4.12/§7's fail-fast cascade.
    pub exit_code: i32,
}

fn dialogue_business_decision(d: DialogueDecision) -> Decision {
    match d {
        DialogueDecision::Allow => Decision::Allow,
        DialogueDecision::Clarify => Decision::ReviewRequired,
        DialogueDecision::Deny => Decision::Deny,
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_stage_signal(
    global: &JsonlStream,
    per_session: &JsonlStream,
    session_id: &str,
    business_mode: BusinessMode,
    stage: SignalStage,
    decision: Decision,
    security_related: bool,
) -> Result<(), GovError> {
    let signal = Signal {
        stage,
        timestamp: ids::now_iso8601(),
        session_id: session_id.to_string(),
        business_mode,
        decision,
        security_related,
        matrix_pass: None,
        matrix_valid: None,
        matrix_regression_positive: None,
        matrix_stage_error: None,
        matrix_score: None,
    };
    signals::emit(global, per_session, ids::next_record_id(), ids::now_ms(), &signal).map_err(errors::event_log)
}

fn prior_dry_run_succeeded(ledger: &JsonlStream, plan_id: &str) -> Result<bool, GovError> {
    let rows: Vec<event_log::EventRecord<adapter::ExecutionRecord>> =
        ledger.read_all().map_err(errors::event_log)?;
    Ok(rows.into_iter().any(|r| {
        r.payload.plan_id == plan_id
            && r.payload.result == ExecutionResult::Success
            && r.payload.mode == adapter::ExecutionApplyMode::DryRun
    }))
}

/// Run one session through the full pipeline (§4.2–§4.11), persisting every
/// artifact under `<out_dir>/<session_id>/`. `client` is the adapter's
/// outward effect seam; pass [`SimulatedErpClient`] when no live system is
/// wired up.
#[instrument(skip(cfg, policy, client), fields(session_id = %cfg.session_id))]
pub fn run(cfg: &RunConfig, policy: &Policy, client: &dyn ErpClient) -> Result<RunSummary, GovError> {
    let paths = SessionPaths::new(&cfg.out_dir, &cfg.session_id);
    std::fs::create_dir_all(paths.dir())?;

    // C2: context bridge.
    let (page_context, bridge_report): (PageContext, _) = {
        let _span = info_span!("context_bridge").entered();
        bridge(&cfg.raw_context, cfg.dialect, &policy.context_contract, cfg.strict_contract)?
    };
    io::write_json(&paths.page_context(), &page_context)?;
    io::write_json(&paths.context_bridge(), &bridge_report)?;

    let business_mode = BusinessMode::from(cfg.runtime_mode);

    // C3: dialogue governor.
    let dialogue_policy = policy.resolve_dialogue_profile(cfg.dialogue_profile).map_err(errors::policy)?;
    let hint = ContextHint { module: Some(page_context.module.as_str()), page: Some(page_context.page.as_str()) };
    let dialogue_outcome: DialogueOutcome = govern(&cfg.goal, hint, &dialogue_policy);
    io::write_json(&paths.dialogue_governance(), &dialogue_outcome)?;
    info!(decision = ?dialogue_outcome.decision, "dialogue governor decided");

    let mut plan: Option<ChangePlan> = None;
    let mut gate: Option<GateDecision> = None;
    let mut runtime: Option<RuntimeDecision> = None;
    let mut authorization: Option<AuthorizationTierDecision> = None;
    let mut approval_state: Option<ApprovalState> = None;
    let mut execute_blocked = false;
    let mut adapter_record: Option<adapter::ExecutionRecord> = None;

    if dialogue_outcome.decision == DialogueDecision::Allow {
        // C4: intent builder. Reuse the intent id from a prior partial run
        // of this session so the artifact is stable across resumes.
        let existing_intent: Option<ChangeIntent> = io::read_json_if_exists(&paths.change_intent())?;
        let intent_id = existing_intent.map(|i| i.intent_id).unwrap_or_else(ids::new_intent_id);
        let intent: ChangeIntent = intent::build(
            &cfg.session_id,
            &cfg.user_id,
            &page_context,
            bridge_report.issues.len(),
            &cfg.goal,
            intent_id,
            ids::now_iso8601(),
        );
        io::write_json(&paths.change_intent(), &intent)?;
        io::write_text(&paths.page_explain(), &intent::render_explain_markdown(&intent))?;

        let audit_log = JsonlStream::open(paths.copilot_audit()).map_err(errors::event_log)?;
        if audit_log.is_empty().map_err(errors::event_log)? {
            intent::append_audit_event(&audit_log, ids::next_record_id(), ids::now_ms(), &intent, &cfg.raw_context)
                .map_err(errors::event_log)?;
        }

        // C5: plan synthesizer. Same resume rule for the plan id.
        let existing_plan: Option<ChangePlan> = io::read_json_if_exists(&paths.change_plan())?;
        let plan_id = existing_plan.map(|p| p.plan_id).unwrap_or_else(ids::new_plan_id);
        let synthesized = plan_synth::synthesize(&intent, cfg.execution_mode, plan_id, ids::now_iso8601());
        io::write_json(&paths.change_plan(), &synthesized)?;
        io::write_text(&paths.change_plan_md(), &markdown::render_plan(&synthesized))?;

        // Resume: an approval workflow instance may already exist from a
        // prior, partially completed run of this same session.
        let existing_approval: Option<ApprovalState> = io::read_json_if_exists(&paths.approval_state())?;
        let approved_so_far = existing_approval.as_ref().is_some_and(|s| s.status == ApprovalStatus::Approved);

        // C6: plan gate.
        let gate_decision = plan_gate::evaluate(&synthesized, &policy.catalog, approved_so_far);
        io::write_json(&paths.plan_gate(), &gate_decision)?;
        io::write_text(&paths.plan_gate_md(), &markdown::render_gate(&gate_decision))?;
        info!(decision = ?gate_decision.decision(), "plan gate decided");

        if gate_decision.decision() != Decision::Deny {
            // C7: runtime policy.
            let mode_cfg = policy.runtime_mode(cfg.runtime_mode).map_err(errors::policy)?;
            let env_cfg = policy.runtime_environment(cfg.runtime_environment).map_err(errors::policy)?;
            let ui_mode_name = cfg.ui_mode.map(ui_mode_key);
            let runtime_decision = runtime_policy::evaluate(
                &synthesized,
                policy,
                mode_cfg,
                mode_key(cfg.runtime_mode),
                env_cfg,
                ui_mode_name,
                approved_so_far,
            );
            io::write_json(&paths.runtime_policy(), &runtime_decision)?;
            info!(decision = ?runtime_decision.decision(), "runtime policy decided");

            // C8: authorization tier.
            let tier_context = TierContext {
                execution_mode: synthesized.execution_mode,
                dialogue_profile: cfg.dialogue_profile,
                runtime_mode: cfg.runtime_mode,
                runtime_environment: cfg.runtime_environment,
                auto_execute_low_risk: cfg.auto_execute_low_risk,
                live_apply: cfg.live_apply,
            };
            let tier_decision = match policy.authorization_tier(cfg.dialogue_profile, cfg.runtime_environment) {
                Some(tier_cfg) => authz_tier::evaluate(tier_context, tier_cfg),
                None => {
                    return Err(GovError::Config(format!(
                        "no authorization tier configured for profile {} in environment {:?}",
                        cfg.dialogue_profile, cfg.runtime_environment
                    )))
                }
            };
            io::write_json(&paths.authorization_tier(), &tier_decision)?;
            info!(decision = ?tier_decision.decision(), "authorization tier decided");

            // C9: approval workflow.
            let mut state = match existing_approval {
                Some(s) => s,
                None => approval::init(&synthesized, ids::new_workflow_id(), None, None, false, &ids::now_iso8601())
                    .map_err(errors::approval)?,
            };
            let approval_log = JsonlStream::open(paths.approval_events()).map_err(errors::event_log)?;
            let system_actor = Actor { id: "system-auto-approve".to_string(), role: Some("system".to_string()) };

            let low_risk_auto_approve_eligible = cfg.auto_approve_low_risk
                && dialogue_outcome.decision == DialogueDecision::Allow
                && gate_decision.decision() == Decision::Allow
                && synthesized.risk_level == RiskLevel::Low
                && runtime_decision.decision() == Decision::Allow
                && runtime_decision.requirements.auto_execute_allowed
                && tier_decision.decision() == Decision::Allow
                && tier_decision.requirements.auto_execute_allowed;

            if low_risk_auto_approve_eligible && state.status == ApprovalStatus::Draft {
                approval::submit(
                    &mut state,
                    &approval_log,
                    ids::next_record_id(),
                    ids::now_ms(),
                    &ids::now_iso8601(),
                    &system_actor,
                    Some("auto-approve-low-risk".to_string()),
                )
                .map_err(errors::approval)?;
                approval::approve(
                    &mut state,
                    &approval_log,
                    ids::next_record_id(),
                    ids::now_ms(),
                    &ids::now_iso8601(),
                    &system_actor,
                    Some("auto-approve-low-risk".to_string()),
                )
                .map_err(errors::approval)?;
                info!("auto-approved low-risk plan");
            }

            let ledger = JsonlStream::open(paths.execution_ledger()).map_err(errors::event_log)?;
            let dry_run_done = prior_dry_run_succeeded(&ledger, &synthesized.plan_id)?;
            let auto_execute_eligible = low_risk_auto_approve_eligible
                && cfg.auto_execute_low_risk
                && (!cfg.live_apply
                    || (runtime_decision.requirements.allow_live_apply
                        && tier_decision.requirements.live_apply_allowed
                        && (!runtime_decision.requirements.require_dry_run_before_live_apply || dry_run_done)));

            let mut adapter_blocked = false;
            if auto_execute_eligible && state.status == ApprovalStatus::Approved {
                let outcome = approval::execute(
                    state,
                    &approval_log,
                    ids::next_record_id(),
                    ids::now_ms(),
                    &ids::now_iso8601(),
                    &system_actor,
                    cfg.auth_password.as_deref(),
                    None,
                    tier_decision.requirements.require_distinct_actor_roles,
                )
                .map_err(errors::approval)?;
                state = outcome.state;
                execute_blocked = outcome.blocked;

                if !execute_blocked {
                    // C10: adapter.
                    let opts = ApplyOptions { live_apply: cfg.live_apply, dry_run: !cfg.live_apply, allow_suggestion_apply: false };
                    let apply_outcome = adapter::apply_low_risk(
                        &synthesized,
                        &policy.catalog,
                        true,
                        client,
                        &ledger,
                        ids::next_record_id(),
                        ids::now_ms(),
                        &ids::now_iso8601(),
                        ids::new_execution_id(),
                        opts,
                    )
                    .map_err(errors::adapter)?;
                    io::write_json(&paths.adapter(), &apply_outcome.record)?;
                    info!(result = ?apply_outcome.record.result, "adapter apply attempted");

                    adapter_blocked = apply_outcome.blocked;
                    if apply_outcome.record.result == ExecutionResult::Success {
                        approval::verify(
                            &mut state,
                            &approval_log,
                            ids::next_record_id(),
                            ids::now_ms(),
                            &ids::now_iso8601(),
                            &system_actor,
                            None,
                        )
                        .map_err(errors::approval)?;
                    }
                    adapter_record = Some(apply_outcome.record);
                }
            }

            io::write_json(&paths.approval_state(), &state)?;
            approval_state = Some(state);
            plan = Some(synthesized);
            gate = Some(gate_decision);
            runtime = Some(runtime_decision);
            authorization = Some(tier_decision);

            if adapter_blocked {
                execute_blocked = true;
            }
        } else {
            gate = Some(gate_decision);
            plan = Some(synthesized);
        }
    }

    // C13: signals (one pass, guarded against duplicating on resume).
    let global_signals =
        JsonlStream::open(cfg.out_dir.join("interactive-signals.jsonl")).map_err(errors::event_log)?;
    let per_session_signals = JsonlStream::open(paths.signals()).map_err(errors::event_log)?;
    if per_session_signals.is_empty().map_err(errors::event_log)? {
        let security_related = plan.as_ref().is_some_and(|p| {
            p.security.plaintext_secrets_in_payload
                || p.actions.iter().any(|a| a.touches_sensitive_data || a.requires_privilege_escalation)
        });
        emit_stage_signal(
            &global_signals,
            &per_session_signals,
            &cfg.session_id,
            business_mode,
            SignalStage::DialogueAuthorization,
            dialogue_business_decision(dialogue_outcome.decision),
            security_related,
        )?;
        if let Some(r) = &runtime {
            emit_stage_signal(
                &global_signals,
                &per_session_signals,
                &cfg.session_id,
                business_mode,
                SignalStage::Runtime,
                r.decision(),
                security_related,
            )?;
        }
        if let Some(t) = &authorization {
            emit_stage_signal(
                &global_signals,
                &per_session_signals,
                &cfg.session_id,
                business_mode,
                SignalStage::AuthorizationTier,
                t.decision(),
                security_related,
            )?;
        }
    }

    // C11: work order.
    let execution = match &adapter_record {
        Some(rec) => ExecutionSummary { attempted: true, blocked: execute_blocked, result: Some(rec.result) },
        None => ExecutionSummary::default(),
    };
    let work_order_inputs = WorkOrderInputs {
        dialogue: &dialogue_outcome,
        gate: gate.as_ref(),
        runtime: runtime.as_ref(),
        authorization: authorization.as_ref(),
        risk_level: plan.as_ref().map(|p| p.risk_level),
        execution,
    };
    let scope = plan
        .as_ref()
        .map(|p| p.scope.clone())
        .unwrap_or_else(|| format!("{}/{}", page_context.module, page_context.page));
    let existing_work_order: Option<WorkOrder> = io::read_json_if_exists(&paths.work_order())?;
    let work_order_id = existing_work_order.map(|w| w.work_order_id).unwrap_or_else(ids::new_work_order_id);
    let work_order: WorkOrder = work_order::build(
        work_order_id,
        cfg.session_id.clone(),
        scope,
        ids::now_iso8601(),
        work_order_inputs,
    );
    io::write_json(&paths.work_order(), &work_order)?;
    io::write_text(&paths.work_order_md(), &markdown::render_work_order(&work_order))?;

    let mut exit_code = 0;
    if cfg.fail_on_dialogue_deny && dialogue_outcome.decision == DialogueDecision::Deny {
        exit_code = 2;
    }
    if gate.as_ref().is_some_and(|g| g.decision() == Decision::Deny) {
        exit_code = 2;
    }
    if runtime.as_ref().is_some_and(|r| r.decision() != Decision::Allow) {
        exit_code = 2;
    }
    if execute_blocked {
        exit_code = 2;
    }
    if adapter_record
        .as_ref()
        .is_some_and(|r| r.result == ExecutionResult::Failed || r.result == ExecutionResult::Skipped)
    {
        exit_code = 2;
    }

    let summary = RunSummary {
        session_id: cfg.session_id.clone(),
        dialogue_decision: dialogue_outcome.decision,
        gate_decision: gate.as_ref().map(StageOutcome::decision),
        runtime_decision: runtime.as_ref().map(StageOutcome::decision),
        authorization_decision: authorization.as_ref().map(StageOutcome::decision),
        approval_status: approval_state.as_ref().map(|s| s.status),
        execution_result: adapter_record.as_ref().map(|r| r.result),
        work_order_status: work_order.status,
        work_order_priority: work_order.priority,
        exit_code,
    };
    io::write_json(&paths.summary(), &summary)?;

    Ok(summary)
}

/// Build the default adapter client (local simulation; no live system).
#[must_use]
pub fn default_client() -> SimulatedErpClient {
    SimulatedErpClient
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_cfg(goal: &str) -> RunConfig {
        RunConfig {
            session_id: "s1".to_string(),
            out_dir: std::env::temp_dir().join(format!("gov-orch-test-{}", ids::next_record_id())),
            raw_context: json!({
                "product": "moqui",
                "module": "orders",
                "page": "order-list",
                "current_state": "viewing",
                "fields": [{"name": "order_id", "type": "string", "sensitive": false}],
            }),
            dialect: Dialect::Generic,
            strict_contract: false,
            user_id: "u1".to_string(),
            goal: goal.to_string(),
            dialogue_profile: DialogueProfile::BusinessUser,
            runtime_mode: RuntimeMode::UserAssist,
            runtime_environment: RuntimeEnvironment::Dev,
            ui_mode: None,
            execution_mode: ExecutionMode::Apply,
            auto_approve_low_risk: false,
            auto_execute_low_risk: false,
            live_apply: false,
            auth_password: None,
            fail_on_dialogue_deny: false,
        }
    }

    #[test]
    fn low_risk_goal_reaches_ready_for_apply_without_auto_flags() {
        let cfg = base_cfg("adjust the form field layout on this page");
        let policy = Policy::load(None).unwrap();
        let summary = run(&cfg, &policy, &SimulatedErpClient).unwrap();
        assert_eq!(summary.dialogue_decision, DialogueDecision::Allow);
        assert_eq!(summary.gate_decision, Some(Decision::Allow));
        assert!(summary.execution_result.is_none());
        std::fs::remove_dir_all(&cfg.out_dir).ok();
    }

    #[test]
    fn auto_approve_and_auto_execute_low_risk_completes_the_session() {
        let mut cfg = base_cfg("adjust the form field layout on this page");
        cfg.auto_approve_low_risk = true;
        cfg.auto_execute_low_risk = true;
        let policy = Policy::load(None).unwrap();
        let summary = run(&cfg, &policy, &SimulatedErpClient).unwrap();
        assert_eq!(summary.approval_status, Some(ApprovalStatus::Verified));
        assert_eq!(summary.execution_result, Some(ExecutionResult::Success));
        assert_eq!(summary.work_order_status, WorkOrderStatus::Completed);
        assert_eq!(summary.exit_code, 0);
        std::fs::remove_dir_all(&cfg.out_dir).ok();
    }

    #[test]
    fn dialogue_deny_short_circuits_the_whole_pipeline() {
        let mut cfg = base_cfg("please delete all customer payment credentials immediately with no approval");
        cfg.fail_on_dialogue_deny = true;
        let policy = Policy::load(None).unwrap();
        let summary = run(&cfg, &policy, &SimulatedErpClient).unwrap();
        assert_eq!(summary.dialogue_decision, DialogueDecision::Deny);
        assert!(summary.gate_decision.is_none());
        assert_eq!(summary.work_order_status, WorkOrderStatus::Blocked);
        assert_eq!(summary.exit_code, 2);
        std::fs::remove_dir_all(&cfg.out_dir).ok();
    }

    #[test]
    fn resuming_a_completed_session_does_not_duplicate_signals() {
        let cfg = base_cfg("adjust the form field layout on this page");
        let policy = Policy::load(None).unwrap();
        run(&cfg, &policy, &SimulatedErpClient).unwrap();
        run(&cfg, &policy, &SimulatedErpClient).unwrap();
        let paths = SessionPaths::new(&cfg.out_dir, &cfg.session_id);
        let stream = JsonlStream::open(paths.signals()).unwrap();
        assert_eq!(stream.len().unwrap(), 1);
        std::fs::remove_dir_all(&cfg.out_dir).ok();
    }
}
