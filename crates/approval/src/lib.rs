//! Approval Workflow (C9): the `draft → submitted → {approved | rejected} →
//! executed → verified → archived` state machine, with `rejected → draft`
//! resubmission and a guarded `execute` transition (§4.9).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use event_log::{EventLogError, JsonlStream};
use gov_core::hash::{is_valid_sha256_hex, sha256_hex};
use gov_core::ApprovalStatus;
use plan_synth::ChangePlan;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the approval workflow. Guard failures on `execute` are
/// deliberately **not** represented here — they are a normal, recorded
/// outcome (`ExecuteOutcome::blocked`), not a Rust error (§4.9, §7).
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// `init` found an existing state for this plan and `force` was not set.
    #[error("approval state already exists for plan {0}")]
    AlreadyExists(String),
    /// The requested action is not reachable from the current state.
    #[error("cannot {action} from state {from}")]
    InvalidTransition {
        /// The action that was attempted.
        action: String,
        /// The state it was attempted from.
        from: ApprovalStatus,
    },
    /// A resolved password hash was not a 64-char lowercase hex string.
    #[error("password hash for {0} is not a valid sha256 hex digest")]
    InvalidHashShape(String),
    /// Persisting an audit event failed.
    #[error("audit log: {0}")]
    EventLog(#[from] EventLogError),
}

/// `role_requirements{submit[], approve[], execute[], verify[]}` (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleRequirements {
    /// Roles permitted to submit.
    #[serde(default)]
    pub submit: Vec<String>,
    /// Roles permitted to approve.
    #[serde(default)]
    pub approve: Vec<String>,
    /// Roles permitted to execute.
    #[serde(default)]
    pub execute: Vec<String>,
    /// Roles permitted to verify.
    #[serde(default)]
    pub verify: Vec<String>,
}

/// `password{required, hash_env, ttl_seconds, verified_at?}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordRequirement {
    /// Whether a password is required to execute.
    pub required: bool,
    /// Environment variable resolved to the expected sha256 hex hash.
    pub hash_env: String,
    /// How long a verified password stays valid.
    pub ttl_seconds: u64,
    /// When the password was last successfully verified.
    #[serde(default)]
    pub verified_at: Option<String>,
}

/// `approvals{initiator?, approver?, executor?}` (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Approvals {
    /// Actor who submitted the workflow.
    #[serde(default)]
    pub initiator: Option<String>,
    /// Actor who approved it.
    #[serde(default)]
    pub approver: Option<String>,
    /// Role of the actor who approved it, if role policy is in effect.
    #[serde(default)]
    pub approver_role: Option<String>,
    /// Actor who executed it.
    #[serde(default)]
    pub executor: Option<String>,
}

/// Role identity carried alongside an actor id for a guarded transition.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    /// Actor identifier (user id or service principal).
    pub id: String,
    /// Actor's role, if role policy is in effect.
    pub role: Option<String>,
}

/// The approval workflow instance (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalState {
    /// `wf-…` typed id.
    pub workflow_id: String,
    /// The plan this workflow governs.
    pub plan_id: String,
    /// Current FSM state.
    pub status: ApprovalStatus,
    /// Actors recorded at each stage.
    pub approvals: Approvals,
    /// Per-action role requirements.
    pub role_requirements: RoleRequirements,
    /// Password guard configuration.
    pub password: PasswordRequirement,
    /// Whether an approval is required at all for this plan.
    pub approval_required: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last-updated timestamp.
    pub updated_at: String,
}

/// One audit line appended for every action attempt, successful or blocked
/// (§4.9: "Each action records {actor, actor_role?, comment?, timestamp}").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalEvent {
    /// The governing workflow id.
    pub workflow_id: String,
    /// The governed plan id.
    pub plan_id: String,
    /// Action attempted, e.g. `"submit"`, `"execute"`.
    pub action: String,
    /// Acting actor id.
    pub actor: String,
    /// Acting actor's role, if known.
    #[serde(default)]
    pub actor_role: Option<String>,
    /// Optional actor-supplied comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// State before the action.
    pub from_status: ApprovalStatus,
    /// State after the action (equal to `from_status` when blocked).
    pub to_status: ApprovalStatus,
    /// Whether a guard refused the action.
    pub blocked: bool,
    /// Machine-readable reason code when blocked.
    #[serde(default)]
    pub reason: Option<String>,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
}

/// The outcome of a guarded `execute` attempt (§4.9).
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteOutcome {
    /// The workflow state after the attempt.
    pub state: ApprovalState,
    /// Whether a guard refused execution.
    pub blocked: bool,
    /// Machine-readable reason code when blocked.
    pub reason: Option<String>,
}

fn append_event(
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    event: ApprovalEvent,
) -> Result<(), ApprovalError> {
    log.append(record_id, now_ms, &event)?;
    Ok(())
}

/// Derive role requirements for a fresh workflow: role enforcement is only
/// active when the caller supplies a `role_policy`; absent one, every action
/// is open to any actor (§4.9: "role_requirements derived from
/// plan.authorization + role policy (when provided)").
#[must_use]
fn derive_role_requirements(_plan: &ChangePlan, role_policy: Option<RoleRequirements>) -> RoleRequirements {
    role_policy.unwrap_or_default()
}

/// Create a fresh approval state bound to `plan`. Returns
/// [`ApprovalError::AlreadyExists`] when `existing` is `Some` and `force` is
/// `false` (§4.9: "`--force` on `init` overwrites existing state for the
/// same plan").
#[must_use = "persist the returned state and its audit event"]
pub fn init(
    plan: &ChangePlan,
    workflow_id: String,
    role_policy: Option<RoleRequirements>,
    existing: Option<&ApprovalState>,
    force: bool,
    now: &str,
) -> Result<ApprovalState, ApprovalError> {
    if existing.is_some() && !force {
        return Err(ApprovalError::AlreadyExists(plan.plan_id.clone()));
    }
    Ok(ApprovalState {
        workflow_id,
        plan_id: plan.plan_id.clone(),
        status: ApprovalStatus::Draft,
        approvals: Approvals::default(),
        role_requirements: derive_role_requirements(plan, role_policy),
        password: PasswordRequirement {
            required: plan.authorization.password_required,
            hash_env: plan.authorization.password_hash_env.clone(),
            ttl_seconds: plan.authorization.password_ttl_seconds,
            verified_at: None,
        },
        approval_required: plan.approval.status == plan_synth::ApprovalRequirement::Pending,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    })
}

fn transition(
    state: &mut ApprovalState,
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    action: &str,
    expected_from: ApprovalStatus,
    to: ApprovalStatus,
    actor: &Actor,
    comment: Option<String>,
) -> Result<(), ApprovalError> {
    if state.status != expected_from {
        return Err(ApprovalError::InvalidTransition { action: action.to_string(), from: state.status });
    }
    append_event(
        log,
        record_id,
        now_ms,
        ApprovalEvent {
            workflow_id: state.workflow_id.clone(),
            plan_id: state.plan_id.clone(),
            action: action.to_string(),
            actor: actor.id.clone(),
            actor_role: actor.role.clone(),
            comment,
            from_status: expected_from,
            to_status: to,
            blocked: false,
            reason: None,
            timestamp: now.to_string(),
        },
    )?;
    state.status = to;
    state.updated_at = now.to_string();
    Ok(())
}

/// `draft → submitted`.
pub fn submit(
    state: &mut ApprovalState,
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    actor: &Actor,
    comment: Option<String>,
) -> Result<(), ApprovalError> {
    transition(
        state,
        log,
        record_id,
        now_ms,
        now,
        "submit",
        ApprovalStatus::Draft,
        ApprovalStatus::Submitted,
        actor,
        comment,
    )?;
    state.approvals.initiator = Some(actor.id.clone());
    Ok(())
}

/// `rejected → draft` (resubmit after rework).
pub fn resubmit(
    state: &mut ApprovalState,
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    actor: &Actor,
    comment: Option<String>,
) -> Result<(), ApprovalError> {
    transition(
        state,
        log,
        record_id,
        now_ms,
        now,
        "resubmit",
        ApprovalStatus::Rejected,
        ApprovalStatus::Draft,
        actor,
        comment,
    )
}

/// `submitted → approved`.
pub fn approve(
    state: &mut ApprovalState,
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    actor: &Actor,
    comment: Option<String>,
) -> Result<(), ApprovalError> {
    transition(
        state,
        log,
        record_id,
        now_ms,
        now,
        "approve",
        ApprovalStatus::Submitted,
        ApprovalStatus::Approved,
        actor,
        comment,
    )?;
    state.approvals.approver = Some(actor.id.clone());
    state.approvals.approver_role = actor.role.clone();
    Ok(())
}

/// `submitted → rejected`.
pub fn reject(
    state: &mut ApprovalState,
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    actor: &Actor,
    comment: Option<String>,
) -> Result<(), ApprovalError> {
    transition(
        state,
        log,
        record_id,
        now_ms,
        now,
        "reject",
        ApprovalStatus::Submitted,
        ApprovalStatus::Rejected,
        actor,
        comment,
    )
}

/// `executed → verified`.
pub fn verify(
    state: &mut ApprovalState,
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    actor: &Actor,
    comment: Option<String>,
) -> Result<(), ApprovalError> {
    transition(
        state,
        log,
        record_id,
        now_ms,
        now,
        "verify",
        ApprovalStatus::Executed,
        ApprovalStatus::Verified,
        actor,
        comment,
    )
}

/// `verified → archived`.
pub fn archive(
    state: &mut ApprovalState,
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    actor: &Actor,
    comment: Option<String>,
) -> Result<(), ApprovalError> {
    transition(
        state,
        log,
        record_id,
        now_ms,
        now,
        "archive",
        ApprovalStatus::Verified,
        ApprovalStatus::Archived,
        actor,
        comment,
    )
}

fn append_blocked(
    state: &ApprovalState,
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    actor: &Actor,
    reason: &str,
) -> Result<(), ApprovalError> {
    append_event(
        log,
        record_id,
        now_ms,
        ApprovalEvent {
            workflow_id: state.workflow_id.clone(),
            plan_id: state.plan_id.clone(),
            action: "execute".to_string(),
            actor: actor.id.clone(),
            actor_role: actor.role.clone(),
            comment: None,
            from_status: state.status,
            to_status: state.status,
            blocked: true,
            reason: Some(reason.to_string()),
            timestamp: now.to_string(),
        },
    )
}

/// `approved → executed`, guarded (§4.9):
/// 1. current state must be `approved`;
/// 2. if `password.required`, `secret`'s sha256 hex must match the resolved
///    hash (`hash_override` takes precedence over the env var named by
///    `password.hash_env`);
/// 3. if `require_distinct_actor_roles` is set, the executor must differ
///    from the approver actor/role.
///
/// Role-membership (`actor_role ∈ role_requirements.execute`) is enforced
/// when `role_requirements.execute` is non-empty.
///
/// Guard failures leave the state unchanged, append a `blocked=true` audit
/// event, and are reported via [`ExecuteOutcome`] rather than as an `Err` —
/// only a malformed hash shape is a hard [`ApprovalError`] (§7: bad hash
/// shape is a `ConfigError`).
pub fn execute(
    mut state: ApprovalState,
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    now: &str,
    actor: &Actor,
    secret: Option<&str>,
    hash_override: Option<&str>,
    require_distinct_actor_roles: bool,
) -> Result<ExecuteOutcome, ApprovalError> {
    if state.status != ApprovalStatus::Approved {
        append_blocked(&state, log, record_id, now_ms, now, actor, "not-in-approved-state")?;
        return Ok(ExecuteOutcome { state, blocked: true, reason: Some("not-in-approved-state".to_string()) });
    }

    if state.password.required {
        let resolved_hash = match hash_override {
            Some(h) => h.to_string(),
            None => std::env::var(&state.password.hash_env).unwrap_or_default(),
        };
        if !is_valid_sha256_hex(&resolved_hash) {
            return Err(ApprovalError::InvalidHashShape(state.password.hash_env.clone()));
        }
        let provided = secret.map(|s| sha256_hex(s.as_bytes())).unwrap_or_default();
        if provided != resolved_hash {
            append_blocked(&state, log, record_id, now_ms, now, actor, "password authorization failed")?;
            return Ok(ExecuteOutcome {
                state,
                blocked: true,
                reason: Some("password authorization failed".to_string()),
            });
        }
    }

    if !state.role_requirements.execute.is_empty() {
        let role_ok = actor.role.as_deref().is_some_and(|r| state.role_requirements.execute.iter().any(|x| x == r));
        if !role_ok {
            append_blocked(&state, log, record_id, now_ms, now, actor, "actor role not permitted to execute")?;
            return Ok(ExecuteOutcome {
                state,
                blocked: true,
                reason: Some("actor role not permitted to execute".to_string()),
            });
        }
    }

    if require_distinct_actor_roles {
        let same_actor = state.approvals.approver.as_deref() == Some(actor.id.as_str());
        let same_role = state.approvals.approver_role.is_some() && state.approvals.approver_role == actor.role;
        if same_actor || same_role {
            append_blocked(&state, log, record_id, now_ms, now, actor, "actor roles must differ")?;
            return Ok(ExecuteOutcome { state, blocked: true, reason: Some("actor roles must differ".to_string()) });
        }
    }

    append_event(
        log,
        record_id,
        now_ms,
        ApprovalEvent {
            workflow_id: state.workflow_id.clone(),
            plan_id: state.plan_id.clone(),
            action: "execute".to_string(),
            actor: actor.id.clone(),
            actor_role: actor.role.clone(),
            comment: None,
            from_status: ApprovalStatus::Approved,
            to_status: ApprovalStatus::Executed,
            blocked: false,
            reason: None,
            timestamp: now.to_string(),
        },
    )?;
    state.status = ApprovalStatus::Executed;
    state.approvals.executor = Some(actor.id.clone());
    state.password.verified_at = if state.password.required { Some(now.to_string()) } else { None };
    state.updated_at = now.to_string();

    Ok(ExecuteOutcome { state, blocked: false, reason: None })
}

/// Read every audit event ever recorded for `workflow_id`, in append order
/// (SPEC_FULL §4: approval audit trail query, grounded in `replay-cli`'s
/// `Inspect`/`Replay` commands over an event log).
pub fn history(log: &JsonlStream, workflow_id: &str) -> Result<Vec<ApprovalEvent>, ApprovalError> {
    let rows: Vec<event_log::EventRecord<ApprovalEvent>> = log.read_all()?;
    Ok(rows.into_iter().map(|r| r.payload).filter(|e| e.workflow_id == workflow_id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_core::{ExecutionMode, RiskLevel};
    use plan_synth::{
        Action, ApprovalRequirement, PlanApproval, PlanAuthorization, PlanSecurity, RollbackPlan,
    };

    fn plan(password_required: bool) -> ChangePlan {
        ChangePlan {
            plan_id: "plan-1".into(),
            intent_id: "intent-1".into(),
            risk_level: RiskLevel::Medium,
            execution_mode: ExecutionMode::Apply,
            scope: "orders/order-list".into(),
            actions: vec![Action {
                action_id: "a1".into(),
                action_type: gov_core::ActionType::UpdateRuleThreshold,
                touches_sensitive_data: false,
                requires_privilege_escalation: false,
                irreversible: false,
            }],
            impact_assessment: "x".into(),
            verification_checks: vec![],
            rollback_plan: RollbackPlan { kind: "config-revert".into(), reference: None, note: "x".into() },
            approval: PlanApproval { status: ApprovalRequirement::Pending, dual_approved: false, approvers: vec![] },
            authorization: PlanAuthorization {
                password_required,
                password_scope: if password_required { vec!["execute".into()] } else { vec![] },
                password_hash_env: "TEST_GOV_APPROVAL_PASSWORD_HASH".into(),
                password_ttl_seconds: 900,
                reason_codes: vec![],
            },
            security: PlanSecurity::default(),
            created_at: "t".into(),
        }
    }

    fn actor(id: &str) -> Actor {
        Actor { id: id.to_string(), role: None }
    }

    fn log() -> JsonlStream {
        JsonlStream::open(tempfile::NamedTempFile::new().unwrap().path()).unwrap()
    }

    #[test]
    fn happy_path_reaches_verified() {
        let p = plan(false);
        let mut state = init(&p, "wf-1".into(), None, None, false, "t0").unwrap();
        let l = log();
        submit(&mut state, &l, 1, 1, "t1", &actor("u1"), None).unwrap();
        approve(&mut state, &l, 2, 2, "t2", &actor("approver1"), None).unwrap();
        let outcome = execute(state, &l, 3, 3, "t3", &actor("executor1"), None, None, false).unwrap();
        assert!(!outcome.blocked);
        let mut state = outcome.state;
        assert_eq!(state.status, ApprovalStatus::Executed);
        verify(&mut state, &l, 4, 4, "t4", &actor("executor1"), None).unwrap();
        assert_eq!(state.status, ApprovalStatus::Verified);
    }

    #[test]
    fn wrong_password_blocks_without_state_change() {
        let p = plan(true);
        let mut state = init(&p, "wf-1".into(), None, None, false, "t0").unwrap();
        let l = log();
        submit(&mut state, &l, 1, 1, "t1", &actor("u1"), None).unwrap();
        approve(&mut state, &l, 2, 2, "t2", &actor("approver1"), None).unwrap();
        let correct_hash = sha256_hex(b"correct-pass");
        let outcome =
            execute(state, &l, 3, 3, "t3", &actor("executor1"), Some("wrong"), Some(&correct_hash), false)
                .unwrap();
        assert!(outcome.blocked);
        assert_eq!(outcome.reason.as_deref(), Some("password authorization failed"));
        assert_eq!(outcome.state.status, ApprovalStatus::Approved);
    }

    #[test]
    fn separation_of_duties_blocks_same_actor() {
        let p = plan(false);
        let mut state = init(&p, "wf-1".into(), None, None, false, "t0").unwrap();
        let l = log();
        submit(&mut state, &l, 1, 1, "t1", &actor("u1"), None).unwrap();
        approve(&mut state, &l, 2, 2, "t2", &actor("same-actor"), None).unwrap();
        let outcome = execute(state, &l, 3, 3, "t3", &actor("same-actor"), None, None, true).unwrap();
        assert!(outcome.blocked);
        assert_eq!(outcome.reason.as_deref(), Some("actor roles must differ"));
    }

    #[test]
    fn submit_from_wrong_state_is_invalid_transition() {
        let p = plan(false);
        let mut state = init(&p, "wf-1".into(), None, None, false, "t0").unwrap();
        let l = log();
        submit(&mut state, &l, 1, 1, "t1", &actor("u1"), None).unwrap();
        let err = submit(&mut state, &l, 2, 2, "t2", &actor("u1"), None).unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidTransition { .. }));
    }

    #[test]
    fn init_without_force_refuses_over_existing() {
        let p = plan(false);
        let existing = init(&p, "wf-1".into(), None, None, false, "t0").unwrap();
        let err = init(&p, "wf-2".into(), None, Some(&existing), false, "t0").unwrap_err();
        assert!(matches!(err, ApprovalError::AlreadyExists(_)));
        assert!(init(&p, "wf-2".into(), None, Some(&existing), true, "t0").is_ok());
    }

    #[test]
    fn history_returns_only_this_workflows_events_in_order() {
        let p = plan(false);
        let mut state = init(&p, "wf-1".into(), None, None, false, "t0").unwrap();
        let l = log();
        submit(&mut state, &l, 1, 1, "t1", &actor("u1"), None).unwrap();
        approve(&mut state, &l, 2, 2, "t2", &actor("approver1"), None).unwrap();

        let other = plan(false);
        let mut other_state = init(&other, "wf-2".into(), None, None, false, "t0").unwrap();
        submit(&mut other_state, &l, 3, 3, "t3", &actor("u2"), None).unwrap();

        let events = history(&l, "wf-1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "submit");
        assert_eq!(events[1].action, "approve");
        assert!(events.iter().all(|e| e.workflow_id == "wf-1"));
    }
}
