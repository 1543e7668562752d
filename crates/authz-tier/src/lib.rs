//! Authorization Tier Evaluator (C8): a per-`(profile, environment)` tier
//! decision over the requested execution flags (§4.8).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use gov_core::decision::{dedup_reasons, Severity, StageOutcome, Violation};
use gov_core::{Decision, DialogueProfile, ExecutionMode, RuntimeEnvironment, RuntimeMode};
use policy_engine::AuthorizationTierConfig;
use serde::Serialize;

/// The request flags this tier decision is computed over (§3).
#[derive(Debug, Clone, Serialize)]
pub struct TierContext {
    /// Requested execution mode.
    pub execution_mode: ExecutionMode,
    /// Active dialogue profile.
    pub dialogue_profile: DialogueProfile,
    /// Active runtime mode.
    pub runtime_mode: RuntimeMode,
    /// Active runtime environment.
    pub runtime_environment: RuntimeEnvironment,
    /// Whether the caller requested `auto_execute_low_risk`.
    pub auto_execute_low_risk: bool,
    /// Whether the caller requested `live_apply`.
    pub live_apply: bool,
}

/// Requirements computed from the tier config and context (§3).
#[derive(Debug, Clone, Serialize)]
pub struct TierRequirements {
    /// Whether an apply may proceed at all under this tier.
    pub apply_allowed: bool,
    /// Whether auto-execution is permitted under this tier.
    pub auto_execute_allowed: bool,
    /// Whether live apply is permitted under this tier.
    pub live_apply_allowed: bool,
    /// Whether a secondary authorization factor is required.
    pub require_secondary_authorization: bool,
    /// Whether a password is required for apply.
    pub require_password_for_apply: bool,
    /// Whether a configured role policy is required.
    pub require_role_policy: bool,
    /// Whether executor/approver actors must be distinct.
    pub require_distinct_actor_roles: bool,
    /// Whether manual review is required for apply.
    pub manual_review_required_for_apply: bool,
}

/// The authorization-tier evaluator's decision (§3).
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationTierDecision {
    /// Overall decision.
    pub decision: Decision,
    /// Deduplicated human-readable reasons.
    pub reasons: Vec<String>,
    /// Individual violations recorded.
    pub violations: Vec<Violation>,
    /// The context this decision was computed over.
    pub context: TierContext,
    /// Computed requirements.
    pub requirements: TierRequirements,
}

impl StageOutcome for AuthorizationTierDecision {
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

/// Evaluate the authorization tier for `context` under `tier` (§4.8).
#[must_use]
pub fn evaluate(context: TierContext, tier: &AuthorizationTierConfig) -> AuthorizationTierDecision {
    let mut violations = Vec::new();

    if !tier.allow_execution_modes.contains(&context.execution_mode) {
        violations.push(Violation {
            id: "execution-mode-not-allowed".to_string(),
            severity: Severity::Deny,
            detail: format!(
                "profile {} does not allow execution_mode {} in this environment",
                context.dialogue_profile, context.execution_mode
            ),
        });
    }
    if context.auto_execute_low_risk && !tier.allow_auto_execute_low_risk {
        violations.push(Violation {
            id: "auto-execute-not-allowed".to_string(),
            severity: Severity::Deny,
            detail: format!("profile {} may not auto-execute low-risk plans here", context.dialogue_profile),
        });
    }
    if context.live_apply && !tier.allow_live_apply {
        violations.push(Violation {
            id: "live-apply-not-allowed".to_string(),
            severity: Severity::Deny,
            detail: format!("profile {} may not live-apply in this environment", context.dialogue_profile),
        });
    }
    if context.execution_mode == ExecutionMode::Apply && tier.manual_review_required_for_apply {
        violations.push(Violation {
            id: "manual-review-required".to_string(),
            severity: Severity::Review,
            detail: "this tier requires manual review for apply".to_string(),
        });
    }

    let decision = Decision::combine(violations.iter().map(|v| match v.severity {
        Severity::Deny => Decision::Deny,
        Severity::Review => Decision::ReviewRequired,
    }));

    let reasons = dedup_reasons(violations.iter().map(|v| v.detail.clone()).collect());

    AuthorizationTierDecision {
        decision,
        reasons,
        requirements: TierRequirements {
            apply_allowed: decision != Decision::Deny
                && tier.allow_execution_modes.contains(&ExecutionMode::Apply),
            auto_execute_allowed: decision == Decision::Allow && tier.allow_auto_execute_low_risk,
            live_apply_allowed: decision != Decision::Deny && tier.allow_live_apply,
            require_secondary_authorization: tier.require_secondary_authorization,
            require_password_for_apply: tier.require_password_for_apply,
            require_role_policy: tier.require_role_policy,
            require_distinct_actor_roles: tier.require_distinct_actor_roles,
            manual_review_required_for_apply: tier.manual_review_required_for_apply,
        },
        context,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_engine::Policy;

    fn ctx(execution_mode: ExecutionMode, live_apply: bool, auto: bool) -> TierContext {
        TierContext {
            execution_mode,
            dialogue_profile: DialogueProfile::BusinessUser,
            runtime_mode: RuntimeMode::UserAssist,
            runtime_environment: RuntimeEnvironment::Prod,
            auto_execute_low_risk: auto,
            live_apply,
        }
    }

    #[test]
    fn business_user_cannot_live_apply_in_prod() {
        let policy = Policy::load(None).unwrap();
        let tier = policy.authorization_tier(DialogueProfile::BusinessUser, RuntimeEnvironment::Prod).unwrap();
        let d = evaluate(ctx(ExecutionMode::Apply, true, false), tier);
        assert_eq!(d.decision, Decision::Deny);
    }

    #[test]
    fn system_maintainer_dev_allows_live_apply() {
        let policy = Policy::load(None).unwrap();
        let tier =
            policy.authorization_tier(DialogueProfile::SystemMaintainer, RuntimeEnvironment::Dev).unwrap();
        let d = evaluate(
            TierContext {
                execution_mode: ExecutionMode::Apply,
                dialogue_profile: DialogueProfile::SystemMaintainer,
                runtime_mode: RuntimeMode::OpsFix,
                runtime_environment: RuntimeEnvironment::Dev,
                auto_execute_low_risk: false,
                live_apply: true,
            },
            tier,
        );
        assert_eq!(d.decision, Decision::Allow);
        assert!(d.requirements.live_apply_allowed);
    }
}
