//! Authorization-tier policy (§4.8), consumed by `authz-tier` (C8).

use gov_core::ExecutionMode;
use serde::{Deserialize, Serialize};

/// Configuration for one `(profile, environment)` tier (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationTierConfig {
    /// Execution modes this profile may request in this environment.
    #[serde(default = "all_execution_modes")]
    pub allow_execution_modes: Vec<ExecutionMode>,
    /// Whether `auto_execute_low_risk` may be requested.
    #[serde(default)]
    pub allow_auto_execute_low_risk: bool,
    /// Whether `live_apply` may be requested.
    #[serde(default)]
    pub allow_live_apply: bool,
    /// Require manual review whenever `execution_mode = apply`.
    #[serde(default)]
    pub manual_review_required_for_apply: bool,
    /// Require a secondary authorization factor beyond password.
    #[serde(default)]
    pub require_secondary_authorization: bool,
    /// Require a password for any apply.
    #[serde(default)]
    pub require_password_for_apply: bool,
    /// Require a configured role policy for the approval workflow.
    #[serde(default)]
    pub require_role_policy: bool,
    /// Require executor and approver actors (and roles) to differ.
    #[serde(default)]
    pub require_distinct_actor_roles: bool,
}

fn all_execution_modes() -> Vec<ExecutionMode> {
    vec![ExecutionMode::Suggestion, ExecutionMode::Apply]
}

/// Built-in defaults for the two profiles across the three environments.
#[must_use]
pub fn default_tiers(
) -> std::collections::HashMap<String, std::collections::HashMap<String, AuthorizationTierConfig>>
{
    use std::collections::HashMap;
    let mut top = HashMap::new();

    let mut business_user = HashMap::new();
    business_user.insert(
        "dev".to_string(),
        AuthorizationTierConfig {
            allow_execution_modes: vec![ExecutionMode::Suggestion, ExecutionMode::Apply],
            allow_auto_execute_low_risk: true,
            allow_live_apply: false,
            manual_review_required_for_apply: false,
            require_secondary_authorization: false,
            require_password_for_apply: false,
            require_role_policy: false,
            require_distinct_actor_roles: false,
        },
    );
    business_user.insert(
        "staging".to_string(),
        AuthorizationTierConfig {
            allow_execution_modes: vec![ExecutionMode::Suggestion, ExecutionMode::Apply],
            allow_auto_execute_low_risk: true,
            allow_live_apply: false,
            manual_review_required_for_apply: true,
            require_secondary_authorization: false,
            require_password_for_apply: true,
            require_role_policy: true,
            require_distinct_actor_roles: false,
        },
    );
    business_user.insert(
        "prod".to_string(),
        AuthorizationTierConfig {
            allow_execution_modes: vec![ExecutionMode::Suggestion],
            allow_auto_execute_low_risk: false,
            allow_live_apply: false,
            manual_review_required_for_apply: true,
            require_secondary_authorization: true,
            require_password_for_apply: true,
            require_role_policy: true,
            require_distinct_actor_roles: true,
        },
    );
    top.insert("business-user".to_string(), business_user);

    let mut system_maintainer = HashMap::new();
    system_maintainer.insert(
        "dev".to_string(),
        AuthorizationTierConfig {
            allow_execution_modes: vec![ExecutionMode::Suggestion, ExecutionMode::Apply],
            allow_auto_execute_low_risk: true,
            allow_live_apply: true,
            manual_review_required_for_apply: false,
            require_secondary_authorization: false,
            require_password_for_apply: false,
            require_role_policy: false,
            require_distinct_actor_roles: false,
        },
    );
    system_maintainer.insert(
        "staging".to_string(),
        AuthorizationTierConfig {
            allow_execution_modes: vec![ExecutionMode::Suggestion, ExecutionMode::Apply],
            allow_auto_execute_low_risk: true,
            allow_live_apply: true,
            manual_review_required_for_apply: false,
            require_secondary_authorization: false,
            require_password_for_apply: true,
            require_role_policy: true,
            require_distinct_actor_roles: false,
        },
    );
    system_maintainer.insert(
        "prod".to_string(),
        AuthorizationTierConfig {
            allow_execution_modes: vec![ExecutionMode::Suggestion, ExecutionMode::Apply],
            allow_auto_execute_low_risk: false,
            allow_live_apply: true,
            manual_review_required_for_apply: true,
            require_secondary_authorization: true,
            require_password_for_apply: true,
            require_role_policy: true,
            require_distinct_actor_roles: true,
        },
    );
    top.insert("system-maintainer".to_string(), system_maintainer);

    top
}
