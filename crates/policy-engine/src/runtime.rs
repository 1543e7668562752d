//! Runtime-mode / runtime-environment / ui_mode policy (§4.7), consumed by
//! `runtime-policy` (C7).

use gov_core::{ActionType, ExecutionMode, RiskLevel, RuntimeEnvironment, RuntimeMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Map a closed [`RuntimeMode`] to its policy-file key.
#[must_use]
pub fn mode_key(mode: RuntimeMode) -> &'static str {
    match mode {
        RuntimeMode::UserAssist => "user-assist",
        RuntimeMode::OpsFix => "ops-fix",
        RuntimeMode::FeatureDev => "feature-dev",
    }
}

/// Map a closed [`RuntimeEnvironment`] to its policy-file key.
#[must_use]
pub fn env_key(env: RuntimeEnvironment) -> &'static str {
    match env {
        RuntimeEnvironment::Dev => "dev",
        RuntimeEnvironment::Staging => "staging",
        RuntimeEnvironment::Prod => "prod",
    }
}

/// Per-`runtime_mode` configuration (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeModeConfig {
    /// Execution modes this runtime mode accepts.
    #[serde(default = "all_execution_modes")]
    pub allow_execution_modes: Vec<ExecutionMode>,
    /// Action types this runtime mode denies outright.
    #[serde(default)]
    pub deny_action_types: Vec<ActionType>,
    /// Action types this runtime mode requires review for.
    #[serde(default)]
    pub review_required_action_types: Vec<ActionType>,
    /// Forbid mutating applies (any action other than `analysis_only`)
    /// under this mode.
    #[serde(default)]
    pub forbid_mutating_apply: bool,
}

fn all_execution_modes() -> Vec<ExecutionMode> {
    vec![ExecutionMode::Suggestion, ExecutionMode::Apply]
}

/// Per-`runtime_environment` configuration (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEnvironmentConfig {
    /// Require manual review whenever `execution_mode = apply`.
    #[serde(default)]
    pub manual_review_required_for_apply: bool,
    /// Risk levels that require an approved plan under `execution_mode = apply`.
    #[serde(default)]
    pub require_approval_for_risk_levels: Vec<RiskLevel>,
    /// Require `plan.authorization.password_required` whenever any mutating
    /// action is applied.
    #[serde(default)]
    pub require_password_for_apply_mutations: bool,
    /// Highest risk level permitted for `execution_mode = apply`.
    pub max_risk_level_for_apply: RiskLevel,
    /// Highest risk level eligible for auto-execution.
    pub max_auto_execute_risk_level: RiskLevel,
}

/// Per-`ui_mode` configuration (§4.7). Optional block: absent ⇒ ui_mode is
/// not checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiModeConfig {
    /// Runtime modes this UI surface is allowed to drive.
    #[serde(default)]
    pub allowed_runtime_modes: Vec<String>,
    /// Execution modes this UI surface is allowed to request.
    #[serde(default = "all_execution_modes")]
    pub allowed_execution_modes: Vec<ExecutionMode>,
}

/// Built-in defaults for the three runtime maps, keyed by name.
#[must_use]
pub fn default_modes() -> HashMap<String, RuntimeModeConfig> {
    let mut m = HashMap::new();
    m.insert(
        "user-assist".to_string(),
        RuntimeModeConfig {
            allow_execution_modes: vec![ExecutionMode::Suggestion, ExecutionMode::Apply],
            deny_action_types: vec![
                ActionType::PermissionGrantSuperAdmin,
                ActionType::CredentialExport,
                ActionType::BulkDeleteWithoutFilter,
            ],
            review_required_action_types: vec![ActionType::WorkflowApprovalChainChange],
            forbid_mutating_apply: false,
        },
    );
    m.insert(
        "ops-fix".to_string(),
        RuntimeModeConfig {
            allow_execution_modes: vec![ExecutionMode::Suggestion, ExecutionMode::Apply],
            deny_action_types: vec![ActionType::PermissionGrantSuperAdmin],
            review_required_action_types: vec![ActionType::CredentialExport],
            forbid_mutating_apply: false,
        },
    );
    m.insert(
        "feature-dev".to_string(),
        RuntimeModeConfig {
            allow_execution_modes: vec![ExecutionMode::Suggestion],
            deny_action_types: vec![],
            review_required_action_types: vec![],
            forbid_mutating_apply: true,
        },
    );
    m
}

/// Built-in defaults for the runtime-environment map.
#[must_use]
pub fn default_environments() -> HashMap<String, RuntimeEnvironmentConfig> {
    let mut m = HashMap::new();
    m.insert(
        "dev".to_string(),
        RuntimeEnvironmentConfig {
            manual_review_required_for_apply: false,
            require_approval_for_risk_levels: vec![RiskLevel::High],
            require_password_for_apply_mutations: false,
            max_risk_level_for_apply: RiskLevel::High,
            max_auto_execute_risk_level: RiskLevel::Medium,
        },
    );
    m.insert(
        "staging".to_string(),
        RuntimeEnvironmentConfig {
            manual_review_required_for_apply: false,
            require_approval_for_risk_levels: vec![RiskLevel::Medium, RiskLevel::High],
            require_password_for_apply_mutations: true,
            max_risk_level_for_apply: RiskLevel::High,
            max_auto_execute_risk_level: RiskLevel::Low,
        },
    );
    m.insert(
        "prod".to_string(),
        RuntimeEnvironmentConfig {
            manual_review_required_for_apply: true,
            require_approval_for_risk_levels: vec![RiskLevel::Low, RiskLevel::Medium, RiskLevel::High],
            require_password_for_apply_mutations: true,
            max_risk_level_for_apply: RiskLevel::Medium,
            max_auto_execute_risk_level: RiskLevel::Low,
        },
    );
    m
}

/// Built-in defaults for the ui_mode map.
#[must_use]
pub fn default_ui_modes() -> HashMap<String, UiModeConfig> {
    let mut m = HashMap::new();
    m.insert(
        "user-app".to_string(),
        UiModeConfig {
            allowed_runtime_modes: vec!["user-assist".into()],
            allowed_execution_modes: vec![ExecutionMode::Suggestion, ExecutionMode::Apply],
        },
    );
    m.insert(
        "ops-console".to_string(),
        UiModeConfig {
            allowed_runtime_modes: vec!["ops-fix".into(), "user-assist".into()],
            allowed_execution_modes: vec![ExecutionMode::Suggestion, ExecutionMode::Apply],
        },
    );
    m.insert(
        "dev-workbench".to_string(),
        UiModeConfig {
            allowed_runtime_modes: vec!["feature-dev".into()],
            allowed_execution_modes: vec![ExecutionMode::Suggestion],
        },
    );
    m
}
