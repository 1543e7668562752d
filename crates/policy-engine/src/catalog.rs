//! Plan-gate catalog policy (§4.6), consumed by `plan-gate` (C6).

use gov_core::{ActionType, RiskLevel};
use serde::{Deserialize, Serialize};

/// Thresholds and catalogs used by the nine plan-gate checks (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPolicy {
    /// Action types that always fail the `deny-action-types` check.
    #[serde(default = "default_deny_action_types")]
    pub deny_action_types: Vec<ActionType>,
    /// Action types that require `approval.status = approved` when present
    /// (`review-action-types`).
    #[serde(default = "default_review_action_types")]
    pub review_action_types: Vec<ActionType>,
    /// Risk levels that require an approved plan (`risk-approval`).
    #[serde(default = "default_require_approval_for_risk_levels")]
    pub require_approval_for_risk_levels: Vec<RiskLevel>,
    /// Maximum action count before approval is required; `0` disables the
    /// check's exemption (every plan above 0 actions needs approval).
    #[serde(default = "default_max_actions_without_approval")]
    pub max_actions_without_approval: usize,
    /// Require `approval.dual_approved` when any action needs privilege
    /// escalation.
    #[serde(default = "default_true")]
    pub require_dual_approval_for_privilege_escalation: bool,
    /// Require `security.masking_applied` when any action touches sensitive
    /// data.
    #[serde(default = "default_true")]
    pub require_masking_when_sensitive_data: bool,
    /// Forbid `security.plaintext_secrets_in_payload`.
    #[serde(default = "default_true")]
    pub forbid_plaintext_secrets: bool,
    /// Require a non-empty `security.backup_reference` when any action is
    /// irreversible.
    #[serde(default = "default_true")]
    pub require_backup_for_irreversible_actions: bool,
}

fn default_deny_action_types() -> Vec<ActionType> {
    vec![ActionType::BulkDeleteWithoutFilter, ActionType::PermissionGrantSuperAdmin]
}
fn default_review_action_types() -> Vec<ActionType> {
    vec![ActionType::CredentialExport, ActionType::WorkflowApprovalChainChange]
}
fn default_require_approval_for_risk_levels() -> Vec<RiskLevel> {
    vec![RiskLevel::High]
}
fn default_max_actions_without_approval() -> usize {
    3
}
fn default_true() -> bool {
    true
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        Self {
            deny_action_types: default_deny_action_types(),
            review_action_types: default_review_action_types(),
            require_approval_for_risk_levels: default_require_approval_for_risk_levels(),
            max_actions_without_approval: default_max_actions_without_approval(),
            require_dual_approval_for_privilege_escalation: true,
            require_masking_when_sensitive_data: true,
            forbid_plaintext_secrets: true,
            require_backup_for_irreversible_actions: true,
        }
    }
}
