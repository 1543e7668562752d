//! Closed enumerations from §6 of the wire protocol. All serialize in
//! `snake_case` and round-trip through the JSON artifacts on disk.

use serde::{Deserialize, Serialize};

/// `risk_level ∈ {low, medium, high}` (internal `critical` aliases to `high`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Lowest risk tier.
    Low,
    /// Middle risk tier.
    Medium,
    /// Highest risk tier. `"critical"` in input is normalized to this.
    High,
}

impl RiskLevel {
    /// Parse a risk-level token, treating `"critical"` as an alias for `High`
    /// (§6: "internal `critical` aliased to `high`").
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" | "critical" => Some(Self::High),
            _ => None,
        }
    }

    /// The highest of two risk levels.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        std::cmp::max(self, other)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// `decision ∈ {allow, review-required, deny}`. Ordered so that combining
/// decisions with `max` never upgrades a deny to an allow (§8: "Monotonic
/// decision: deny > review-required > allow").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    /// Proceed.
    Allow,
    /// Proceed only once a required approval/condition is satisfied.
    ReviewRequired,
    /// Block outright.
    Deny,
}

impl Decision {
    /// Fold a sequence of decisions down to the most restrictive one; an
    /// empty sequence allows.
    pub fn combine<I: IntoIterator<Item = Decision>>(iter: I) -> Decision {
        iter.into_iter().max().unwrap_or(Decision::Allow)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Allow => "allow",
            Self::ReviewRequired => "review-required",
            Self::Deny => "deny",
        };
        f.write_str(s)
    }
}

/// `execution_mode ∈ {suggestion, apply}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// The plan is advisory only; nothing is applied.
    Suggestion,
    /// The plan may be applied to the runtime.
    Apply,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Suggestion => "suggestion",
            Self::Apply => "apply",
        };
        f.write_str(s)
    }
}

/// `runtime_mode ∈ {user-assist, ops-fix, feature-dev}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeMode {
    /// End-user assisted customization.
    UserAssist,
    /// Operations-driven incident fix.
    OpsFix,
    /// Feature-development change.
    FeatureDev,
}

/// `runtime_environment ∈ {dev, staging, prod}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeEnvironment {
    /// Development environment.
    Dev,
    /// Staging environment.
    Staging,
    /// Production environment.
    Prod,
}

/// `ui_mode ∈ {user-app, ops-console, dev-workbench}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum UiMode {
    /// The end-user facing application.
    UserApp,
    /// The operations console.
    OpsConsole,
    /// The developer workbench.
    DevWorkbench,
}

/// `dialogue_profile ∈ {business-user, system-maintainer}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DialogueProfile {
    /// Non-privileged business user persona.
    BusinessUser,
    /// Privileged system-maintainer persona.
    SystemMaintainer,
}

impl std::fmt::Display for DialogueProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BusinessUser => "business-user",
            Self::SystemMaintainer => "system-maintainer",
        };
        f.write_str(s)
    }
}

/// `feedback_channel ∈ {ui, cli, api, other}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackChannel {
    /// Submitted from the interactive UI.
    Ui,
    /// Submitted from the CLI.
    Cli,
    /// Submitted through an API integration.
    Api,
    /// Any other channel.
    Other,
}

/// `business_mode ∈ {user-mode, ops-mode, dev-mode, unknown}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BusinessMode {
    /// Corresponds to `runtime_mode = user-assist`.
    UserMode,
    /// Corresponds to `runtime_mode = ops-fix`.
    OpsMode,
    /// Corresponds to `runtime_mode = feature-dev`.
    DevMode,
    /// Mode could not be determined from context.
    Unknown,
}

impl From<RuntimeMode> for BusinessMode {
    fn from(m: RuntimeMode) -> Self {
        match m {
            RuntimeMode::UserAssist => Self::UserMode,
            RuntimeMode::OpsFix => Self::OpsMode,
            RuntimeMode::FeatureDev => Self::DevMode,
        }
    }
}

/// The closed action-type catalog (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// No mutating action was inferred; read-only analysis.
    AnalysisOnly,
    /// Change to a workflow approval chain.
    WorkflowApprovalChainChange,
    /// Update a numeric/threshold rule value.
    UpdateRuleThreshold,
    /// Adjust a UI form field.
    UiFormFieldAdjust,
    /// Bulk inventory adjustment.
    InventoryAdjustmentBulk,
    /// Change to a payment rule.
    PaymentRuleChange,
    /// Bulk delete without an explicit filter.
    BulkDeleteWithoutFilter,
    /// Grant super-admin permission.
    PermissionGrantSuperAdmin,
    /// Export credentials.
    CredentialExport,
}

impl ActionType {
    /// `touches_sensitive_data`, `requires_privilege_escalation`, `irreversible`
    /// defaults for this action type (§4.5: "instantiated with per-type
    /// defaults").
    #[must_use]
    pub fn defaults(self) -> (bool, bool, bool) {
        match self {
            Self::AnalysisOnly => (false, false, false),
            Self::UiFormFieldAdjust => (false, false, false),
            Self::UpdateRuleThreshold => (false, false, false),
            Self::WorkflowApprovalChainChange => (false, true, false),
            Self::InventoryAdjustmentBulk => (false, false, true),
            Self::PaymentRuleChange => (true, false, false),
            Self::BulkDeleteWithoutFilter => (true, false, true),
            Self::PermissionGrantSuperAdmin => (true, true, true),
            Self::CredentialExport => (true, true, false),
        }
    }
}

/// `{draft, submitted, approved, rejected, executed, verified, archived}` (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Freshly initialized, not yet submitted.
    Draft,
    /// Submitted for review.
    Submitted,
    /// Approved by an approver.
    Approved,
    /// Rejected by an approver.
    Rejected,
    /// Executed by an executor.
    Executed,
    /// Verified after execution.
    Verified,
    /// Archived terminal state.
    Archived,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
            Self::Verified => "verified",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

/// `work_order.status ∈ {blocked, pending-review, ready-for-apply, completed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum WorkOrderStatus {
    /// A stage denied, or an execution attempt was blocked.
    Blocked,
    /// Review or approval is still pending.
    PendingReview,
    /// Gate and runtime both allow; ready to be applied.
    ReadyForApply,
    /// Execution attempted and succeeded.
    Completed,
}

/// `priority ∈ {low, medium, high}`, shared by intents and work orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_orders_low_medium_high() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn critical_aliases_to_high() {
        assert_eq!(RiskLevel::parse("critical"), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse("CRITICAL"), Some(RiskLevel::High));
    }

    #[test]
    fn decision_combine_is_monotonic() {
        let d = Decision::combine([Decision::Allow, Decision::ReviewRequired, Decision::Allow]);
        assert_eq!(d, Decision::ReviewRequired);
        let d2 = Decision::combine([Decision::Deny, Decision::Allow]);
        assert_eq!(d2, Decision::Deny);
        assert_eq!(Decision::combine([]), Decision::Allow);
    }

    #[test]
    fn action_type_defaults_match_catalog() {
        let (sensitive, escalation, irreversible) = ActionType::CredentialExport.defaults();
        assert!(sensitive && escalation && !irreversible);
        let (s, e, i) = ActionType::AnalysisOnly.defaults();
        assert!(!s && !e && !i);
    }
}
