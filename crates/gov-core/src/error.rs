//! Error taxonomy (§7) shared by every crate, plus the exit-code mapping
//! the `cli` binary uses to terminate the process (§6, §7).

use thiserror::Error;

/// Top-level error kind. Library crates define their own narrower error
/// enums (e.g. `policy_engine::PolicyError`) and convert into this one at
/// the `orchestrator`/`cli` boundary, mirroring the teacher's pattern of
/// per-crate errors converted at the service boundary
/// (`orchestrator::internal_io`/`internal_serde`).
#[derive(Debug, Error)]
pub enum GovError {
    /// Invalid flags, unreadable policy file, malformed password-hash shape.
    #[error("configuration error: {0}")]
    Config(String),
    /// Context contract validation failed under `strict = true`.
    #[error("contract violation: {0}")]
    ContractViolation(String),
    /// A requested dialogue profile does not exist.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),
    /// A requested runtime mode does not exist.
    #[error("runtime mode not defined: {0}")]
    ModeNotDefined(String),
    /// A requested runtime environment does not exist.
    #[error("environment not defined: {0}")]
    EnvironmentNotDefined(String),
    /// A gate/runtime/tier/dialogue stage denied and `--fail-on-*` was set.
    #[error("policy deny: {0}")]
    PolicyDeny(String),
    /// An approval-workflow guard refused a transition.
    #[error("approval blocked: {0}")]
    ApprovalBlocked(String),
    /// The adapter refused to apply a plan.
    #[error("execution blocked: {0}")]
    ExecutionBlocked(String),
    /// A live-apply call reported failure.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// Filesystem I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl GovError {
    /// Process exit code per §6/§7: 0 success (not representable as an
    /// error), 1 unexpected/config/IO error, 2 a policy gate triggered a
    /// fail-on condition.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PolicyDeny(_) | Self::ApprovalBlocked(_) | Self::ExecutionBlocked(_) | Self::ExecutionFailed(_) => 2,
            Self::Config(_)
            | Self::ContractViolation(_)
            | Self::ProfileNotFound(_)
            | Self::ModeNotDefined(_)
            | Self::EnvironmentNotDefined(_)
            | Self::Io(_)
            | Self::Serde(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_family_maps_to_exit_2() {
        assert_eq!(GovError::PolicyDeny("x".into()).exit_code(), 2);
        assert_eq!(GovError::ApprovalBlocked("x".into()).exit_code(), 2);
        assert_eq!(GovError::ExecutionBlocked("x".into()).exit_code(), 2);
        assert_eq!(GovError::ExecutionFailed("x".into()).exit_code(), 2);
    }

    #[test]
    fn config_family_maps_to_exit_1() {
        assert_eq!(GovError::Config("x".into()).exit_code(), 1);
        assert_eq!(GovError::ContractViolation("x".into()).exit_code(), 1);
        assert_eq!(GovError::ProfileNotFound("x".into()).exit_code(), 1);
    }
}
