//! Conversions from every sibling crate's narrow error type into the shared
//! [`GovError`] taxonomy, performed at this service boundary (§9: stages
//! convert into `GovError` at the orchestrator/cli boundary).

use approval::ApprovalError;
use event_log::EventLogError;
use gov_core::GovError;
use policy_engine::PolicyError;

pub(crate) fn event_log(e: EventLogError) -> GovError {
    match e {
        EventLogError::Io(err) => GovError::Io(err),
        EventLogError::Serde(err) => GovError::Serde(err),
    }
}

pub(crate) fn policy(e: PolicyError) -> GovError {
    match e {
        PolicyError::Read { path, source } => GovError::Config(format!("{path}: {source}")),
        PolicyError::Parse { path, source } => GovError::Config(format!("{path}: {source}")),
        PolicyError::ProfileNotFound(name) => GovError::ProfileNotFound(name),
        PolicyError::ModeNotDefined(name) => GovError::ModeNotDefined(name),
        PolicyError::EnvironmentNotDefined(name) => GovError::EnvironmentNotDefined(name),
    }
}

pub(crate) fn approval(e: ApprovalError) -> GovError {
    match e {
        ApprovalError::AlreadyExists(plan_id) => {
            GovError::Config(format!("approval state already exists for plan {plan_id}"))
        }
        ApprovalError::InvalidTransition { action, from } => {
            GovError::ApprovalBlocked(format!("cannot {action} from state {from}"))
        }
        ApprovalError::InvalidHashShape(hash_env) => {
            GovError::Config(format!("password hash for {hash_env} is not a valid sha256 hex digest"))
        }
        ApprovalError::EventLog(err) => event_log(err),
    }
}

pub(crate) fn adapter(e: adapter::AdapterError) -> GovError {
    match e {
        adapter::AdapterError::Ledger(err) => event_log(err),
    }
}
