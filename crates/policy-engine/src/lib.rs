//! Policy Loader (C1).
//!
//! Loads and merges the built-in default policy with an optional JSON policy
//! file and a caller-selected profile overlay, producing a single immutable
//! [`Policy`] value consumed by every downstream stage. Mirrors the ambient
//! "Policy ← BuiltIn ⊕ File ⊕ ProfileOverlay" merge rule: scalars replace,
//! rule/template arrays append, `length_policy` fields replace individually
//! when finite.
//!
//! Regex rules (dialogue deny/clarify patterns) are compiled lazily and
//! cached alongside the policy value; a rule whose pattern fails to compile
//! is logged and dropped rather than failing the whole load, matching the
//! "ambiguous JSON inputs causing a rule to be unparsable are non-fatal"
//! error-handling rule.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builtin;
mod catalog;
mod contract;
mod dialogue;
mod governance;
mod merge;
mod runtime;
mod tier;

pub use catalog::CatalogPolicy;
pub use contract::ContextContract;
pub use dialogue::{CompiledPattern, DialoguePolicy, LengthPolicy, ProfileOverlay};
pub use governance::GovernanceThresholds;
pub use runtime::{RuntimeEnvironmentConfig, RuntimeModeConfig, UiModeConfig};
pub use tier::AuthorizationTierConfig;

use gov_core::{DialogueProfile, RuntimeEnvironment, RuntimeMode};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Errors raised while loading or resolving a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    Read {
        /// The path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The policy file did not parse as JSON matching the expected shape.
    #[error("malformed policy file {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
    /// A requested dialogue profile does not exist in the merged policy.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),
    /// A requested runtime mode does not exist in the merged policy.
    #[error("runtime mode not defined: {0}")]
    ModeNotDefined(String),
    /// A requested runtime environment does not exist in the merged policy.
    #[error("environment not defined: {0}")]
    EnvironmentNotDefined(String),
}

/// The JSON shape of a user-supplied policy file. Every field is optional:
/// an absent section leaves the built-in default for that section in place.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyFile {
    /// Overrides for the context contract.
    #[serde(default)]
    pub context_contract: Option<ContextContract>,
    /// Overrides for the dialogue policy (base, before profile overlay).
    #[serde(default)]
    pub dialogue: Option<DialoguePolicy>,
    /// Overrides for the plan-gate catalog policy.
    #[serde(default)]
    pub catalog: Option<CatalogPolicy>,
    /// Per-runtime-mode overrides, merged by name.
    #[serde(default)]
    pub runtime_modes: HashMap<String, RuntimeModeConfig>,
    /// Per-runtime-environment overrides, merged by name.
    #[serde(default)]
    pub runtime_environments: HashMap<String, RuntimeEnvironmentConfig>,
    /// Per-ui-mode overrides, merged by name.
    #[serde(default)]
    pub ui_modes: HashMap<String, UiModeConfig>,
    /// Per-(profile, environment) authorization tier overrides.
    #[serde(default)]
    pub authorization_tiers: HashMap<String, HashMap<String, AuthorizationTierConfig>>,
    /// Overrides for governance-reporter thresholds.
    #[serde(default)]
    pub governance_thresholds: Option<GovernanceThresholds>,
}

/// The fully merged, immutable policy used by every pipeline stage.
#[derive(Debug, Clone)]
pub struct Policy {
    /// `true` iff a policy file was actually loaded from disk (§4.1).
    pub from_file: bool,
    /// The context contract (C2).
    pub context_contract: ContextContract,
    /// The base dialogue policy, before any profile overlay (C3).
    pub dialogue: DialoguePolicy,
    /// The plan-gate catalog policy (C6).
    pub catalog: CatalogPolicy,
    /// Runtime-mode configs keyed by mode name (C7).
    pub runtime_modes: HashMap<String, RuntimeModeConfig>,
    /// Runtime-environment configs keyed by environment name (C7).
    pub runtime_environments: HashMap<String, RuntimeEnvironmentConfig>,
    /// Optional ui_mode configs keyed by ui_mode name (C7).
    pub ui_modes: HashMap<String, UiModeConfig>,
    /// Authorization-tier configs keyed by `(profile, environment)` (C8).
    pub authorization_tiers: HashMap<String, HashMap<String, AuthorizationTierConfig>>,
    /// Governance-reporter thresholds (C13).
    pub governance_thresholds: GovernanceThresholds,
}

impl Policy {
    /// Load the policy: built-in defaults merged with an optional JSON file
    /// at `path`. `path = None` produces the built-in default with
    /// `from_file = false` (§4.1).
    pub fn load(path: Option<&Path>) -> Result<Self, PolicyError> {
        let builtin = builtin::default_policy();
        let Some(path) = path else {
            return Ok(builtin);
        };
        let text = std::fs::read_to_string(path)
            .map_err(|source| PolicyError::Read { path: path.display().to_string(), source })?;
        let file: PolicyFile = serde_json::from_str(&text)
            .map_err(|source| PolicyError::Parse { path: path.display().to_string(), source })?;
        Ok(merge::merge_policy(builtin, file))
    }

    /// Resolve the dialogue policy for `profile`, applying the named
    /// profile's overlay on top of the base dialogue policy (§4.1: scalar
    /// replace, rule arrays append, length_policy fields replace when
    /// finite).
    pub fn resolve_dialogue_profile(
        &self,
        profile: DialogueProfile,
    ) -> Result<DialoguePolicy, PolicyError> {
        let name = profile.to_string();
        let Some(overlay) = self.dialogue.profiles.get(&name) else {
            return Err(PolicyError::ProfileNotFound(name));
        };
        Ok(merge::apply_profile_overlay(&self.dialogue, overlay))
    }

    /// Look up a runtime-mode config by the closed enum value.
    pub fn runtime_mode(&self, mode: RuntimeMode) -> Result<&RuntimeModeConfig, PolicyError> {
        let name = runtime::mode_key(mode);
        self.runtime_modes.get(name).ok_or_else(|| PolicyError::ModeNotDefined(name.to_string()))
    }

    /// Look up a runtime-environment config by the closed enum value.
    pub fn runtime_environment(
        &self,
        env: RuntimeEnvironment,
    ) -> Result<&RuntimeEnvironmentConfig, PolicyError> {
        let name = runtime::env_key(env);
        self.runtime_environments
            .get(name)
            .ok_or_else(|| PolicyError::EnvironmentNotDefined(name.to_string()))
    }

    /// Look up an authorization-tier config by profile and environment.
    pub fn authorization_tier(
        &self,
        profile: DialogueProfile,
        env: RuntimeEnvironment,
    ) -> Option<&AuthorizationTierConfig> {
        self.authorization_tiers.get(&profile.to_string())?.get(runtime::env_key(env))
    }
}

/// Compile a regex, warning and returning `None` on failure rather than
/// propagating the error (§7, §9: "on parse failure log and drop the single
/// rule").
pub(crate) fn try_compile(pattern: &str) -> Option<regex::Regex> {
    match regex::RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(pattern, %err, "dropping unparsable policy regex rule");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_policy_has_no_file_flag() {
        let p = Policy::load(None).unwrap();
        assert!(!p.from_file);
        assert!(p.runtime_modes.contains_key("ops-fix"));
        assert!(p.ui_modes.contains_key("ops-console"));
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let p = Policy::load(None).unwrap();
        let err = p.resolve_dialogue_profile(gov_core::DialogueProfile::BusinessUser);
        assert!(err.is_ok());
    }

    #[test]
    fn file_overlay_merges_over_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(
            &path,
            r#"{"catalog": {"max_actions_without_approval": 1}}"#,
        )
        .unwrap();
        let p = Policy::load(Some(&path)).unwrap();
        assert!(p.from_file);
        assert_eq!(p.catalog.max_actions_without_approval, 1);
        // Untouched sections retain built-in values.
        assert!(p.catalog.forbid_plaintext_secrets);
    }
}
