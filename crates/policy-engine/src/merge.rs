//! Policy ← BuiltIn ⊕ File ⊕ ProfileOverlay merge rules (§4.1, §9).

use crate::dialogue::{DialoguePolicy, ProfileOverlay};
use crate::{Policy, PolicyFile};

/// Merge a loaded `PolicyFile` on top of the built-in `Policy`. Known
/// sections scalar-replace wholesale when present in the file; the
/// per-name maps (`runtime_modes`, `runtime_environments`, `ui_modes`,
/// `authorization_tiers`) merge key-by-key, and the dialogue policy's
/// `profiles` map merges key-by-key on top of the (possibly file-replaced)
/// dialogue section so a file that only overrides `catalog` does not lose
/// the built-in dialogue profiles.
pub(crate) fn merge_policy(mut builtin: Policy, file: PolicyFile) -> Policy {
    if let Some(cc) = file.context_contract {
        builtin.context_contract = cc;
    }
    if let Some(mut d) = file.dialogue {
        let mut profiles = builtin.dialogue.profiles;
        for (name, overlay) in d.profiles.drain() {
            profiles.insert(name, overlay);
        }
        d.profiles = profiles;
        builtin.dialogue = d;
    }
    if let Some(cat) = file.catalog {
        builtin.catalog = cat;
    }
    for (name, cfg) in file.runtime_modes {
        builtin.runtime_modes.insert(name, cfg);
    }
    for (name, cfg) in file.runtime_environments {
        builtin.runtime_environments.insert(name, cfg);
    }
    for (name, cfg) in file.ui_modes {
        builtin.ui_modes.insert(name, cfg);
    }
    for (profile, envs) in file.authorization_tiers {
        let slot = builtin.authorization_tiers.entry(profile).or_default();
        for (env, cfg) in envs {
            slot.insert(env, cfg);
        }
    }
    if let Some(gt) = file.governance_thresholds {
        builtin.governance_thresholds = gt;
    }
    builtin.from_file = true;
    builtin
}

/// Apply a profile overlay to the base dialogue policy: `length_policy`
/// replaces outright when present; the rule/template arrays append the
/// overlay's entries after the base's (§4.1).
pub(crate) fn apply_profile_overlay(base: &DialoguePolicy, overlay: &ProfileOverlay) -> DialoguePolicy {
    let mut merged = base.clone();
    if let Some(lp) = overlay.length_policy {
        merged.length_policy = lp;
    }
    merged.deny_patterns.extend(overlay.deny_patterns.iter().cloned());
    merged.clarify_patterns.extend(overlay.clarify_patterns.iter().cloned());
    merged.response_rules.extend(overlay.response_rules.iter().cloned());
    merged.clarification_templates.extend(overlay.clarification_templates.iter().cloned());
    merged
}
