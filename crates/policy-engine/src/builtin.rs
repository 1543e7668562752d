//! Built-in default policy (§9: "the source defines 'built-in policy'
//! constants that merge with user JSON"). Kept as a pure constructor rather
//! than module-level mutable state.

use crate::{
    catalog::CatalogPolicy,
    contract::ContextContract,
    dialogue::{DialoguePolicy, LengthPolicy, PatternRule, ProfileOverlay},
    governance::GovernanceThresholds,
    runtime, tier, Policy,
};
use std::collections::HashMap;

/// Construct the built-in default policy. `from_file` is always `false`
/// here; callers set it when a file is merged on top.
#[must_use]
pub fn default_policy() -> Policy {
    Policy {
        from_file: false,
        context_contract: ContextContract::default(),
        dialogue: default_dialogue(),
        catalog: CatalogPolicy::default(),
        runtime_modes: runtime::default_modes(),
        runtime_environments: runtime::default_environments(),
        ui_modes: runtime::default_ui_modes(),
        authorization_tiers: tier::default_tiers(),
        governance_thresholds: GovernanceThresholds::default(),
    }
}

fn default_dialogue() -> DialoguePolicy {
    let mut profiles = HashMap::new();
    profiles.insert(
        "business-user".to_string(),
        ProfileOverlay {
            length_policy: Some(LengthPolicy { min_chars: 8, max_chars: 2000, min_significant_tokens: 3 }),
            deny_patterns: vec![],
            clarify_patterns: vec![PatternRule(r"\bhelp\b|\bwhat (can|should) i\b".into())],
            response_rules: vec!["business-tone".into()],
            clarification_templates: vec![],
        },
    );
    profiles.insert(
        "system-maintainer".to_string(),
        ProfileOverlay {
            length_policy: Some(LengthPolicy { min_chars: 4, max_chars: 4000, min_significant_tokens: 2 }),
            deny_patterns: vec![],
            clarify_patterns: vec![],
            response_rules: vec!["operator-tone".into()],
            clarification_templates: vec![],
        },
    );

    DialoguePolicy {
        version: "1".to_string(),
        mode: "standard".to_string(),
        default_profile: "business-user".to_string(),
        length_policy: LengthPolicy { min_chars: 10, max_chars: 2000, min_significant_tokens: 3 },
        deny_patterns: vec![
            PatternRule(r"\bdump (all )?passwords?\b".into()),
            PatternRule(r"\bexfiltrate\b".into()),
            PatternRule(r"\bdrop (the )?(database|table)s?\b".into()),
            PatternRule(r"\bbypass (security|authoriz\w+)\b".into()),
        ],
        clarify_patterns: vec![PatternRule(r"\b(fix|change|update) (it|this|that)\b".into())],
        response_rules: vec!["default-tone".into()],
        clarification_templates: vec![
            "Which module or page does this change affect?".into(),
            "Can you describe the specific field or rule to change?".into(),
        ],
        profiles,
    }
}
