//! `DialoguePolicy` (§3) used by `dialogue` (C3) to screen goal text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// `{min_chars, max_chars, min_significant_tokens}` (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LengthPolicy {
    /// Minimum character length of the (trimmed, collapsed) goal text.
    pub min_chars: usize,
    /// Maximum character length.
    pub max_chars: usize,
    /// Minimum number of whitespace-split non-empty tokens.
    pub min_significant_tokens: usize,
}

impl LengthPolicy {
    /// Replace individual fields with `other`'s values when they are
    /// "finite" (i.e. always, since these are plain integers; the clause
    /// exists so a profile overlay's absent fields fall back instead of
    /// zeroing out the base, see §4.1 / §9 open question on
    /// `min_significant_tokens`).
    #[must_use]
    pub fn replace_finite(self, other: Option<LengthPolicy>) -> Self {
        other.unwrap_or(self)
    }
}

/// A regex rule paired with its lazily-compiled form. Deserializes from a
/// plain string; compilation happens once when the policy is resolved for a
/// profile, per the "compile lazily... store compiled regexes alongside the
/// Policy value" design note (§9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule(pub String);

/// A pattern rule plus its compiled regex, used once a profile has been
/// resolved. Unparsable patterns are dropped with a warning (§7).
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// The raw pattern string, kept for audit output.
    pub pattern: String,
    /// The compiled, case-insensitive regex.
    pub regex: Arc<regex::Regex>,
}

/// `{version, mode, default_profile, length_policy, deny_patterns[],
/// clarify_patterns[], response_rules[], clarification_templates[],
/// profiles{name→overlay}}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialoguePolicy {
    /// Dialogue policy schema version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Governance mode label, carried through for audit only.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Profile used when the caller does not select one.
    #[serde(default = "default_profile_name")]
    pub default_profile: String,
    /// Base length policy.
    pub length_policy: LengthPolicy,
    /// Base deny patterns (regex, matched case-insensitively).
    #[serde(default)]
    pub deny_patterns: Vec<PatternRule>,
    /// Base clarify patterns.
    #[serde(default)]
    pub clarify_patterns: Vec<PatternRule>,
    /// Response-rule labels surfaced alongside a decision.
    #[serde(default)]
    pub response_rules: Vec<String>,
    /// Clarification question templates, used when context is missing.
    #[serde(default)]
    pub clarification_templates: Vec<String>,
    /// Named profile overlays.
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverlay>,
}

/// A profile overlay: scalar fields replace the base when present; rule and
/// template arrays append on top of the base (§4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverlay {
    /// Replaces the base length policy outright when present.
    #[serde(default)]
    pub length_policy: Option<LengthPolicy>,
    /// Appended to the base deny patterns.
    #[serde(default)]
    pub deny_patterns: Vec<PatternRule>,
    /// Appended to the base clarify patterns.
    #[serde(default)]
    pub clarify_patterns: Vec<PatternRule>,
    /// Appended to the base response rules.
    #[serde(default)]
    pub response_rules: Vec<String>,
    /// Appended to the base clarification templates.
    #[serde(default)]
    pub clarification_templates: Vec<String>,
}

fn default_version() -> String {
    "1".to_string()
}
fn default_mode() -> String {
    "standard".to_string()
}
fn default_profile_name() -> String {
    "business-user".to_string()
}

impl DialoguePolicy {
    /// Compile `deny_patterns` into usable regexes, dropping unparsable
    /// ones.
    #[must_use]
    pub fn compiled_deny(&self) -> Vec<CompiledPattern> {
        compile_all(&self.deny_patterns)
    }

    /// Compile `clarify_patterns` into usable regexes, dropping unparsable
    /// ones.
    #[must_use]
    pub fn compiled_clarify(&self) -> Vec<CompiledPattern> {
        compile_all(&self.clarify_patterns)
    }
}

fn compile_all(rules: &[PatternRule]) -> Vec<CompiledPattern> {
    rules
        .iter()
        .filter_map(|r| {
            crate::try_compile(&r.0)
                .map(|re| CompiledPattern { pattern: r.0.clone(), regex: Arc::new(re) })
        })
        .collect()
}
