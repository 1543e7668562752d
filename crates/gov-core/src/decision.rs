//! The shared `{decision, reasons, violations}` shape (DESIGN NOTES §9:
//! "Polymorphism over decisions"). Every gating stage (plan gate, runtime
//! policy, authorization tier) produces one of these instead of free-form
//! JSON, so the orchestrator can combine decisions generically.

use crate::enums::Decision;
use serde::{Deserialize, Serialize};

/// Severity of a single failed check, mirrors the deny/review split used
/// throughout §4.6–§4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks unconditionally until resolved.
    Review,
    /// Blocks outright.
    Deny,
}

/// One failed (or evaluated) check contributing to a stage's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Stable identifier for the check, e.g. `"deny-action-types"`.
    pub id: String,
    /// Severity of the check when it fails.
    pub severity: Severity,
    /// Human-readable detail.
    pub detail: String,
}

/// Minimal interface shared by every stage that produces a gating decision.
/// Modeled as a trait (rather than duck-typed JSON) per the teacher's
/// emphasis on typed decision shapes over free-form maps.
pub trait StageOutcome {
    /// The stage's overall decision.
    fn decision(&self) -> Decision;
    /// Deduplicated human-readable reasons behind the decision.
    fn reasons(&self) -> &[String];
    /// The violations (failed or informative checks) behind the decision.
    fn violations(&self) -> &[Violation];
}

/// Deduplicate a reason list while preserving first-seen order, used by
/// every stage that accumulates reasons across checks.
pub fn dedup_reasons(reasons: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    reasons.into_iter().filter(|r| seen.insert(r.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_first_seen_order() {
        let out = dedup_reasons(vec!["a".into(), "b".into(), "a".into(), "c".into()]);
        assert_eq!(out, vec!["a".to_string(), "b".into(), "c".into()]);
    }
}
