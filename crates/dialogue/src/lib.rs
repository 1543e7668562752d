//! Dialogue Governor (C3): screens a normalized goal against deny/clarify
//! regex policy and length bounds (§4.3).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use gov_core::decision::dedup_reasons;
use policy_engine::DialoguePolicy;
use serde::Serialize;

/// `allow | clarify | deny` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueDecision {
    /// The goal passes screening unchanged.
    Allow,
    /// The goal needs clarification before proceeding.
    Clarify,
    /// The goal is refused outright.
    Deny,
}

/// Minimal page-context fields the dialogue governor reasons about, to
/// decide whether a context-driven clarification question is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextHint<'a> {
    /// The context's `module`, if known.
    pub module: Option<&'a str>,
    /// The context's `page`, if known.
    pub page: Option<&'a str>,
}

/// The dialogue governor's output (§4.3).
#[derive(Debug, Clone, Serialize)]
pub struct DialogueOutcome {
    /// The screening decision.
    pub decision: DialogueDecision,
    /// Deduplicated human-readable reasons.
    pub reasons: Vec<String>,
    /// Deny patterns that matched, if any.
    pub deny_hits: Vec<String>,
    /// Clarify patterns that matched, if any.
    pub clarify_hits: Vec<String>,
    /// At most 2 clarification questions, context-driven ones first.
    pub clarification_questions: Vec<String>,
    /// Response-rule labels carried from the resolved policy.
    pub response_rules: Vec<String>,
}

fn normalize_goal(goal: &str) -> String {
    goal.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Screen `goal` (raw, pre-normalization) against the resolved dialogue
/// policy and optional context hints (§4.3).
#[must_use]
pub fn govern(goal: &str, hint: ContextHint<'_>, policy: &DialoguePolicy) -> DialogueOutcome {
    let normalized = normalize_goal(goal);
    let char_len = normalized.chars().count();
    let tokens = normalized.split_whitespace().filter(|t| !t.is_empty()).count();

    let length_ok = char_len >= policy.length_policy.min_chars
        && char_len <= policy.length_policy.max_chars
        && tokens >= policy.length_policy.min_significant_tokens;

    let deny_hits: Vec<String> = policy
        .compiled_deny()
        .iter()
        .filter(|p| p.regex.is_match(&normalized))
        .map(|p| p.pattern.clone())
        .collect();

    if !deny_hits.is_empty() {
        let reasons = dedup_reasons(
            deny_hits.iter().map(|h| format!("deny pattern matched: {h}")).collect(),
        );
        return DialogueOutcome {
            decision: DialogueDecision::Deny,
            reasons,
            deny_hits,
            clarify_hits: Vec::new(),
            clarification_questions: Vec::new(),
            response_rules: policy.response_rules.clone(),
        };
    }

    let clarify_hits: Vec<String> = policy
        .compiled_clarify()
        .iter()
        .filter(|p| p.regex.is_match(&normalized))
        .map(|p| p.pattern.clone())
        .collect();

    if !clarify_hits.is_empty() || !length_ok {
        let mut reasons: Vec<String> = clarify_hits
            .iter()
            .map(|h| format!("clarify pattern matched: {h}"))
            .collect();
        if !length_ok {
            reasons.push("goal text too short or underspecified".to_string());
        }

        let mut questions = Vec::new();
        if hint.module.is_none() || hint.page.is_none() {
            questions.push("Which module or page does this change affect?".to_string());
        }
        for tmpl in &policy.clarification_templates {
            if questions.len() >= 2 {
                break;
            }
            if !questions.contains(tmpl) {
                questions.push(tmpl.clone());
            }
        }
        questions.truncate(2);

        return DialogueOutcome {
            decision: DialogueDecision::Clarify,
            reasons: dedup_reasons(reasons),
            deny_hits: Vec::new(),
            clarify_hits,
            clarification_questions: questions,
            response_rules: policy.response_rules.clone(),
        };
    }

    DialogueOutcome {
        decision: DialogueDecision::Allow,
        reasons: Vec::new(),
        deny_hits: Vec::new(),
        clarify_hits: Vec::new(),
        clarification_questions: Vec::new(),
        response_rules: policy.response_rules.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_engine::Policy;

    fn policy_for(profile: gov_core::DialogueProfile) -> DialoguePolicy {
        Policy::load(None).unwrap().resolve_dialogue_profile(profile).unwrap()
    }

    #[test]
    fn deny_pattern_short_circuits() {
        let p = policy_for(gov_core::DialogueProfile::BusinessUser);
        let out = govern("dump all passwords for audit", ContextHint::default(), &p);
        assert_eq!(out.decision, DialogueDecision::Deny);
        assert!(!out.deny_hits.is_empty());
    }

    #[test]
    fn short_goal_triggers_clarify_with_at_most_two_questions() {
        let p = policy_for(gov_core::DialogueProfile::BusinessUser);
        let out = govern("fix it", ContextHint::default(), &p);
        assert_eq!(out.decision, DialogueDecision::Clarify);
        assert!(out.clarification_questions.len() <= 2);
    }

    #[test]
    fn well_formed_goal_is_allowed() {
        let p = policy_for(gov_core::DialogueProfile::SystemMaintainer);
        let out = govern(
            "Adjust order screen field layout for clearer input flow",
            ContextHint { module: Some("orders"), page: Some("order-list") },
            &p,
        );
        assert_eq!(out.decision, DialogueDecision::Allow);
    }
}
