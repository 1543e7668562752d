//! Intent Builder (C4): sanitizes the bridged context, derives priority and
//! risk hints, extracts constraints, and emits the immutable
//! [`ChangeIntent`] plus its Markdown explain and audit record (§4.4).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use context_bridge::PageContext;
use event_log::{EventLogError, JsonlStream, RecordId};
use gov_core::{hash::sha256_hex, ids, Priority, RiskLevel};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

const SENSITIVE_KEYWORDS: &[&str] =
    &["password", "secret", "token", "credential", "ssn", "api_key", "apikey"];

const HIGH_RISK_KEYWORDS: &[&str] = &[
    "delete", "drop", "permission", "privilege", "payment", "credential", "secret", "token",
];
const MEDIUM_RISK_KEYWORDS: &[&str] =
    &["approval", "workflow", "inventory", "customer", "order", "pricing", "refund"];

const HIGH_PRIORITY_KEYWORDS: &[&str] = &["urgent", "asap", "immediately", "critical"];
const LOW_PRIORITY_KEYWORDS: &[&str] = &["later", "eventually", "optional", "nice to have"];

/// `{product, module, page, entity?, scene_id?, workflow_node?, screen?,
/// component?}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRef {
    /// Product line.
    pub product: String,
    /// Module within the product.
    pub module: String,
    /// Page within the module.
    pub page: String,
    /// Domain entity, if any.
    #[serde(default)]
    pub entity: Option<String>,
    /// UI scene identifier, if any.
    #[serde(default)]
    pub scene_id: Option<String>,
    /// Workflow node identifier, if any.
    #[serde(default)]
    pub workflow_node: Option<String>,
    /// Screen identifier (reserved for UI-reported context), if any.
    #[serde(default)]
    pub screen: Option<String>,
    /// Component identifier (reserved for UI-reported context), if any.
    #[serde(default)]
    pub component: Option<String>,
}

/// Field/sensitivity/ontology counts included in the intent metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSummary {
    /// Total field count.
    pub field_count: usize,
    /// Fields marked sensitive.
    pub sensitive_field_count: usize,
    /// Ontology entity count, if the scene workspace declares one.
    pub ontology_entities: usize,
    /// Ontology relation count.
    pub ontology_relations: usize,
    /// Ontology business-rule count.
    pub ontology_business_rules: usize,
    /// Ontology decision-policy count.
    pub ontology_decision_policies: usize,
    /// Explorer-panel identifier count.
    pub explorer_panel_ids: usize,
    /// Assistant-panel identifier count.
    pub assistant_panel_ids: usize,
}

/// `{mode="read-only", risk_hint, context_summary, contract_validation}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentMetadata {
    /// Always `"read-only"`: intent construction never mutates the runtime.
    pub mode: String,
    /// Heuristic risk hint derived from goal/module/entity/contract issues.
    pub risk_hint: RiskLevel,
    /// Context field/ontology counts.
    pub context_summary: ContextSummary,
    /// Number of contract validation issues carried from the bridge report.
    pub contract_validation_issue_count: usize,
}

/// The immutable change intent (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeIntent {
    /// `intent-…` typed id.
    pub intent_id: String,
    /// Session this intent belongs to.
    pub session_id: String,
    /// The user who proposed the goal.
    pub user_id: String,
    /// Canonical context reference.
    pub context_ref: ContextRef,
    /// The end-user's (already dialogue-screened) business goal text.
    pub business_goal: String,
    /// Up to 8 deduplicated extracted constraints.
    pub constraints: Vec<String>,
    /// Derived priority.
    pub priority: Priority,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// Derived metadata block.
    pub metadata: IntentMetadata,
}

fn constraint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(must|cannot|without|need to|should)\b[^.;\n]*").unwrap()
    })
}

/// Recursively redact any value whose key (or an ancestor key) contains a
/// sensitive keyword, replacing it with the literal `"[REDACTED]"` (§4.4).
#[must_use]
pub fn sanitize(raw: &Value) -> Value {
    sanitize_inner(raw, false)
}

fn sanitize_inner(v: &Value, ancestor_sensitive: bool) -> Value {
    match v {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, val) in map {
                let key_sensitive =
                    SENSITIVE_KEYWORDS.iter().any(|kw| k.to_ascii_lowercase().contains(kw));
                let sensitive = ancestor_sensitive || key_sensitive;
                let replaced = if sensitive && !matches!(val, Value::Object(_) | Value::Array(_)) {
                    Value::String("[REDACTED]".to_string())
                } else {
                    sanitize_inner(val, sensitive)
                };
                out.insert(k.clone(), replaced);
            }
            Value::Object(out)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(|e| sanitize_inner(e, ancestor_sensitive)).collect())
        }
        _ if ancestor_sensitive => Value::String("[REDACTED]".to_string()),
        other => other.clone(),
    }
}

fn derive_priority(goal: &str) -> Priority {
    let lower = goal.to_ascii_lowercase();
    if HIGH_PRIORITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Priority::High
    } else if LOW_PRIORITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

fn derive_risk_hint(
    goal: &str,
    module: &str,
    entity: Option<&str>,
    contract_issue_count: usize,
) -> RiskLevel {
    let haystack =
        format!("{goal} {module} {}", entity.unwrap_or_default()).to_ascii_lowercase();
    if HIGH_RISK_KEYWORDS.iter().any(|k| haystack.contains(k)) || contract_issue_count > 0 {
        RiskLevel::High
    } else if MEDIUM_RISK_KEYWORDS.iter().any(|k| haystack.contains(k)) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn extract_constraints(goal: &str) -> Vec<String> {
    let mut out = Vec::new();
    for m in constraint_regex().find_iter(goal) {
        let trimmed = m.as_str().trim().to_string();
        if !trimmed.is_empty() && !out.contains(&trimmed) {
            out.push(trimmed);
        }
        if out.len() >= 8 {
            break;
        }
    }
    out
}

fn ontology_count(ctx: &PageContext, key: &str) -> usize {
    ctx.scene_workspace
        .as_ref()
        .and_then(|v| v.get(key))
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

fn panel_id_count(ctx: &PageContext, panel: &Value, key: &str) -> usize {
    let _ = ctx;
    panel.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}

/// Build the change intent for one session (§4.4). `now_iso` and
/// `intent_id` are injected so the caller (or tests) can pin determinism;
/// pass [`gov_core::ids::now_iso8601`] / [`gov_core::ids::new_intent_id`]
/// in production.
#[must_use]
pub fn build(
    session_id: &str,
    user_id: &str,
    ctx: &PageContext,
    contract_issue_count: usize,
    goal: &str,
    intent_id: String,
    created_at: String,
) -> ChangeIntent {
    let context_summary = ContextSummary {
        field_count: ctx.fields.len(),
        sensitive_field_count: ctx.fields.iter().filter(|f| f.sensitive).count(),
        ontology_entities: ontology_count(ctx, "entities"),
        ontology_relations: ontology_count(ctx, "relations"),
        ontology_business_rules: ontology_count(ctx, "business_rules"),
        ontology_decision_policies: ontology_count(ctx, "decision_policies"),
        explorer_panel_ids: ctx
            .scene_workspace
            .as_ref()
            .map_or(0, |v| panel_id_count(ctx, v, "explorer_ids")),
        assistant_panel_ids: ctx
            .assistant_panel
            .as_ref()
            .map_or(0, |v| panel_id_count(ctx, v, "ids")),
    };

    ChangeIntent {
        intent_id,
        session_id: session_id.to_string(),
        user_id: user_id.to_string(),
        context_ref: ContextRef {
            product: ctx.product.clone(),
            module: ctx.module.clone(),
            page: ctx.page.clone(),
            entity: ctx.entity.clone(),
            scene_id: ctx.scene_id.clone(),
            workflow_node: ctx.workflow_node.clone(),
            screen: None,
            component: None,
        },
        business_goal: goal.to_string(),
        constraints: extract_constraints(goal),
        priority: derive_priority(goal),
        created_at,
        metadata: IntentMetadata {
            mode: "read-only".to_string(),
            risk_hint: derive_risk_hint(goal, &ctx.module, ctx.entity.as_deref(), contract_issue_count),
            context_summary,
            contract_validation_issue_count: contract_issue_count,
        },
    }
}

/// Render the intent as a short Markdown "explain" document (§4.4).
#[must_use]
pub fn render_explain_markdown(intent: &ChangeIntent) -> String {
    let mut md = format!(
        "# Change Intent `{}`\n\n- Session: `{}`\n- Module/Page: `{}` / `{}`\n- Priority: `{:?}`\n- Risk hint: `{}`\n\n## Goal\n\n{}\n",
        intent.intent_id,
        intent.session_id,
        intent.context_ref.module,
        intent.context_ref.page,
        intent.priority,
        intent.metadata.risk_hint,
        intent.business_goal,
    );
    if !intent.constraints.is_empty() {
        md.push_str("\n## Constraints\n\n");
        for c in &intent.constraints {
            md.push_str(&format!("- {c}\n"));
        }
    }
    md
}

/// One line of the copilot audit trail: the intent id plus a SHA-256 hex
/// digest of the sanitized context (§4.4).
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// The intent this audit event covers.
    pub intent_id: String,
    /// Session id, carried for cross-stream correlation.
    pub session_id: String,
    /// SHA-256 hex digest of the canonical JSON of the sanitized context.
    pub sanitized_context_digest: String,
}

/// Sanitize `raw_context`, compute its digest, and append one audit event
/// to `stream` (§4.4).
pub fn append_audit_event(
    stream: &JsonlStream,
    record_id: RecordId,
    ts_ms: u64,
    intent: &ChangeIntent,
    raw_context: &Value,
) -> Result<(Value, RecordId), EventLogError> {
    let sanitized = sanitize(raw_context);
    let canonical = serde_json::to_vec(&sanitized)?;
    let digest = sha256_hex(&canonical);
    let event = AuditEvent {
        intent_id: intent.intent_id.clone(),
        session_id: intent.session_id.clone(),
        sanitized_context_digest: digest,
    };
    let id = stream.append(record_id, ts_ms, &event)?;
    Ok((sanitized, id))
}

/// Convenience constructors for production (non-test) callers.
pub mod live {
    use super::ids;

    /// A fresh `intent-…` id.
    #[must_use]
    pub fn new_intent_id() -> String {
        ids::new_intent_id()
    }

    /// The current timestamp as RFC3339.
    #[must_use]
    pub fn now_iso8601() -> String {
        ids::now_iso8601()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_bridge::{Dialect};
    use policy_engine::ContextContract;
    use serde_json::json;

    fn sample_ctx() -> PageContext {
        let raw = json!({
            "product": "moqui", "module": "orders", "page": "order-list",
            "current_state": "draft",
            "fields": [{"name": "api_token", "type": "string"}, {"name": "note", "type": "string"}]
        });
        context_bridge::bridge(&raw, Dialect::Generic, &ContextContract::default(), false)
            .unwrap()
            .0
    }

    #[test]
    fn sanitize_redacts_sensitive_subtrees_recursively() {
        let raw = json!({"user": {"password": "hunter2", "name": "ok"}, "note": "keep"});
        let out = sanitize(&raw);
        assert_eq!(out["user"]["password"], json!("[REDACTED]"));
        assert_eq!(out["note"], json!("keep"));
    }

    #[test]
    fn risk_hint_high_on_forbidden_key_hit() {
        let ctx = sample_ctx();
        let intent = build("s1", "u1", &ctx, 1, "tweak layout", "intent-1".into(), "t".into());
        assert_eq!(intent.metadata.risk_hint, RiskLevel::High);
    }

    #[test]
    fn priority_high_on_urgent_keyword() {
        let ctx = sample_ctx();
        let intent = build("s1", "u1", &ctx, 0, "urgent: fix this now", "intent-1".into(), "t".into());
        assert_eq!(intent.priority, Priority::High);
    }

    #[test]
    fn constraints_capped_at_eight_and_deduplicated() {
        let goal = "must A, must A, cannot B, without C, need to D, should E, must F, cannot G, without H, need to I";
        let ctx = sample_ctx();
        let intent = build("s1", "u1", &ctx, 0, goal, "intent-1".into(), "t".into());
        assert!(intent.constraints.len() <= 8);
    }
}
