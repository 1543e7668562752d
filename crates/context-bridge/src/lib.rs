//! Context Bridge (C2): normalizes a raw provider payload into a canonical
//! [`PageContext`] and validates it against the loaded [`ContextContract`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

use gov_core::GovError;
use policy_engine::ContextContract;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The provider dialect a raw payload was produced by (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// The Moqui ERP/BPM runtime's native payload shape.
    Moqui,
    /// A dialect-neutral payload already close to canonical shape.
    Generic,
}

impl Dialect {
    /// Parse a dialect token from a CLI flag or config value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "moqui" => Self::Moqui,
            _ => Self::Generic,
        }
    }
}

/// One field in a [`PageContext`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Field name, unique (case-insensitively) within the context.
    pub name: String,
    /// Declared field type, e.g. `"string"`, `"number"`, `"boolean"`.
    #[serde(rename = "type")]
    pub field_type: String,
    /// `true` if this field's value must never be emitted in artifacts.
    pub sensitive: bool,
    /// Optional human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Canonical, dialect-neutral page context (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    /// Product line, e.g. `"moqui"`.
    pub product: String,
    /// Module within the product.
    pub module: String,
    /// Page within the module.
    pub page: String,
    /// Optional domain entity the page operates on.
    #[serde(default)]
    pub entity: Option<String>,
    /// Optional UI scene identifier.
    #[serde(default)]
    pub scene_id: Option<String>,
    /// Optional workflow node identifier.
    #[serde(default)]
    pub workflow_node: Option<String>,
    /// Normalized, deduplicated field list.
    pub fields: Vec<Field>,
    /// Free-form current-state label supplied by the provider.
    pub current_state: String,
    /// Scene-workspace ontology block, if supplied.
    #[serde(default)]
    pub scene_workspace: Option<Value>,
    /// Assistant-panel session metadata, if supplied.
    #[serde(default)]
    pub assistant_panel: Option<Value>,
}

/// Outcome of bridging one raw payload (§4.2).
#[derive(Debug, Clone, Serialize)]
pub struct BridgeReport {
    /// The dialect the payload was interpreted as.
    pub from_dialect: String,
    /// `true` when the contract check ran in strict mode.
    pub strict: bool,
    /// Non-fatal issues found during validation (always populated when
    /// `strict = false` and something failed; never populated on success).
    pub issues: Vec<String>,
    /// Number of fields after dedup/prune.
    pub field_count: usize,
    /// Number of fields marked sensitive.
    pub sensitive_field_count: usize,
}

const SENSITIVE_KEYWORDS: &[&str] =
    &["password", "secret", "token", "credential", "ssn", "api_key", "apikey"];

/// Normalize `raw` (in the given dialect) into a [`PageContext`], then
/// validate it against `contract`. On failure with `strict = true`, returns
/// `Err(GovError::ContractViolation)` listing every issue; with
/// `strict = false`, returns `Ok` with `issues` populated instead (§4.2).
pub fn bridge(
    raw: &Value,
    dialect: Dialect,
    contract: &ContextContract,
    strict: bool,
) -> Result<(PageContext, BridgeReport), GovError> {
    let context = normalize(raw, dialect);
    let issues = validate(&context, contract);

    let report = BridgeReport {
        from_dialect: match dialect {
            Dialect::Moqui => "moqui".to_string(),
            Dialect::Generic => "generic".to_string(),
        },
        strict,
        issues: issues.clone(),
        field_count: context.fields.len(),
        sensitive_field_count: context.fields.iter().filter(|f| f.sensitive).count(),
    };

    if strict && !issues.is_empty() {
        return Err(GovError::ContractViolation(issues.join("; ")));
    }
    Ok((context, report))
}

fn normalize(raw: &Value, dialect: Dialect) -> PageContext {
    let get = |canonical: &str, moqui_alias: &str| -> String {
        let key = if dialect == Dialect::Moqui { moqui_alias } else { canonical };
        raw.get(key)
            .or_else(|| raw.get(canonical))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let product = get("product", "moqui_product");
    let module = get("module", "moqui_module");
    let page = get("page", "moqui_screen");
    let entity = non_empty(get("entity", "moqui_entity"));
    let scene_id = non_empty(get("scene_id", "moqui_scene_id"));
    let workflow_node = non_empty(get("workflow_node", "moqui_workflow_node"));
    let current_state = get("current_state", "moqui_state");

    let mut by_name: BTreeMap<String, Field> = BTreeMap::new();
    if let Some(arr) = raw.get("fields").and_then(Value::as_array) {
        for f in arr {
            let Some(name) = f.get("name").and_then(Value::as_str) else { continue };
            let lower = name.to_ascii_lowercase();
            let field_type =
                f.get("type").and_then(Value::as_str).unwrap_or("string").to_string();
            let explicit_sensitive =
                f.get("sensitive").and_then(Value::as_bool).unwrap_or(false);
            let keyword_sensitive =
                SENSITIVE_KEYWORDS.iter().any(|kw| lower.contains(kw));
            let description =
                f.get("description").and_then(Value::as_str).map(str::to_string);
            by_name.insert(
                lower,
                Field {
                    name: name.to_string(),
                    field_type,
                    sensitive: explicit_sensitive || keyword_sensitive,
                    description,
                },
            );
        }
    }

    PageContext {
        product,
        module,
        page,
        entity,
        scene_id,
        workflow_node,
        fields: by_name.into_values().collect(),
        current_state,
        scene_workspace: prune_empty(raw.get("scene_workspace").cloned()),
        assistant_panel: prune_empty(raw.get("assistant_panel").cloned()),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn prune_empty(v: Option<Value>) -> Option<Value> {
    match v {
        Some(Value::Object(m)) if m.is_empty() => None,
        Some(Value::Array(a)) if a.is_empty() => None,
        Some(Value::Null) => None,
        other => other,
    }
}

fn validate(ctx: &PageContext, contract: &ContextContract) -> Vec<String> {
    let mut issues = Vec::new();

    for required in &contract.required_fields {
        let present = match required.as_str() {
            "product" => !ctx.product.is_empty(),
            "module" => !ctx.module.is_empty(),
            "page" => !ctx.page.is_empty(),
            "entity" => ctx.entity.is_some(),
            "scene_id" => ctx.scene_id.is_some(),
            "workflow_node" => ctx.workflow_node.is_some(),
            other => ctx.fields.iter().any(|f| f.name.eq_ignore_ascii_case(other)),
        };
        if !present {
            issues.push(format!("required field missing: {required}"));
        }
    }

    if ctx.fields.len() > contract.max_field_count {
        issues.push(format!(
            "field count {} exceeds max_field_count {}",
            ctx.fields.len(),
            contract.max_field_count
        ));
    }

    if let Ok(bytes) = serde_json::to_vec(ctx) {
        let kb = bytes.len() / 1024;
        if kb > contract.max_payload_kb {
            issues.push(format!(
                "serialized payload {kb}KB exceeds max_payload_kb {}",
                contract.max_payload_kb
            ));
        }
    }

    for forbidden in &contract.forbidden_keys {
        if ctx.fields.iter().any(|f| f.name.eq_ignore_ascii_case(forbidden)) {
            issues.push(format!("forbidden key present: {forbidden}"));
        }
    }

    let mut nested_keys = Vec::new();
    if let Some(v) = &ctx.scene_workspace {
        collect_object_keys(v, &mut nested_keys);
    }
    if let Some(v) = &ctx.assistant_panel {
        collect_object_keys(v, &mut nested_keys);
    }
    for forbidden in &contract.forbidden_keys {
        if nested_keys.iter().any(|k| k.eq_ignore_ascii_case(forbidden)) {
            issues.push(format!("forbidden key present: {forbidden}"));
        }
    }

    issues
}

/// Recursively collect every object key in `value`, descending through
/// nested objects and arrays, so a forbidden key can't hide inside an
/// arbitrary `scene_workspace`/`assistant_panel` blob.
fn collect_object_keys(value: &Value, keys: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                keys.push(key.clone());
                collect_object_keys(val, keys);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_object_keys(item, keys)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedups_fields_by_lowercased_name() {
        let raw = json!({
            "product": "moqui", "module": "orders", "page": "order-list",
            "current_state": "draft",
            "fields": [
                {"name": "Email", "type": "string"},
                {"name": "email", "type": "string"},
            ]
        });
        let (ctx, _) = bridge(&raw, Dialect::Generic, &ContextContract::default(), true).unwrap();
        assert_eq!(ctx.fields.len(), 1);
    }

    #[test]
    fn marks_sensitive_by_keyword() {
        let raw = json!({
            "product": "moqui", "module": "orders", "page": "order-list",
            "current_state": "draft",
            "fields": [{"name": "api_token", "type": "string"}]
        });
        let (ctx, _) = bridge(&raw, Dialect::Generic, &ContextContract::default(), true).unwrap();
        assert!(ctx.fields[0].sensitive);
    }

    #[test]
    fn strict_failure_lists_missing_required_fields() {
        let raw = json!({"current_state": "draft"});
        let err = bridge(&raw, Dialect::Generic, &ContextContract::default(), true).unwrap_err();
        assert!(matches!(err, GovError::ContractViolation(_)));
    }

    #[test]
    fn non_strict_failure_returns_issues_without_error() {
        let raw = json!({"current_state": "draft"});
        let (_, report) =
            bridge(&raw, Dialect::Generic, &ContextContract::default(), false).unwrap();
        assert!(!report.issues.is_empty());
    }

    #[test]
    fn moqui_dialect_maps_aliased_keys() {
        let raw = json!({
            "moqui_product": "moqui", "moqui_module": "orders", "moqui_screen": "order-list",
            "moqui_state": "draft", "fields": []
        });
        let (ctx, _) = bridge(&raw, Dialect::Moqui, &ContextContract::default(), true).unwrap();
        assert_eq!(ctx.module, "orders");
        assert_eq!(ctx.page, "order-list");
    }

    #[test]
    fn forbidden_key_nested_inside_scene_workspace_fails_strict_validation() {
        let raw = json!({
            "product": "moqui", "module": "orders", "page": "order-list",
            "current_state": "draft", "fields": [],
            "scene_workspace": {"layout": {"__proto__": {"polluted": true}}},
        });
        let err = bridge(&raw, Dialect::Generic, &ContextContract::default(), true).unwrap_err();
        assert!(matches!(err, GovError::ContractViolation(_)));
    }
}
