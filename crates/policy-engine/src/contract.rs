//! `ContextContract` (§3) used by `context-bridge` (C2) to validate a
//! normalized page context.

use serde::{Deserialize, Serialize};

/// `{version, required_fields, optional_fields, max_field_count,
/// max_payload_kb, sensitive_key_patterns, forbidden_keys}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextContract {
    /// Contract schema version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Field names that must be present and non-empty.
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Field names that may be present.
    #[serde(default)]
    pub optional_fields: Vec<String>,
    /// Maximum number of fields a context may carry.
    #[serde(default = "default_max_field_count")]
    pub max_field_count: usize,
    /// Maximum serialized payload size, in kilobytes.
    #[serde(default = "default_max_payload_kb")]
    pub max_payload_kb: usize,
    /// Case-insensitive substrings that mark a field name as sensitive.
    #[serde(default)]
    pub sensitive_key_patterns: Vec<String>,
    /// Key names that must never appear anywhere in the context.
    #[serde(default)]
    pub forbidden_keys: Vec<String>,
}

fn default_version() -> String {
    "1".to_string()
}
fn default_max_field_count() -> usize {
    64
}
fn default_max_payload_kb() -> usize {
    64
}

impl Default for ContextContract {
    fn default() -> Self {
        Self {
            version: default_version(),
            required_fields: vec!["product".into(), "module".into(), "page".into()],
            optional_fields: vec!["entity".into(), "scene_id".into(), "workflow_node".into()],
            max_field_count: default_max_field_count(),
            max_payload_kb: default_max_payload_kb(),
            sensitive_key_patterns: vec![
                "password".into(),
                "secret".into(),
                "token".into(),
                "credential".into(),
                "ssn".into(),
                "api_key".into(),
            ],
            forbidden_keys: vec!["__proto__".into()],
        }
    }
}
