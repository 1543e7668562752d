//! Small helpers for persisting per-session JSON/Markdown artifacts.

use gov_core::GovError;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// Pretty-print `value` as JSON and write it to `path`, creating parent
/// directories as needed. Always overwrites: every caller of this is a pure
/// function of already-persisted inputs, so recomputing and rewriting is
/// safe and gives a fresh timestamp rather than stale data.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), GovError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Write `text` verbatim to `path` (the Markdown artifacts).
pub fn write_text(path: &Path, text: &str) -> Result<(), GovError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// Read and parse `path` if it already exists, else `None`. Used by stages
/// whose work is stateful (the approval workflow, the execution ledger) to
/// resume rather than repeat a non-idempotent action (§4.12: "a re-run with
/// the same session_id resumes from the earliest missing artifact").
pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, GovError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}
