//! Id and timestamp utilities shared by every stage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Next monotonic id for an append-only JSONL stream (starts at 1).
pub fn next_record_id() -> u64 {
    NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed)
}

/// Milliseconds since the UNIX epoch.
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64
}

/// Current time as an ISO-8601 UTC string (§6: "Timestamps are ISO-8601 UTC strings").
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Build a typed id of the form `<prefix>-<uuid>`, e.g. `intent-3fae...`.
fn typed_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// New `intent-…` id.
pub fn new_intent_id() -> String {
    typed_id("intent")
}

/// New `plan-…` id.
pub fn new_plan_id() -> String {
    typed_id("plan")
}

/// New `wo-…` id (work order).
pub fn new_work_order_id() -> String {
    typed_id("wo")
}

/// New `exec-…` id (execution record).
pub fn new_execution_id() -> String {
    typed_id("exec")
}

/// New `wf-…` id (approval workflow).
pub fn new_workflow_id() -> String {
    typed_id("wf")
}

/// New `fb-…` id (feedback record).
pub fn new_feedback_id() -> String {
    typed_id("fb")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_are_monotonic() {
        let a = next_record_id();
        let b = next_record_id();
        assert!(b > a);
    }

    #[test]
    fn typed_ids_carry_their_prefix() {
        assert!(new_intent_id().starts_with("intent-"));
        assert!(new_plan_id().starts_with("plan-"));
        assert!(new_work_order_id().starts_with("wo-"));
        assert!(new_execution_id().starts_with("exec-"));
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let ts = now_iso8601();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
