//! Per-session artifact paths under `<out_dir>/<session_id>/`, named
//! exactly as the wire-protocol artifact layout requires.

use std::path::{Path, PathBuf};

/// Every artifact path for one session, resolved once per run.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    dir: PathBuf,
}

impl SessionPaths {
    /// Resolve the session directory `<out_dir>/<session_id>/`.
    #[must_use]
    pub fn new(out_dir: &Path, session_id: &str) -> Self {
        Self { dir: out_dir.join(session_id) }
    }

    /// The session directory itself.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// `interactive-page-context.normalized.json`
    #[must_use]
    pub fn page_context(&self) -> PathBuf {
        self.file("interactive-page-context.normalized.json")
    }

    /// `interactive-context-bridge.json`
    #[must_use]
    pub fn context_bridge(&self) -> PathBuf {
        self.file("interactive-context-bridge.json")
    }

    /// `interactive-dialogue-governance.json`
    #[must_use]
    pub fn dialogue_governance(&self) -> PathBuf {
        self.file("interactive-dialogue-governance.json")
    }

    /// `interactive-change-intent.json`
    #[must_use]
    pub fn change_intent(&self) -> PathBuf {
        self.file("interactive-change-intent.json")
    }

    /// `interactive-page-explain.md`
    #[must_use]
    pub fn page_explain(&self) -> PathBuf {
        self.file("interactive-page-explain.md")
    }

    /// `interactive-copilot-audit.jsonl`
    #[must_use]
    pub fn copilot_audit(&self) -> PathBuf {
        self.file("interactive-copilot-audit.jsonl")
    }

    /// `interactive-change-plan.generated.json`
    #[must_use]
    pub fn change_plan(&self) -> PathBuf {
        self.file("interactive-change-plan.generated.json")
    }

    /// `interactive-change-plan.generated.md`
    #[must_use]
    pub fn change_plan_md(&self) -> PathBuf {
        self.file("interactive-change-plan.generated.md")
    }

    /// `interactive-change-plan-gate.json`
    #[must_use]
    pub fn plan_gate(&self) -> PathBuf {
        self.file("interactive-change-plan-gate.json")
    }

    /// `interactive-change-plan-gate.md`
    #[must_use]
    pub fn plan_gate_md(&self) -> PathBuf {
        self.file("interactive-change-plan-gate.md")
    }

    /// `interactive-runtime-policy.json`
    #[must_use]
    pub fn runtime_policy(&self) -> PathBuf {
        self.file("interactive-runtime-policy.json")
    }

    /// `interactive-authorization-tier.json`
    #[must_use]
    pub fn authorization_tier(&self) -> PathBuf {
        self.file("interactive-authorization-tier.json")
    }

    /// `interactive-approval-state.json`
    #[must_use]
    pub fn approval_state(&self) -> PathBuf {
        self.file("interactive-approval-state.json")
    }

    /// `interactive-approval-events.jsonl`
    #[must_use]
    pub fn approval_events(&self) -> PathBuf {
        self.file("interactive-approval-events.jsonl")
    }

    /// `interactive-moqui-adapter.json`
    #[must_use]
    pub fn adapter(&self) -> PathBuf {
        self.file("interactive-moqui-adapter.json")
    }

    /// `interactive-execution-ledger.jsonl`
    #[must_use]
    pub fn execution_ledger(&self) -> PathBuf {
        self.file("interactive-execution-ledger.jsonl")
    }

    /// `interactive-work-order.json`
    #[must_use]
    pub fn work_order(&self) -> PathBuf {
        self.file("interactive-work-order.json")
    }

    /// `interactive-work-order.md`
    #[must_use]
    pub fn work_order_md(&self) -> PathBuf {
        self.file("interactive-work-order.md")
    }

    /// `interactive-customization-loop.summary.json`
    #[must_use]
    pub fn summary(&self) -> PathBuf {
        self.file("interactive-customization-loop.summary.json")
    }

    /// `interactive-signals.jsonl` (per-session copy; the global stream
    /// lives at `<out_dir>/interactive-signals.jsonl`, a sibling of every
    /// session directory, for `gov report --signals-dir` to scan).
    #[must_use]
    pub fn signals(&self) -> PathBuf {
        self.file("interactive-signals.jsonl")
    }

    /// `interactive-user-feedback.jsonl`
    #[must_use]
    pub fn feedback(&self) -> PathBuf {
        self.file("interactive-user-feedback.jsonl")
    }
}
