//! Phased remediation / batch runner (SPEC_FULL §4): drives a list of
//! session directories through a caller-supplied runner with bounded
//! parallelism, phased high-risk-first then medium, and a cooldown between
//! phases. Low-risk sessions are not phase-gated (§4.12's auto-approve/
//! auto-execute fast path handles those outside this runner) and are
//! rejected by [`run_batch`].
//!
//! The runner is generic over the work item's execution (a caller-supplied
//! async closure) rather than calling the orchestrator directly, keeping
//! this crate free of a dependency cycle with it.

use gov_core::RiskLevel;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;

/// One unit of phased remediation work.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// The session directory to remediate.
    pub session_dir: String,
    /// The risk level driving which phase this item runs in.
    pub risk_level: RiskLevel,
}

/// The result of running one [`WorkItem`].
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    /// The session directory that was run.
    pub session_dir: String,
    /// Whether the runner returned success.
    pub success: bool,
    /// The runner's error message, if it failed.
    pub error: Option<String>,
}

/// Batch runner tuning.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Maximum number of items run concurrently within a phase.
    pub max_concurrency: usize,
    /// Pause applied between the high-risk and medium-risk phases.
    pub cooldown: Duration,
    /// When `false`, a failure within a phase stops that phase immediately
    /// (remaining items in the phase are left unrun); subsequent phases are
    /// skipped. When `true`, every item runs regardless of earlier failures.
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { max_concurrency: 4, cooldown: Duration::from_secs(30), continue_on_error: false }
    }
}

/// The full batch run's outcome.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Outcomes from the high-risk phase, in completion order.
    pub high_risk: Vec<ItemOutcome>,
    /// Outcomes from the medium-risk phase, in completion order.
    pub medium_risk: Vec<ItemOutcome>,
    /// `true` if every attempted item succeeded and no phase was aborted
    /// early by a failure under `continue_on_error = false`.
    pub all_succeeded: bool,
}

async fn run_phase<F, Fut>(items: Vec<WorkItem>, options: BatchOptions, runner: &F) -> (Vec<ItemOutcome>, bool)
where
    F: Fn(WorkItem) -> Fut,
    Fut: Future<Output = Result<(), String>> + Send + 'static,
{
    let mut outcomes = Vec::with_capacity(items.len());
    let mut aborted = false;
    let mut pending = items.into_iter();
    let mut set: JoinSet<ItemOutcome> = JoinSet::new();

    let spawn_next = |set: &mut JoinSet<ItemOutcome>, pending: &mut std::vec::IntoIter<WorkItem>| {
        if let Some(item) = pending.next() {
            let fut = runner(item.clone());
            set.spawn(async move {
                match fut.await {
                    Ok(()) => ItemOutcome { session_dir: item.session_dir, success: true, error: None },
                    Err(e) => ItemOutcome { session_dir: item.session_dir, success: false, error: Some(e) },
                }
            });
            true
        } else {
            false
        }
    };

    for _ in 0..options.max_concurrency {
        spawn_next(&mut set, &mut pending);
    }

    while let Some(joined) = set.join_next().await {
        let outcome = joined.expect("batch runner task panicked");
        let failed = !outcome.success;
        outcomes.push(outcome);
        if failed && !options.continue_on_error {
            aborted = true;
            break;
        }
        spawn_next(&mut set, &mut pending);
    }

    (outcomes, aborted)
}

/// Run `items` in two phases, high-risk first then medium-risk, with
/// `options.cooldown` between them. Items are split by [`RiskLevel`]; any
/// [`RiskLevel::Low`] item is dropped (it belongs to the auto-approve fast
/// path, not this runner).
pub async fn run_batch<F, Fut>(items: Vec<WorkItem>, options: BatchOptions, runner: F) -> BatchReport
where
    F: Fn(WorkItem) -> Fut,
    Fut: Future<Output = Result<(), String>> + Send + 'static,
{
    let high: Vec<WorkItem> = items.iter().filter(|i| i.risk_level == RiskLevel::High).cloned().collect();
    let medium: Vec<WorkItem> = items.into_iter().filter(|i| i.risk_level == RiskLevel::Medium).collect();

    let (high_risk, high_aborted) = run_phase(high, options, &runner).await;

    if high_aborted {
        return BatchReport { high_risk, medium_risk: Vec::new(), all_succeeded: false };
    }

    if !medium.is_empty() {
        tokio::time::sleep(options.cooldown).await;
    }

    let (medium_risk, medium_aborted) = run_phase(medium, options, &runner).await;
    let all_succeeded = !medium_aborted && high_risk.iter().chain(medium_risk.iter()).all(|o| o.success);

    BatchReport { high_risk, medium_risk, all_succeeded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn item(dir: &str, risk: RiskLevel) -> WorkItem {
        WorkItem { session_dir: dir.to_string(), risk_level: risk }
    }

    #[tokio::test]
    async fn runs_high_before_medium_with_no_cooldown_when_medium_empty() {
        let items = vec![item("s1", RiskLevel::High), item("s2", RiskLevel::High)];
        let options = BatchOptions { max_concurrency: 2, cooldown: Duration::from_secs(999), continue_on_error: true };
        let report = run_batch(items, options, |w| async move {
            let _ = w;
            Ok(())
        })
        .await;
        assert_eq!(report.high_risk.len(), 2);
        assert!(report.medium_risk.is_empty());
        assert!(report.all_succeeded);
    }

    #[tokio::test]
    async fn low_risk_items_are_dropped() {
        let items = vec![item("s1", RiskLevel::Low)];
        let report = run_batch(items, BatchOptions::default(), |w| async move {
            let _ = w;
            Ok(())
        })
        .await;
        assert!(report.high_risk.is_empty() && report.medium_risk.is_empty());
    }

    #[tokio::test]
    async fn abort_on_error_skips_medium_phase() {
        let items = vec![item("s1", RiskLevel::High), item("s2", RiskLevel::Medium)];
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let options = BatchOptions { max_concurrency: 1, cooldown: Duration::from_millis(1), continue_on_error: false };
        let report = run_batch(items, options, move |w| {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if w.risk_level == RiskLevel::High {
                    Err("boom".to_string())
                } else {
                    Ok(())
                }
            }
        })
        .await;
        assert!(!report.all_succeeded);
        assert!(report.medium_risk.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
