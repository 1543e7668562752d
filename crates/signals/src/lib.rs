//! Signals & Governance Reporter (C13, §4.13): emits one append-only signal
//! per gating-stage decision, ingests user feedback, aggregates both into a
//! governance report with threshold-based alerting, and drives phased
//! remediation across many sessions.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod feedback;
mod report;
mod signal;

pub use batch::{run_batch, BatchOptions, BatchReport, ItemOutcome, WorkItem};
pub use feedback::{record, FeedbackError, FeedbackRecord};
pub use report::{
    filter_feedback, filter_signals, generate, Alert, AlertSeverity, BusinessModeBreakdown,
    ExecutionCounts, GovernanceReport, MatrixBreakdown, Metrics, ReportInputs, ReportStatus,
    ReportSummary, StageBreakdown, Window,
};
pub use signal::{emit, Signal, SignalStage};
