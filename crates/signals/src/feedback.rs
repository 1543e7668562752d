//! Feedback record ingestion (SPEC_FULL §4, resolved open question: `score`
//! is accepted as a literal value in `0..=5`, `0` included).

use event_log::{EventLogError, JsonlStream};
use gov_core::FeedbackChannel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised recording feedback.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// `score` was outside `0..=5`.
    #[error("feedback score {0} is outside 0..=5")]
    ScoreOutOfRange(u8),
    /// Appending the record failed.
    #[error("feedback log: {0}")]
    EventLog(#[from] EventLogError),
}

/// `{feedback_id, timestamp, user_id, session_id, score, comment?, tags[],
/// channel, intent_id?, plan_id?, execution_id?, product?, module?, page?,
/// scene_id?}` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// `fb-…` typed id.
    pub feedback_id: String,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
    /// Submitting user id.
    pub user_id: String,
    /// The session this feedback relates to.
    pub session_id: String,
    /// Score in `0..=5`, `0` a literal (low) score rather than "no opinion".
    pub score: u8,
    /// Optional free-text comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Submission channel.
    pub channel: FeedbackChannel,
    /// Related intent, if any.
    #[serde(default)]
    pub intent_id: Option<String>,
    /// Related plan, if any.
    #[serde(default)]
    pub plan_id: Option<String>,
    /// Related execution, if any.
    #[serde(default)]
    pub execution_id: Option<String>,
    /// Related product, if any.
    #[serde(default)]
    pub product: Option<String>,
    /// Related module, if any.
    #[serde(default)]
    pub module: Option<String>,
    /// Related page, if any.
    #[serde(default)]
    pub page: Option<String>,
    /// Related scene id, if any.
    #[serde(default)]
    pub scene_id: Option<String>,
}

/// Append a feedback record, rejecting `score > 5`.
pub fn record(
    log: &JsonlStream,
    record_id: u64,
    now_ms: u64,
    feedback: FeedbackRecord,
) -> Result<FeedbackRecord, FeedbackError> {
    if feedback.score > 5 {
        return Err(FeedbackError::ScoreOutOfRange(feedback.score));
    }
    log.append(record_id, now_ms, &feedback)?;
    Ok(feedback)
}
