//! Validation of raw judge output.
//!
//! Judges answer with loosely typed JSON. Each [`RawJudgment`] is coerced
//! into a [`Judgment`] here or rejected with a [`JudgmentError`]; nothing
//! unvalidated reaches the traversal.

use crate::config::MAX_CONFIDENCE;
use knowbot_language_model::RawJudgment;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What the judge wants done with a node that cleared the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeAction {
    /// The node is sufficient as-is
    Accept,
    /// Look at the node's children instead
    Descend,
}

/// A validated judgment for one candidate of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgment {
    /// Position of the candidate within its batch (0-based)
    pub index: usize,
    pub confidence: u8,
    pub action: JudgeAction,
    pub reason: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JudgmentError {
    #[error("judgment has no node id")]
    MissingNodeId,

    #[error("unknown node id {0}")]
    UnknownNodeId(String),

    #[error("judgment has no confidence score")]
    MissingScore,

    #[error("confidence score is not a number: {0}")]
    InvalidScore(String),

    #[error("confidence score {0} outside 0-100")]
    ScoreOutOfRange(f64),

    #[error("unrecognized action {0}")]
    InvalidAction(String),
}

/// Id the judge must echo back for the candidate at `index`
pub fn batch_node_id(index: usize) -> String {
    (index + 1).to_string()
}

/// Validate one raw judgment against a batch of `batch_len` candidates
pub fn validate_judgment(raw: &RawJudgment, batch_len: usize) -> Result<Judgment, JudgmentError> {
    let index = coerce_index(raw.node_id.as_ref(), batch_len)?;
    let confidence = coerce_score(raw.confidence_score.as_ref())?;
    let action = coerce_action(raw.action.as_ref())?;

    Ok(Judgment {
        index,
        confidence,
        action,
        reason: raw.reason_text(),
    })
}

/// Validate a batch response: one slot per candidate, `None` where the
/// judge gave no usable judgment. The first valid judgment for an id wins.
pub fn validate_batch(raw: &[RawJudgment], batch_len: usize) -> Vec<Option<Judgment>> {
    let mut slots: Vec<Option<Judgment>> = vec![None; batch_len];
    for item in raw {
        match validate_judgment(item, batch_len) {
            Ok(judgment) => {
                let slot = &mut slots[judgment.index];
                if slot.is_none() {
                    *slot = Some(judgment);
                } else {
                    debug!("Ignoring duplicate judgment for node {}", judgment.index + 1);
                }
            }
            Err(err) => debug!("Ignoring invalid judgment: {err}"),
        }
    }
    slots
}

fn coerce_index(value: Option<&Value>, batch_len: usize) -> Result<usize, JudgmentError> {
    let raw = match value {
        None | Some(Value::Null) => return Err(JudgmentError::MissingNodeId),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(other) => return Err(JudgmentError::UnknownNodeId(other.to_string())),
    };

    match raw.parse::<usize>() {
        Ok(id) if (1..=batch_len).contains(&id) => Ok(id - 1),
        _ => Err(JudgmentError::UnknownNodeId(raw)),
    }
}

fn coerce_score(value: Option<&Value>) -> Result<u8, JudgmentError> {
    let score = match value {
        None | Some(Value::Null) => return Err(JudgmentError::MissingScore),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| JudgmentError::InvalidScore(number.to_string()))?,
        Some(Value::String(text)) => {
            let trimmed = text.trim().trim_end_matches('%').trim();
            trimmed
                .parse::<f64>()
                .map_err(|_| JudgmentError::InvalidScore(text.clone()))?
        }
        Some(other) => return Err(JudgmentError::InvalidScore(other.to_string())),
    };

    if !score.is_finite() || !(0.0..=f64::from(MAX_CONFIDENCE)).contains(&score) {
        return Err(JudgmentError::ScoreOutOfRange(score));
    }
    Ok(score.round() as u8)
}

fn coerce_action(value: Option<&Value>) -> Result<JudgeAction, JudgmentError> {
    let text = match value {
        None | Some(Value::Null) => return Ok(JudgeAction::Descend),
        Some(Value::String(text)) => text.trim().to_lowercase(),
        Some(other) => return Err(JudgmentError::InvalidAction(other.to_string())),
    };

    match text.as_str() {
        "" => Ok(JudgeAction::Descend),
        "accept" | "select" | "sufficient" | "stop" => Ok(JudgeAction::Accept),
        "descend" | "expand" | "explore" => Ok(JudgeAction::Descend),
        drill if drill.starts_with("drill") => Ok(JudgeAction::Descend),
        _ => Err(JudgmentError::InvalidAction(text)),
    }
}
