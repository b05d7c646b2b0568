use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title and abstract produced for one section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

impl SectionSummary {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
        }
    }
}

/// What a summary is computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryInput {
    /// Raw text of a leaf section
    Content(String),
    /// Summaries of an internal section's immediate children, in order
    ChildSummaries(Vec<SectionSummary>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    /// Existing heading text, if the section has a real one
    pub title_hint: Option<String>,
    pub input: SummaryInput,
}

impl SummaryRequest {
    pub fn content(title_hint: Option<String>, content: impl Into<String>) -> Self {
        Self {
            title_hint,
            input: SummaryInput::Content(content.into()),
        }
    }

    pub fn children(title_hint: Option<String>, children: Vec<SectionSummary>) -> Self {
        Self {
            title_hint,
            input: SummaryInput::ChildSummaries(children),
        }
    }
}

/// One node as presented to the relevance judge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateBrief {
    /// Identifier the judge must echo back
    pub node_id: String,
    pub title: String,
    pub summary: String,
    pub has_children: bool,
}

/// Unvalidated judgment exactly as the model returned it.
///
/// Models disagree on field names and value types, so every field is kept
/// as raw JSON and coerced by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJudgment {
    #[serde(default, alias = "id", alias = "node_id")]
    pub node_id: Option<Value>,

    #[serde(default, alias = "score", alias = "confidence", alias = "confidence_score")]
    pub confidence_score: Option<Value>,

    #[serde(default)]
    pub action: Option<Value>,

    #[serde(default)]
    pub reason: Option<Value>,
}

impl RawJudgment {
    pub fn new(node_id: impl Into<String>, confidence_score: u32, action: &str) -> Self {
        Self {
            node_id: Some(Value::String(node_id.into())),
            confidence_score: Some(Value::from(confidence_score)),
            action: Some(Value::String(action.to_string())),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(Value::String(reason.into()));
        self
    }

    /// Reason as text, whatever JSON type the model used
    pub fn reason_text(&self) -> Option<String> {
        match self.reason.as_ref()? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_raw_judgment_accepts_field_aliases() {
        let judgment: RawJudgment =
            serde_json::from_value(json!({"id": 3, "score": "72", "action": "Descend"}))
                .expect("deserialize");
        assert_eq!(judgment.node_id, Some(json!(3)));
        assert_eq!(judgment.confidence_score, Some(json!("72")));
        assert_eq!(judgment.action, Some(json!("Descend")));
        assert_eq!(judgment.reason_text(), None);
    }

    #[test]
    fn test_raw_judgment_camel_case() {
        let judgment: RawJudgment = serde_json::from_value(json!({
            "nodeId": "2",
            "confidenceScore": 55.5,
            "reason": ["mentions", "leave"]
        }))
        .expect("deserialize");
        assert_eq!(judgment.node_id, Some(json!("2")));
        assert_eq!(judgment.action, None);
        assert_eq!(judgment.reason_text().as_deref(), Some(r#"["mentions","leave"]"#));
    }

    #[test]
    fn test_summary_defaults_missing_fields() {
        let summary: SectionSummary =
            serde_json::from_value(json!({"summary": "About leave."})).expect("deserialize");
        assert_eq!(summary, SectionSummary::new("", "About leave."));
    }
}
