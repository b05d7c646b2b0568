use crate::LanguageModel;
use crate::config::LanguageModelConfig;
use crate::error::{LanguageModelError, Result};
use crate::prompt::{JUDGE_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT, judge_prompt, summary_prompt};
use crate::types::{CandidateBrief, RawJudgment, SectionSummary, SummaryRequest};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client for any endpoint speaking the OpenAI chat completions protocol
#[derive(Clone)]
pub struct OpenAiCompatibleModel {
    config: LanguageModelConfig,
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for OpenAiCompatibleModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleModel")
            .field("model", &self.config.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleModel {
    /// Create a client, reading the API key from the configured variable
    pub fn new(config: LanguageModelConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: LanguageModelConfig, api_key: impl Into<String>) -> Result<Self> {
        config.validate().map_err(LanguageModelError::InvalidConfig)?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let endpoint = config.completions_url();
        Ok(Self {
            config,
            http,
            api_key: api_key.into(),
            endpoint,
        })
    }

    pub fn config(&self) -> &LanguageModelConfig {
        &self.config
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LanguageModelError::Timeout(self.config.request_timeout())
                } else {
                    LanguageModelError::Http(err)
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LanguageModelError::Status { status, body });
        }

        let completion: ChatResponse = resp
            .json()
            .await
            .map_err(|err| LanguageModelError::MalformedResponse(err.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                LanguageModelError::MalformedResponse("completion has no message content".into())
            })
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<SectionSummary> {
        let prompt = summary_prompt(request, self.config.max_input_chars);
        let content = self.complete(SUMMARY_SYSTEM_PROMPT, &prompt).await?;
        parse_summary(&content)
    }

    async fn judge_relevance(
        &self,
        query: &str,
        candidates: &[CandidateBrief],
    ) -> Result<Vec<RawJudgment>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = judge_prompt(query, candidates);
        let content = self.complete(JUDGE_SYSTEM_PROMPT, &prompt).await?;
        parse_judgments(&content)
    }
}

/// Parse a JSON payload, tolerating markdown code fences and chatter
/// around the JSON value.
pub(crate) fn parse_json_payload(content: &str) -> Result<Value> {
    let trimmed = strip_code_fence(content.trim());
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end])
            .map_err(|err| LanguageModelError::MalformedResponse(err.to_string())),
        _ => Err(LanguageModelError::MalformedResponse(
            "response contains no JSON value".into(),
        )),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

pub(crate) fn parse_summary(content: &str) -> Result<SectionSummary> {
    let value = parse_json_payload(content)?;
    let summary: SectionSummary = serde_json::from_value(value)?;
    if summary.summary.trim().is_empty() {
        return Err(LanguageModelError::MalformedResponse(
            "summary is empty".into(),
        ));
    }
    Ok(SectionSummary::new(summary.title.trim(), summary.summary.trim()))
}

pub(crate) fn parse_judgments(content: &str) -> Result<Vec<RawJudgment>> {
    let items = match parse_json_payload(content)? {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("judgments") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(LanguageModelError::MalformedResponse(
                    "expected a \"judgments\" array".into(),
                ));
            }
        },
        _ => {
            return Err(LanguageModelError::MalformedResponse(
                "expected a JSON object or array".into(),
            ));
        }
    };

    let mut judgments = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RawJudgment>(item) {
            Ok(judgment) => judgments.push(judgment),
            Err(err) => debug!("Skipping unreadable judgment: {err}"),
        }
    }
    Ok(judgments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_fenced_summary() {
        let content = "```json\n{\"title\": \" Leave \", \"summary\": \"16 weeks.\"}\n```";
        let summary = parse_summary(content).expect("parse");
        assert_eq!(summary, SectionSummary::new("Leave", "16 weeks."));
    }

    #[test]
    fn test_parse_summary_with_chatter() {
        let content = "Sure! {\"title\": \"Leave\", \"summary\": \"16 weeks.\"} Hope this helps.";
        assert!(parse_summary(content).is_ok());
    }

    #[test]
    fn test_empty_summary_is_malformed() {
        assert!(matches!(
            parse_summary("{\"title\": \"Leave\", \"summary\": \"  \"}"),
            Err(LanguageModelError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_summary("no json here"),
            Err(LanguageModelError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_judgments_shapes() {
        let wrapped = parse_judgments(r#"{"judgments": [{"nodeId": "1", "confidenceScore": 80}]}"#)
            .expect("wrapped");
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].confidence_score, Some(json!(80)));

        let bare = parse_judgments(r#"[{"id": 1, "score": 10}, "junk"]"#).expect("bare");
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].node_id, Some(json!(1)));

        assert!(parse_judgments(r#"{"results": []}"#).is_err());
    }
}
