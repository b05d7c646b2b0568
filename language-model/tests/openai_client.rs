use knowbot_language_model::{
    CandidateBrief, LanguageModel, LanguageModelConfig, LanguageModelError, OpenAiCompatibleModel,
    SectionSummary, SummaryRequest,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn model_for(server: &MockServer) -> OpenAiCompatibleModel {
    let config = LanguageModelConfig {
        base_url: format!("{}/v1", server.uri()),
        model: "test-model".to_string(),
        request_timeout_secs: 5,
        ..Default::default()
    };
    OpenAiCompatibleModel::with_api_key(config, "sk-test").expect("client")
}

fn candidates() -> Vec<CandidateBrief> {
    vec![
        CandidateBrief {
            node_id: "1".into(),
            title: "Leave".into(),
            summary: "Employees get 16 weeks.".into(),
            has_children: false,
        },
        CandidateBrief {
            node_id: "2".into(),
            title: "Expenses".into(),
            summary: "Submit via the portal.".into(),
            has_children: false,
        },
    ]
}

#[tokio::test]
async fn test_summarize_sends_json_mode_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"title": "Parental Leave", "summary": "Employees get 16 weeks of leave."}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let model = model_for(&server);
    let summary = model
        .summarize(&SummaryRequest::content(None, "Employees get 16 weeks."))
        .await
        .expect("summary");

    assert_eq!(
        summary,
        SectionSummary::new("Parental Leave", "Employees get 16 weeks of leave.")
    );
    assert_eq!(model.name(), "test-model");
}

#[tokio::test]
async fn test_judge_relevance_parses_wrapped_judgments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"judgments": [
                {"nodeId": "1", "confidenceScore": 90, "action": "accept", "reason": "about leave"},
                {"nodeId": "2", "confidenceScore": 5, "action": "accept"}
            ]}"#,
        )))
        .mount(&server)
        .await;

    let judgments = model_for(&server)
        .judge_relevance("parental leave policy", &candidates())
        .await
        .expect("judgments");

    assert_eq!(judgments.len(), 2);
    assert_eq!(judgments[0].node_id, Some(json!("1")));
    assert_eq!(judgments[0].confidence_score, Some(json!(90)));
    assert_eq!(judgments[0].reason_text().as_deref(), Some("about leave"));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = model_for(&server)
        .summarize(&SummaryRequest::content(None, "text"))
        .await
        .expect_err("should fail");

    match err {
        LanguageModelError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_non_json_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("I cannot help with that.")),
        )
        .mount(&server)
        .await;

    let err = model_for(&server)
        .judge_relevance("leave", &candidates())
        .await
        .expect_err("should fail");
    assert!(matches!(err, LanguageModelError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_empty_batch_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let judgments = model_for(&server)
        .judge_relevance("leave", &[])
        .await
        .expect("no call");
    assert!(judgments.is_empty());
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"{"title": "t", "summary": "s"}"#))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = LanguageModelConfig {
        base_url: format!("{}/v1", server.uri()),
        request_timeout_secs: 1,
        ..Default::default()
    };
    let model = OpenAiCompatibleModel::with_api_key(config, "sk-test").expect("client");
    let err = model
        .summarize(&SummaryRequest::content(None, "text"))
        .await
        .expect_err("should time out");
    assert!(matches!(err, LanguageModelError::Timeout(_)));
}
