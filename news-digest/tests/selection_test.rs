mod common;

use common::*;
use news_digest::llm_adapter::{candidate_digest, parse_selection, ranking_prompt, RankingRequest};
use news_digest::selector::{positional, validate_selection};
use news_digest::types::Candidate;
use news_digest::{CandidateSelector, ClaudeRankingService, MockRankingService, RankingService};
use std::sync::Arc;
use std::time::Duration;

fn pool(n: usize) -> Vec<Candidate> {
    (1..=n)
        .map(|i| candidate("pool", &format!("Item {}", i), i as i64))
        .collect()
}

#[tokio::test]
async fn test_no_guidance_is_positional() {
    init_tracing();
    let mock = Arc::new(MockRankingService::answering(vec![5, 6, 7]));
    let selector = CandidateSelector::with_ranking(mock.clone());

    for guidance in [None, Some(""), Some("   \n")] {
        let outcome = selector.select(pool(10), 3, guidance).await;
        assert!(outcome.is_clean());
        assert_eq!(titles(&outcome.value), vec!["Item 1", "Item 2", "Item 3"]);
    }
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_valid_selection_keeps_returned_order() {
    let mock = Arc::new(MockRankingService::answering(vec![7, 2, 9]));
    let selector = CandidateSelector::with_ranking(mock.clone());

    let outcome = selector
        .select(pool(10), 3, Some("Prefer economy, exclude sports"))
        .await;

    assert!(outcome.is_clean());
    assert_eq!(titles(&outcome.value), vec!["Item 7", "Item 2", "Item 9"]);

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].count, 3);
    assert_eq!(requests[0].guidance, "Prefer economy, exclude sports");
    assert!(requests[0].digest.starts_with("1. [pool] Item 1"));
    assert!(requests[0].digest.contains("\n10. [pool] Item 10"));
}

#[tokio::test]
async fn test_malformed_selections_fall_back_to_positional() {
    let bad_answers = vec![
        vec![1, 2],
        vec![1, 2, 3, 4],
        vec![0, 1, 2],
        vec![1, 2, 11],
        vec![4, 4, 5],
        vec![],
    ];

    for answer in bad_answers {
        let selector =
            CandidateSelector::with_ranking(Arc::new(MockRankingService::answering(answer.clone())));
        let outcome = selector.select(pool(10), 3, Some("anything")).await;

        assert_eq!(outcome.value, positional(pool(10), 3), "answer {:?}", answer);
        assert_eq!(outcome.failures.len(), 1);
    }
}

#[tokio::test]
async fn test_ranking_failure_falls_back_to_positional() {
    let selector = CandidateSelector::with_ranking(Arc::new(MockRankingService::failing("overloaded")));

    let outcome = selector.select(pool(6), 2, Some("tech only")).await;

    assert_eq!(titles(&outcome.value), vec!["Item 1", "Item 2"]);
    assert!(outcome.failures[0].contains("overloaded"));
}

#[tokio::test]
async fn test_short_pool_skips_ranking() {
    let mock = Arc::new(MockRankingService::answering(vec![1]));
    let selector = CandidateSelector::with_ranking(mock.clone());

    let outcome = selector.select(pool(2), 3, Some("tech only")).await;

    assert_eq!(titles(&outcome.value), vec!["Item 1", "Item 2"]);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_exact_fit_pool_is_still_ranked() {
    let mock = Arc::new(MockRankingService::answering(vec![3, 1, 2]));
    let selector = CandidateSelector::with_ranking(mock.clone());

    let outcome = selector.select(pool(3), 3, Some("tech only")).await;

    assert!(outcome.is_clean());
    assert_eq!(titles(&outcome.value), vec!["Item 3", "Item 1", "Item 2"]);
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn test_positional_selector_ignores_guidance() {
    let outcome = CandidateSelector::positional()
        .select(pool(10), 3, Some("tech only"))
        .await;

    assert_eq!(titles(&outcome.value), vec!["Item 1", "Item 2", "Item 3"]);
}

#[test]
fn test_validate_selection() {
    assert!(validate_selection(&[3, 1], 2, 3).is_ok());
    assert!(validate_selection(&[3], 2, 3).is_err());
    assert!(validate_selection(&[3, 4], 2, 3).is_err());
    assert!(validate_selection(&[2, 2], 2, 3).is_err());
}

#[test]
fn test_parse_selection_tolerates_wrapping() {
    assert_eq!(parse_selection(r#"{"selected": [2, 5, 1]}"#).unwrap(), vec![2, 5, 1]);
    assert_eq!(
        parse_selection("Here you go:\n```json\n{\"selected\": [4]}\n```").unwrap(),
        vec![4]
    );
    assert!(parse_selection("I cannot help with that").is_err());
    assert!(parse_selection(r#"{"picked": [1]}"#).is_err());
}

#[test]
fn test_prompt_orders_negative_constraints_first() {
    let request = RankingRequest {
        digest: candidate_digest(&pool(2)),
        guidance: "No crime stories".to_string(),
        count: 2,
    };

    let prompt = ranking_prompt(&request);

    assert!(prompt.contains("No crime stories"));
    assert!(prompt.contains("2. [pool] Item 2"));
    let negative = prompt.find("negative constraints").unwrap();
    let fill = prompt.find("fill the rest").unwrap();
    assert!(negative < fill);
    assert!(prompt.contains("exactly 2 distinct"));
}

#[tokio::test]
async fn test_claude_service_with_mock_server() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-key")
        .match_header("anthropic-version", "2023-06-01")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": "{\"selected\": [3, 1]}"}]
            }"#,
        )
        .create_async()
        .await;

    let service = ClaudeRankingService::new(
        format!("{}/v1/messages", server.url()),
        "test-key",
        "claude-test",
        Duration::from_secs(5),
    )
    .unwrap();
    let request = RankingRequest {
        digest: candidate_digest(&pool(3)),
        guidance: "anything".to_string(),
        count: 2,
    };

    assert_eq!(service.rank(&request).await.unwrap(), vec![3, 1]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_claude_service_error_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(529)
        .with_body(r#"{"type":"error"}"#)
        .create_async()
        .await;

    let service =
        ClaudeRankingService::new(server.url(), "k", "claude-test", Duration::from_secs(5)).unwrap();
    let selector = CandidateSelector::with_ranking(Arc::new(service));

    let outcome = selector.select(pool(5), 2, Some("anything")).await;

    assert_eq!(titles(&outcome.value), vec!["Item 1", "Item 2"]);
    assert_eq!(outcome.failures.len(), 1);
}
