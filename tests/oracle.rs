mod support;

use std::sync::Arc;
use std::time::Duration;

use mailsort::mail::parse_message;
use mailsort::models::{Category, ParsedMessage};
use mailsort::oracle::{ClassificationOracle, LlmOracle, SUMMARY_FALLBACK};

use support::{HangingModel, StubModel, raw_message};

fn categories(ids: &[i64]) -> Vec<Category> {
    ids.iter()
        .map(|id| Category {
            id: *id,
            name: format!("Category {id}"),
            description: format!("Everything about topic {id}"),
        })
        .collect()
}

fn message() -> ParsedMessage {
    parse_message(&raw_message("m-1", "Flash sale", "Everything is 40% off this weekend."))
}

fn oracle(model: Arc<StubModel>) -> LlmOracle {
    LlmOracle::new(model, Duration::from_secs(5))
}

#[tokio::test]
async fn empty_categories_skip_the_model() {
    let model = Arc::new(StubModel::replying("1", "A sale."));
    let oracle = oracle(Arc::clone(&model));

    assert_eq!(oracle.categorize(&message(), &[]).await, None);
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn reply_normalization() {
    let cases = [("0", None), ("2", Some(2)), ("7", None), ("abc", None), (" 1 \n", Some(1))];

    for (reply, expected) in cases {
        let model = Arc::new(StubModel::replying(reply, "unused"));
        let got = oracle(model).categorize(&message(), &categories(&[1, 2])).await;
        assert_eq!(got, expected, "reply {reply:?}");
    }
}

#[tokio::test]
async fn categorize_prompt_carries_categories_and_message() {
    let model = Arc::new(StubModel::replying("2", "unused"));
    oracle(Arc::clone(&model))
        .categorize(&message(), &categories(&[1, 2]))
        .await;

    let requests = model.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.user.contains("ID: 2, Name: Category 2, Description: Everything about topic 2"));
    assert!(request.user.contains("Email Subject: Flash sale"));
    assert!(request.user.contains("40% off"));
    assert!((request.temperature - 0.3).abs() < f32::EPSILON);
}

#[tokio::test]
async fn transport_errors_fail_open() {
    let model = Arc::new(StubModel::failing());
    let oracle = oracle(Arc::clone(&model));

    assert_eq!(oracle.categorize(&message(), &categories(&[1])).await, None);
    assert_eq!(oracle.summarize(&message()).await, SUMMARY_FALLBACK);
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn summary_is_trimmed() {
    let model = Arc::new(StubModel::replying("1", "  A weekend sale with 40% off.\n"));
    assert_eq!(
        oracle(model).summarize(&message()).await,
        "A weekend sale with 40% off."
    );
}

#[tokio::test]
async fn blank_summary_uses_fallback() {
    let model = Arc::new(StubModel::replying("1", "   "));
    assert_eq!(oracle(model).summarize(&message()).await, SUMMARY_FALLBACK);
}

#[tokio::test]
async fn slow_model_times_out() {
    let oracle = LlmOracle::new(Arc::new(HangingModel), Duration::from_millis(50));

    assert_eq!(oracle.categorize(&message(), &categories(&[1])).await, None);
    assert_eq!(oracle.summarize(&message()).await, SUMMARY_FALLBACK);
}
