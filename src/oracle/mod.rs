pub mod classifier;
pub mod model;
pub mod prompt;

pub use classifier::{LlmOracle, parse_category_response};
pub use model::{ChatRequest, CompletionModel, OpenAiChat};

use async_trait::async_trait;

use crate::models::{Category, ParsedMessage};

pub const SUMMARY_FALLBACK: &str = "Unable to generate summary.";

/// Language-model backed classification. Both operations fail open and never return errors.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    async fn categorize(&self, message: &ParsedMessage, categories: &[Category]) -> Option<i64>;

    async fn summarize(&self, message: &ParsedMessage) -> String;
}
