use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::{Category, ParsedMessage};

use super::model::CompletionModel;
use super::prompt::{categorize_request, summarize_request};
use super::{ClassificationOracle, SUMMARY_FALLBACK};

#[derive(Clone)]
pub struct LlmOracle {
    model: Arc<dyn CompletionModel>,
    timeout: Duration,
}

impl LlmOracle {
    pub fn new(model: Arc<dyn CompletionModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    async fn bounded<F>(&self, call: F) -> AppResult<String>
    where
        F: Future<Output = AppResult<String>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Oracle(format!(
                "no response within {}s",
                self.timeout.as_secs_f32()
            ))),
        }
    }
}

#[async_trait]
impl ClassificationOracle for LlmOracle {
    async fn categorize(&self, message: &ParsedMessage, categories: &[Category]) -> Option<i64> {
        if categories.is_empty() {
            return None;
        }

        let request = categorize_request(message, categories);
        match self.bounded(self.model.complete(request)).await {
            Ok(reply) => {
                let category = parse_category_response(&reply, categories);
                debug!(
                    message_id = %message.provider_message_id,
                    reply = %reply,
                    category = ?category,
                    "categorized message"
                );
                category
            }
            Err(err) => {
                warn!(
                    message_id = %message.provider_message_id,
                    error = %err,
                    "categorization failed, treating as unmatched"
                );
                None
            }
        }
    }

    async fn summarize(&self, message: &ParsedMessage) -> String {
        match self.bounded(self.model.complete(summarize_request(message))).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => {
                warn!(message_id = %message.provider_message_id, "empty summary from model");
                SUMMARY_FALLBACK.to_string()
            }
            Err(err) => {
                warn!(
                    message_id = %message.provider_message_id,
                    error = %err,
                    "summarization failed"
                );
                SUMMARY_FALLBACK.to_string()
            }
        }
    }
}

/// Maps a raw model reply onto a known category id. `0`, garbage and unknown ids are all `None`.
pub fn parse_category_response(reply: &str, categories: &[Category]) -> Option<i64> {
    let id = reply.trim().parse::<i64>().ok()?;
    if id == 0 {
        return None;
    }
    categories
        .iter()
        .any(|category| category.id == id)
        .then_some(id)
}
