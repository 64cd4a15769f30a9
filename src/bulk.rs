use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::mailbox::{Mailbox, MailboxConnector};
use crate::models::StoredMessage;
use crate::store::MessageStore;
use crate::tasks::{TaskHandle, TaskRunner};
use crate::unsubscribe::{BrowserAutomation, EngineTimings, UnsubscribeEngine, UnsubscribeOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Delete,
    Unsubscribe,
}

impl FromStr for BulkAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "unsubscribe" => Ok(Self::Unsubscribe),
            other => Err(AppError::InvalidInput(format!(
                "unknown bulk action `{other}`. expected `delete` or `unsubscribe`"
            ))),
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => f.write_str("delete"),
            Self::Unsubscribe => f.write_str("unsubscribe"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DeleteReport {
    pub requested: usize,
    pub deleted: usize,
    pub trash_failures: usize,
    pub store_failures: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnsubscribeResult {
    pub message_id: i64,
    pub url: String,
    pub outcome: UnsubscribeOutcome,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UnsubscribeReport {
    pub requested: usize,
    pub skipped_without_target: usize,
    pub succeeded: usize,
    pub results: Vec<UnsubscribeResult>,
}

#[derive(Debug)]
pub enum BulkReceipt {
    Deleted(DeleteReport),
    Accepted(TaskHandle<UnsubscribeReport>),
}

pub struct BulkActionCoordinator {
    store: Arc<dyn MessageStore>,
    connector: Arc<dyn MailboxConnector>,
    browser: Arc<dyn BrowserAutomation>,
    runner: TaskRunner,
    timings: EngineTimings,
}

impl BulkActionCoordinator {
    pub fn new(
        store: Arc<dyn MessageStore>,
        connector: Arc<dyn MailboxConnector>,
        browser: Arc<dyn BrowserAutomation>,
        runner: TaskRunner,
    ) -> Self {
        Self {
            store,
            connector,
            browser,
            runner,
            timings: EngineTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: EngineTimings) -> Self {
        self.timings = timings;
        self
    }

    pub async fn apply(
        &self,
        user_id: i64,
        action: BulkAction,
        ids: &[i64],
    ) -> AppResult<BulkReceipt> {
        let messages = self.authorize(user_id, ids).await?;
        info!(user_id, %action, count = messages.len(), "bulk action authorized");

        match action {
            BulkAction::Delete => Ok(BulkReceipt::Deleted(self.delete(&messages).await)),
            BulkAction::Unsubscribe => Ok(BulkReceipt::Accepted(self.spawn_unsubscribe(messages))),
        }
    }

    pub async fn authorize(&self, user_id: i64, ids: &[i64]) -> AppResult<Vec<StoredMessage>> {
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();
        if unique.is_empty() {
            return Err(AppError::InvalidInput("no message ids given".to_string()));
        }

        let owned = self.store.messages_owned_by(user_id, &unique).await?;
        if owned.len() != unique.len() {
            warn!(
                user_id,
                requested = unique.len(),
                owned = owned.len(),
                "bulk request rejected"
            );
            return Err(AppError::Forbidden(
                "some messages were not found or do not belong to you".to_string(),
            ));
        }

        Ok(owned)
    }

    async fn delete(&self, messages: &[StoredMessage]) -> DeleteReport {
        let mut report = DeleteReport {
            requested: messages.len(),
            ..DeleteReport::default()
        };
        let mut mailboxes: HashMap<i64, Option<Arc<dyn Mailbox>>> = HashMap::new();

        for message in messages {
            if let Err(err) = self.store.mark_deleted(message.id).await {
                warn!(message_id = message.id, error = %err, "failed to mark message deleted");
                report.store_failures += 1;
                continue;
            }
            report.deleted += 1;

            let mailbox = match mailboxes.entry(message.account_id) {
                Entry::Occupied(entry) => entry.get().clone(),
                Entry::Vacant(entry) => {
                    let mailbox = self.mailbox_for(message.account_id).await;
                    entry.insert(mailbox).clone()
                }
            };

            let trashed = match mailbox {
                Some(mailbox) => mailbox.trash(&message.provider_message_id).await,
                None => false,
            };
            if !trashed {
                report.trash_failures += 1;
            }
        }

        report
    }

    async fn mailbox_for(&self, account_id: i64) -> Option<Arc<dyn Mailbox>> {
        let account = match self.store.get_account(account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(account_id, "account vanished, skipping remote trash");
                return None;
            }
            Err(err) => {
                warn!(account_id, error = %err, "failed to load account, skipping remote trash");
                return None;
            }
        };

        match self.connector.connect(&account).await {
            Ok(mailbox) => Some(mailbox),
            Err(err) => {
                warn!(account = %account.email, error = %err, "failed to connect mailbox, skipping remote trash");
                None
            }
        }
    }

    fn spawn_unsubscribe(&self, messages: Vec<StoredMessage>) -> TaskHandle<UnsubscribeReport> {
        let store = Arc::clone(&self.store);
        let engine = UnsubscribeEngine::with_timings(Arc::clone(&self.browser), self.timings);

        self.runner
            .submit(format!("unsubscribe {} messages", messages.len()), async move {
                let report = unsubscribe_all(store.as_ref(), &engine, &messages).await;
                if let Err(err) = engine.close().await {
                    warn!(error = %err, "failed to close browser session");
                }
                Ok(report)
            })
    }
}

async fn unsubscribe_all(
    store: &dyn MessageStore,
    engine: &UnsubscribeEngine,
    messages: &[StoredMessage],
) -> UnsubscribeReport {
    let mut report = UnsubscribeReport {
        requested: messages.len(),
        ..UnsubscribeReport::default()
    };

    for message in messages {
        let Some(url) = message.unsubscribe_target() else {
            debug!(message_id = message.id, "no unsubscribe target, skipping");
            report.skipped_without_target += 1;
            continue;
        };

        let outcome = engine.unsubscribe(url).await;
        if outcome.success {
            match store.mark_deleted(message.id).await {
                Ok(()) => report.succeeded += 1,
                Err(err) => {
                    warn!(message_id = message.id, error = %err, "unsubscribed but failed to mark deleted")
                }
            }
        }

        report.results.push(UnsubscribeResult {
            message_id: message.id,
            url: url.to_string(),
            outcome,
        });
    }

    report
}
