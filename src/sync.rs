use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::api::models::RawMessage;
use crate::error::{AppError, AppResult};
use crate::mail::parse_message;
use crate::mailbox::{Mailbox, MailboxConnector};
use crate::models::{Account, Category, NewMessage};
use crate::oracle::ClassificationOracle;
use crate::store::{InsertOutcome, MessageStore};
use crate::tasks::{TaskHandle, TaskRunner};

/// Passes a failing batch may keep the old history marker before it is advanced anyway.
pub const MAX_CHECKPOINT_HOLDS: i32 = 3;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SyncReport {
    pub account_id: i64,
    pub account_email: String,
    pub candidates: usize,
    pub already_imported: usize,
    pub vanished: usize,
    pub unmatched: usize,
    pub imported: usize,
    pub archived: usize,
    pub archive_failures: usize,
    pub item_failures: usize,
    pub checkpoint_advanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    fn for_account(account: &Account) -> Self {
        Self {
            account_id: account.id,
            account_email: account.email.clone(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    AlreadyImported,
    Unmatched,
    Imported { archived: bool },
}

#[derive(Clone)]
pub struct SyncCoordinator {
    store: Arc<dyn MessageStore>,
    connector: Arc<dyn MailboxConnector>,
    oracle: Arc<dyn ClassificationOracle>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn MessageStore>,
        connector: Arc<dyn MailboxConnector>,
        oracle: Arc<dyn ClassificationOracle>,
    ) -> Self {
        Self {
            store,
            connector,
            oracle,
        }
    }

    pub async fn spawn_sync(
        &self,
        runner: &TaskRunner,
        user_id: i64,
    ) -> AppResult<TaskHandle<Vec<SyncReport>>> {
        ensure_accounts(&self.store.list_accounts(user_id).await?, user_id)?;

        let coordinator = self.clone();
        Ok(runner.submit(format!("sync user {user_id}"), async move {
            coordinator.sync_user(user_id).await
        }))
    }

    pub async fn sync_user(&self, user_id: i64) -> AppResult<Vec<SyncReport>> {
        let accounts = self.store.list_accounts(user_id).await?;
        ensure_accounts(&accounts, user_id)?;

        let categories = self.store.list_categories(user_id).await?;
        if categories.is_empty() {
            info!(user_id, "no categories defined, nothing to sync");
            return Ok(Vec::new());
        }

        let mut reports = Vec::with_capacity(accounts.len());
        for account in &accounts {
            let span = info_span!("account", id = account.id, email = %account.email);
            match self.sync_account(account, &categories).instrument(span).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(account = %account.email, error = %err, "account sync failed, continuing");
                    reports.push(SyncReport {
                        error: Some(err.to_string()),
                        ..SyncReport::for_account(account)
                    });
                }
            }
        }

        Ok(reports)
    }

    pub async fn sync_account(
        &self,
        account: &Account,
        categories: &[Category],
    ) -> AppResult<SyncReport> {
        let mut report = SyncReport::for_account(account);
        if categories.is_empty() {
            info!(account = %account.email, "no categories defined, skipping account");
            return Ok(report);
        }

        let mailbox = self.connector.connect(account).await?;
        let batch = mailbox.list_new(account.history_id.as_deref()).await?;
        report.candidates = batch.messages.len() + batch.vanished + batch.fetch_failures;
        report.vanished = batch.vanished;
        report.item_failures = batch.fetch_failures;

        for raw in &batch.messages {
            match self
                .process_message(account, categories, mailbox.as_ref(), raw)
                .await
            {
                Ok(ItemOutcome::AlreadyImported) => report.already_imported += 1,
                Ok(ItemOutcome::Unmatched) => report.unmatched += 1,
                Ok(ItemOutcome::Imported { archived }) => {
                    report.imported += 1;
                    if archived {
                        report.archived += 1;
                    } else {
                        report.archive_failures += 1;
                    }
                }
                Err(err) => {
                    warn!(message_id = %raw.id, error = %err, "failed to process message, skipping");
                    report.item_failures += 1;
                }
            }
        }

        match batch.checkpoint {
            Some(checkpoint) => self.settle_checkpoint(account, &checkpoint, &mut report).await,
            None => debug!("provider returned no checkpoint"),
        }

        info!(
            candidates = report.candidates,
            imported = report.imported,
            unmatched = report.unmatched,
            already_imported = report.already_imported,
            "account synced"
        );
        Ok(report)
    }

    async fn settle_checkpoint(&self, account: &Account, checkpoint: &str, report: &mut SyncReport) {
        if report.item_failures > 0 && account.checkpoint_holds < MAX_CHECKPOINT_HOLDS {
            match self.store.record_checkpoint_hold(account.id).await {
                Ok(holds) => warn!(
                    failures = report.item_failures,
                    holds,
                    "keeping previous checkpoint so failed messages are retried"
                ),
                Err(err) => error!(error = %err, "failed to record checkpoint hold"),
            }
            return;
        }

        if report.item_failures > 0 {
            warn!(
                failures = report.item_failures,
                holds = account.checkpoint_holds,
                "retries exhausted, advancing checkpoint past failed messages"
            );
        }

        match self.store.save_checkpoint(account.id, checkpoint).await {
            Ok(()) => report.checkpoint_advanced = true,
            Err(err) => error!(error = %err, "failed to save checkpoint"),
        }
    }

    async fn process_message(
        &self,
        account: &Account,
        categories: &[Category],
        mailbox: &dyn Mailbox,
        raw: &RawMessage,
    ) -> AppResult<ItemOutcome> {
        if self.store.message_exists(&raw.id).await? {
            return Ok(ItemOutcome::AlreadyImported);
        }

        let parsed = parse_message(raw);
        let (category_id, summary) = tokio::join!(
            self.oracle.categorize(&parsed, categories),
            self.oracle.summarize(&parsed)
        );

        let Some(category_id) = category_id else {
            debug!(message_id = %raw.id, subject = %parsed.subject, "no matching category, discarding");
            return Ok(ItemOutcome::Unmatched);
        };

        let outcome = self
            .store
            .insert_message(NewMessage {
                account_id: account.id,
                category_id,
                summary,
                message: parsed,
            })
            .await?;

        let stored = match outcome {
            InsertOutcome::Inserted(stored) => stored,
            InsertOutcome::AlreadyImported => return Ok(ItemOutcome::AlreadyImported),
        };

        let archived = mailbox.archive(&stored.provider_message_id).await;
        if archived {
            self.store.mark_archived(stored.id).await?;
        } else {
            warn!(message_id = %stored.provider_message_id, "imported but left in inbox");
        }

        Ok(ItemOutcome::Imported { archived })
    }
}

fn ensure_accounts(accounts: &[Account], user_id: i64) -> AppResult<()> {
    if accounts.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "user {user_id} has no linked mail accounts"
        )));
    }
    Ok(())
}
