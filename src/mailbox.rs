use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::client::GmailClient;
use crate::api::models::{HistoryDelta, RawMessage};
use crate::auth::{OAuthClient, TokenSet};
use crate::config::SyncSettings;
use crate::error::{AppError, AppResult};
use crate::models::Account;
use crate::store::MessageStore;

#[derive(Debug, Clone, Default)]
pub struct MailboxBatch {
    pub messages: Vec<RawMessage>,
    pub checkpoint: Option<String>,
    pub vanished: usize,
    pub fetch_failures: usize,
}

/// One authenticated mailbox. `archive` and `trash` report failure as `false`.
#[async_trait]
pub trait Mailbox: Send + Sync {
    async fn list_new(&self, checkpoint: Option<&str>) -> AppResult<MailboxBatch>;
    async fn get_message(&self, id: &str) -> AppResult<RawMessage>;
    async fn history_since(&self, checkpoint: &str) -> AppResult<HistoryDelta>;
    async fn archive(&self, id: &str) -> bool;
    async fn trash(&self, id: &str) -> bool;
}

#[async_trait]
pub trait MailboxConnector: Send + Sync {
    async fn connect(&self, account: &Account) -> AppResult<Arc<dyn Mailbox>>;
}

#[derive(Debug, Clone)]
pub struct GmailMailbox {
    client: GmailClient,
    access_token: String,
    recent_query: String,
    max_results: u32,
}

impl GmailMailbox {
    pub fn new(client: GmailClient, access_token: String, sync: &SyncSettings) -> Self {
        Self {
            client,
            access_token,
            recent_query: sync.recent_query(),
            max_results: sync.max_results(),
        }
    }

    async fn list_recent(&self) -> AppResult<MailboxBatch> {
        let checkpoint = self.client.current_history_id(&self.access_token).await?;
        let ids = self
            .client
            .list_message_ids(&self.access_token, self.max_results, &self.recent_query)
            .await?;
        debug!(count = ids.len(), query = %self.recent_query, "listed recent messages");
        Ok(self.fetch_all(ids, checkpoint).await)
    }

    async fn fetch_all(&self, ids: Vec<String>, checkpoint: Option<String>) -> MailboxBatch {
        let mut batch = MailboxBatch {
            checkpoint,
            ..MailboxBatch::default()
        };

        for id in ids {
            match self.get_message(&id).await {
                Ok(message) => batch.messages.push(message),
                Err(AppError::NotFound(_)) => {
                    debug!(message_id = %id, "message no longer exists, skipping");
                    batch.vanished += 1;
                }
                Err(err) => {
                    warn!(message_id = %id, error = %err, "failed to fetch message, skipping");
                    batch.fetch_failures += 1;
                }
            }
        }

        batch
    }
}

#[async_trait]
impl Mailbox for GmailMailbox {
    async fn list_new(&self, checkpoint: Option<&str>) -> AppResult<MailboxBatch> {
        let Some(checkpoint) = checkpoint else {
            return self.list_recent().await;
        };

        match self.history_since(checkpoint).await {
            Ok(delta) => {
                let resume = delta.history_id.or_else(|| Some(checkpoint.to_string()));
                Ok(self.fetch_all(delta.message_ids, resume).await)
            }
            Err(AppError::NotFound(details)) => {
                warn!(
                    checkpoint,
                    details = %details,
                    "history marker expired, falling back to recent messages"
                );
                self.list_recent().await
            }
            Err(err) => Err(err),
        }
    }

    async fn get_message(&self, id: &str) -> AppResult<RawMessage> {
        self.client.get_message(id, &self.access_token).await
    }

    async fn history_since(&self, checkpoint: &str) -> AppResult<HistoryDelta> {
        self.client.history_since(&self.access_token, checkpoint).await
    }

    async fn archive(&self, id: &str) -> bool {
        match self.client.archive(id, &self.access_token).await {
            Ok(()) => true,
            Err(err) => {
                warn!(message_id = %id, error = %err, "archive failed");
                false
            }
        }
    }

    async fn trash(&self, id: &str) -> bool {
        match self.client.trash(id, &self.access_token).await {
            Ok(()) => true,
            Err(err) => {
                warn!(message_id = %id, error = %err, "trash failed");
                false
            }
        }
    }
}

pub struct GmailConnector {
    client: GmailClient,
    oauth: OAuthClient,
    store: Arc<dyn MessageStore>,
    sync: SyncSettings,
}

impl GmailConnector {
    pub fn new(
        client: GmailClient,
        oauth: OAuthClient,
        store: Arc<dyn MessageStore>,
        sync: SyncSettings,
    ) -> Self {
        Self {
            client,
            oauth,
            store,
            sync,
        }
    }

    async fn access_token(&self, account: &Account) -> AppResult<String> {
        if !account.token.is_expired(Utc::now()) {
            return Ok(account.token.access_token.clone());
        }

        info!(account = %account.email, "access token expired, refreshing");
        let refreshed: TokenSet = self.oauth.refresh(&account.token).await?;
        self.store.save_token(account.id, &refreshed).await?;
        Ok(refreshed.access_token)
    }
}

#[async_trait]
impl MailboxConnector for GmailConnector {
    async fn connect(&self, account: &Account) -> AppResult<Arc<dyn Mailbox>> {
        let access_token = self.access_token(account).await?;
        Ok(Arc::new(GmailMailbox::new(
            self.client.clone(),
            access_token,
            &self.sync,
        )))
    }
}
