use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::auth::TokenSet;
use crate::error::{AppError, AppResult};
use crate::models::{Account, Category, NewMessage, StoredMessage};

use super::{InsertOutcome, MessageStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    accounts: BTreeMap<i64, Account>,
    categories: BTreeMap<i64, (i64, Category)>,
    messages: BTreeMap<i64, StoredMessage>,
}

impl Inner {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| AppError::Task("memory store lock poisoned".to_string()))
    }

    pub fn add_account(&self, user_id: i64, email: &str, token: TokenSet) -> AppResult<Account> {
        let mut inner = self.lock()?;
        let account = Account {
            id: inner.allocate_id(),
            user_id,
            email: email.to_string(),
            token,
            history_id: None,
            last_synced_at: None,
            checkpoint_holds: 0,
        };
        inner.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    pub fn add_category(&self, user_id: i64, name: &str, description: &str) -> AppResult<Category> {
        let mut inner = self.lock()?;
        let category = Category {
            id: inner.allocate_id(),
            name: name.to_string(),
            description: description.to_string(),
        };
        inner
            .categories
            .insert(category.id, (user_id, category.clone()));
        Ok(category)
    }

    pub fn messages(&self) -> AppResult<Vec<StoredMessage>> {
        Ok(self.lock()?.messages.values().cloned().collect())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn list_accounts(&self, user_id: i64) -> AppResult<Vec<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .filter(|account| account.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_account(&self, account_id: i64) -> AppResult<Option<Account>> {
        Ok(self.lock()?.accounts.get(&account_id).cloned())
    }

    async fn save_token(&self, account_id: i64, token: &TokenSet) -> AppResult<()> {
        let mut inner = self.lock()?;
        if let Some(account) = inner.accounts.get_mut(&account_id) {
            let refresh_token = token
                .refresh_token
                .clone()
                .or_else(|| account.token.refresh_token.clone());
            account.token = TokenSet {
                refresh_token,
                ..token.clone()
            };
        }
        Ok(())
    }

    async fn save_checkpoint(&self, account_id: i64, history_id: &str) -> AppResult<()> {
        let mut inner = self.lock()?;
        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| AppError::NotFound(format!("account {account_id}")))?;
        account.history_id = Some(history_id.to_string());
        account.last_synced_at = Some(Utc::now());
        account.checkpoint_holds = 0;
        Ok(())
    }

    async fn record_checkpoint_hold(&self, account_id: i64) -> AppResult<i32> {
        let mut inner = self.lock()?;
        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| AppError::NotFound(format!("account {account_id}")))?;
        account.checkpoint_holds += 1;
        Ok(account.checkpoint_holds)
    }

    async fn list_categories(&self, user_id: i64) -> AppResult<Vec<Category>> {
        Ok(self
            .lock()?
            .categories
            .values()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, category)| category.clone())
            .collect())
    }

    async fn message_exists(&self, provider_message_id: &str) -> AppResult<bool> {
        Ok(self
            .lock()?
            .messages
            .values()
            .any(|message| message.provider_message_id == provider_message_id))
    }

    async fn insert_message(&self, new: NewMessage) -> AppResult<InsertOutcome> {
        let mut inner = self.lock()?;
        let duplicate = inner
            .messages
            .values()
            .any(|message| message.provider_message_id == new.message.provider_message_id);
        if duplicate {
            return Ok(InsertOutcome::AlreadyImported);
        }

        let stored = StoredMessage::from_new(inner.allocate_id(), new, Utc::now());
        inner.messages.insert(stored.id, stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }

    async fn get_message(&self, id: i64) -> AppResult<Option<StoredMessage>> {
        Ok(self.lock()?.messages.get(&id).cloned())
    }

    async fn mark_archived(&self, id: i64) -> AppResult<()> {
        if let Some(message) = self.lock()?.messages.get_mut(&id) {
            message.is_archived = true;
        }
        Ok(())
    }

    async fn mark_deleted(&self, id: i64) -> AppResult<()> {
        if let Some(message) = self.lock()?.messages.get_mut(&id) {
            message.is_deleted = true;
        }
        Ok(())
    }

    async fn list_by_category(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> AppResult<Vec<StoredMessage>> {
        let inner = self.lock()?;
        let owned = inner
            .categories
            .get(&category_id)
            .is_some_and(|(owner, _)| *owner == user_id);
        if !owned {
            return Ok(Vec::new());
        }

        let mut messages = inner
            .messages
            .values()
            .filter(|message| message.category_id == category_id && !message.is_deleted)
            .cloned()
            .collect::<Vec<_>>();
        messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(messages)
    }

    async fn messages_owned_by(&self, user_id: i64, ids: &[i64]) -> AppResult<Vec<StoredMessage>> {
        let inner = self.lock()?;
        Ok(inner
            .messages
            .values()
            .filter(|message| ids.contains(&message.id))
            .filter(|message| {
                inner
                    .accounts
                    .get(&message.account_id)
                    .is_some_and(|account| account.user_id == user_id)
            })
            .cloned()
            .collect())
    }
}
