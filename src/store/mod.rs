pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::auth::TokenSet;
use crate::error::{AppError, AppResult};
use crate::models::{Account, Category, NewMessage, StoredMessage};

#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted(StoredMessage),
    AlreadyImported,
}

/// `insert_message` must be atomic with respect to `provider_message_id`: two concurrent
/// inserts of the same key yield exactly one `Inserted`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn list_accounts(&self, user_id: i64) -> AppResult<Vec<Account>>;
    async fn get_account(&self, account_id: i64) -> AppResult<Option<Account>>;
    async fn save_token(&self, account_id: i64, token: &TokenSet) -> AppResult<()>;
    async fn save_checkpoint(&self, account_id: i64, history_id: &str) -> AppResult<()>;
    async fn record_checkpoint_hold(&self, account_id: i64) -> AppResult<i32>;

    async fn list_categories(&self, user_id: i64) -> AppResult<Vec<Category>>;

    async fn message_exists(&self, provider_message_id: &str) -> AppResult<bool>;
    async fn insert_message(&self, message: NewMessage) -> AppResult<InsertOutcome>;
    async fn get_message(&self, id: i64) -> AppResult<Option<StoredMessage>>;
    async fn mark_archived(&self, id: i64) -> AppResult<()>;
    async fn mark_deleted(&self, id: i64) -> AppResult<()>;

    async fn list_by_category(&self, user_id: i64, category_id: i64)
    -> AppResult<Vec<StoredMessage>>;

    async fn messages_owned_by(&self, user_id: i64, ids: &[i64]) -> AppResult<Vec<StoredMessage>>;
}

pub async fn find_owned_message(
    store: &dyn MessageStore,
    user_id: i64,
    id: i64,
) -> AppResult<StoredMessage> {
    let not_found = || AppError::NotFound(format!("message {id}"));

    let message = store.get_message(id).await?.ok_or_else(not_found)?;
    let owner = store
        .get_account(message.account_id)
        .await?
        .map(|account| account.user_id);
    if owner != Some(user_id) {
        return Err(not_found());
    }

    Ok(message)
}
