use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::auth::TokenSet;
use crate::error::{AppError, AppResult};
use crate::models::{Account, Category, NewMessage, StoredMessage};

use super::{InsertOutcome, MessageStore};

const MAX_CONNECTIONS: u32 = 5;

const MESSAGE_COLUMNS: &str = "id, account_id, category_id, provider_message_id, thread_id, subject, \
     sender_name, sender_email, recipient, received_at, body_text, body_html, summary, headers, \
     labels, unsubscribe_url, is_archived, is_deleted, created_at";

const ACCOUNT_COLUMNS: &str = "id, user_id, email, access_token, refresh_token, token_expires_at, \
     history_id, last_synced_at, checkpoint_holds";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    user_id: i64,
    email: String,
    access_token: String,
    refresh_token: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    history_id: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
    checkpoint_holds: i32,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            token: TokenSet {
                access_token: row.access_token,
                refresh_token: row.refresh_token,
                expires_at: row.token_expires_at,
            },
            history_id: row.history_id,
            last_synced_at: row.last_synced_at,
            checkpoint_holds: row.checkpoint_holds,
        }
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn list_accounts(&self, user_id: i64) -> AppResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn get_account(&self, account_id: i64) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn save_token(&self, account_id: i64, token: &TokenSet) -> AppResult<()> {
        sqlx::query(
            "UPDATE accounts SET access_token = $2, refresh_token = COALESCE($3, refresh_token), \
             token_expires_at = $4 WHERE id = $1",
        )
        .bind(account_id)
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_checkpoint(&self, account_id: i64, history_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET history_id = $2, last_synced_at = NOW(), checkpoint_holds = 0 \
             WHERE id = $1",
        )
        .bind(account_id)
        .bind(history_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("account {account_id}")));
        }
        Ok(())
    }

    async fn record_checkpoint_hold(&self, account_id: i64) -> AppResult<i32> {
        let holds: Option<i32> = sqlx::query_scalar(
            "UPDATE accounts SET checkpoint_holds = checkpoint_holds + 1 WHERE id = $1 \
             RETURNING checkpoint_holds",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        holds.ok_or_else(|| AppError::NotFound(format!("account {account_id}")))
    }

    async fn list_categories(&self, user_id: i64) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn message_exists(&self, provider_message_id: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM messages WHERE provider_message_id = $1)",
        )
        .bind(provider_message_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_message(&self, new: NewMessage) -> AppResult<InsertOutcome> {
        let message = &new.message;
        let inserted = sqlx::query_as::<_, StoredMessage>(&format!(
            "INSERT INTO messages (account_id, category_id, provider_message_id, thread_id, subject, \
             sender_name, sender_email, recipient, received_at, body_text, body_html, summary, \
             headers, labels, unsubscribe_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (provider_message_id) DO NOTHING \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(new.account_id)
        .bind(new.category_id)
        .bind(&message.provider_message_id)
        .bind(&message.thread_id)
        .bind(&message.subject)
        .bind(&message.sender_name)
        .bind(&message.sender_email)
        .bind(&message.recipient)
        .bind(message.received_at)
        .bind(&message.body_text)
        .bind(&message.body_html)
        .bind(&new.summary)
        .bind(Json(&message.headers))
        .bind(Json(&message.labels))
        .bind(&message.unsubscribe_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match inserted {
            Some(stored) => InsertOutcome::Inserted(stored),
            None => InsertOutcome::AlreadyImported,
        })
    }

    async fn get_message(&self, id: i64) -> AppResult<Option<StoredMessage>> {
        let message = sqlx::query_as::<_, StoredMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    async fn mark_archived(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE messages SET is_archived = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_deleted(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE messages SET is_deleted = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_category(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> AppResult<Vec<StoredMessage>> {
        let messages = sqlx::query_as::<_, StoredMessage>(&format!(
            "SELECT {columns} FROM messages m \
             JOIN categories c ON c.id = m.category_id \
             WHERE m.category_id = $1 AND c.user_id = $2 AND m.is_deleted = FALSE \
             ORDER BY m.received_at DESC",
            columns = prefixed_message_columns("m"),
        ))
        .bind(category_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn messages_owned_by(&self, user_id: i64, ids: &[i64]) -> AppResult<Vec<StoredMessage>> {
        let messages = sqlx::query_as::<_, StoredMessage>(&format!(
            "SELECT {columns} FROM messages m \
             JOIN accounts a ON a.id = m.account_id \
             WHERE m.id = ANY($1) AND a.user_id = $2 \
             ORDER BY m.id",
            columns = prefixed_message_columns("m"),
        ))
        .bind(ids)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}

fn prefixed_message_columns(alias: &str) -> String {
    MESSAGE_COLUMNS
        .split(',')
        .map(|column| format!("{alias}.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
