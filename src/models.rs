use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::Json;

use crate::auth::TokenSet;

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub email: String,
    pub token: TokenSet,
    pub history_id: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub checkpoint_holds: i32,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedMessage {
    pub provider_message_id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender_name: String,
    pub sender_email: String,
    pub recipient: String,
    pub received_at: DateTime<Utc>,
    pub body_text: String,
    pub body_html: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub labels: Vec<String>,
    pub unsubscribe_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub account_id: i64,
    pub category_id: i64,
    pub summary: String,
    pub message: ParsedMessage,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoredMessage {
    pub id: i64,
    pub account_id: i64,
    pub category_id: i64,
    pub provider_message_id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender_name: String,
    pub sender_email: String,
    pub recipient: String,
    pub received_at: DateTime<Utc>,
    pub body_text: String,
    pub body_html: Option<String>,
    pub summary: String,
    pub headers: Json<BTreeMap<String, String>>,
    pub labels: Json<Vec<String>>,
    pub unsubscribe_url: Option<String>,
    pub is_archived: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn from_new(id: i64, new: NewMessage, created_at: DateTime<Utc>) -> Self {
        let NewMessage {
            account_id,
            category_id,
            summary,
            message,
        } = new;

        Self {
            id,
            account_id,
            category_id,
            provider_message_id: message.provider_message_id,
            thread_id: message.thread_id,
            subject: message.subject,
            sender_name: message.sender_name,
            sender_email: message.sender_email,
            recipient: message.recipient,
            received_at: message.received_at,
            body_text: message.body_text,
            body_html: message.body_html,
            summary,
            headers: Json(message.headers),
            labels: Json(message.labels),
            unsubscribe_url: message.unsubscribe_url,
            is_archived: false,
            is_deleted: false,
            created_at,
        }
    }

    pub fn unsubscribe_target(&self) -> Option<&str> {
        self.unsubscribe_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
