use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// `index` is only meaningful for the snapshot it came from; the page must be re-snapshotted
/// after anything that may have changed the DOM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    pub index: usize,
    pub tag: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ControlSnapshot {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait BrowserAutomation: Send + Sync {
    async fn start(&self) -> AppResult<Box<dyn BrowserSession>>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn open_page(&self) -> AppResult<Box<dyn BrowserPage>>;
    async fn close(self: Box<Self>) -> AppResult<()>;
}

#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&self, url: &str) -> AppResult<()>;
    async fn controls(&self) -> AppResult<Vec<ControlSnapshot>>;
    async fn click(&self, index: usize) -> AppResult<()>;
    async fn visible_text(&self) -> AppResult<String>;
    async fn close(self: Box<Self>) -> AppResult<()>;
}
