use std::sync::Arc;

use reqwest::Client;

use crate::api::client::GmailClient;
use crate::auth::OAuthClient;
use crate::config::{self, AppPaths, Settings};
use crate::error::AppResult;
use crate::mailbox::{GmailConnector, MailboxConnector};
use crate::oracle::{ClassificationOracle, LlmOracle, OpenAiChat};
use crate::output::Output;
use crate::store::{MessageStore, PgStore};
use crate::tasks::TaskRunner;
use crate::unsubscribe::{BrowserAutomation, ChromiumAutomation};

#[derive(Debug)]
pub struct AppContext {
    pub profile: String,
    pub settings: Settings,
    pub http: Client,
    pub runner: TaskRunner,
    pub output: Output,
}

impl AppContext {
    pub fn bootstrap(profile: String, json: bool) -> AppResult<Self> {
        let profile = config::resolve_profile(&profile)?;
        let paths = AppPaths::discover()?;
        let settings = config::load_settings(&paths, &profile)?;

        Ok(Self {
            profile,
            settings,
            http: Client::new(),
            runner: TaskRunner::new(),
            output: Output::new(json),
        })
    }

    pub async fn pg_store(&self) -> AppResult<PgStore> {
        PgStore::connect(self.settings.database_url()?).await
    }

    pub async fn store(&self) -> AppResult<Arc<dyn MessageStore>> {
        Ok(Arc::new(self.pg_store().await?))
    }

    pub fn connector(&self, store: Arc<dyn MessageStore>) -> AppResult<Arc<dyn MailboxConnector>> {
        let oauth = OAuthClient::from_settings(self.http.clone(), &self.settings)?;
        Ok(Arc::new(GmailConnector::new(
            GmailClient::new(self.http.clone()),
            oauth,
            store,
            self.settings.sync.clone(),
        )))
    }

    pub fn oracle(&self) -> AppResult<Arc<dyn ClassificationOracle>> {
        let model = OpenAiChat::from_settings(self.http.clone(), &self.settings.oracle)?;
        Ok(Arc::new(LlmOracle::new(
            Arc::new(model),
            self.settings.oracle.timeout(),
        )))
    }

    pub fn browser(&self) -> Arc<dyn BrowserAutomation> {
        Arc::new(ChromiumAutomation::from_settings(&self.settings.browser))
    }
}
