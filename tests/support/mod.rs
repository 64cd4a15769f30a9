#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};

use mailsort::api::models::{HistoryDelta, RawBody, RawHeader, RawMessage, RawPayload};
use mailsort::auth::TokenSet;
use mailsort::error::{AppError, AppResult};
use mailsort::mailbox::{Mailbox, MailboxBatch, MailboxConnector};
use mailsort::models::{Account, Category, ParsedMessage};
use mailsort::oracle::{ChatRequest, ClassificationOracle, CompletionModel, SUMMARY_FALLBACK};
use mailsort::unsubscribe::{BrowserAutomation, BrowserPage, BrowserSession, ControlSnapshot};

pub fn token() -> TokenSet {
    TokenSet {
        access_token: "access".to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}

pub fn encode(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

pub fn header(name: &str, value: &str) -> RawHeader {
    RawHeader {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Single-part `text/plain` message.
pub fn raw_message(id: &str, subject: &str, body: &str) -> RawMessage {
    raw_message_with_headers(
        id,
        vec![
            header("Subject", subject),
            header("From", "\"Deals Team\" <deals@shop.example>"),
            header("To", "me@example.com"),
            header("Date", "Tue, 15 Oct 2024 09:30:00 +0000"),
        ],
        body,
    )
}

pub fn raw_message_with_headers(id: &str, headers: Vec<RawHeader>, body: &str) -> RawMessage {
    RawMessage {
        id: id.to_string(),
        thread_id: Some(format!("thread-{id}")),
        label_ids: Some(vec!["INBOX".to_string()]),
        snippet: None,
        payload: Some(RawPayload {
            mime_type: Some("text/plain".to_string()),
            headers: Some(headers),
            body: Some(RawBody {
                data: Some(encode(body)),
            }),
            parts: None,
        }),
    }
}

/// Completion model that answers by request shape and counts calls.
pub struct StubModel {
    category_reply: AppResult<String>,
    summary_reply: AppResult<String>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl StubModel {
    pub fn replying(category: &str, summary: &str) -> Self {
        Self {
            category_reply: Ok(category.to_string()),
            summary_reply: Ok(summary.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            category_reply: Err(AppError::Oracle("model offline".to_string())),
            summary_reply: Err(AppError::Oracle("model offline".to_string())),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn clone_reply(reply: &AppResult<String>) -> AppResult<String> {
    match reply {
        Ok(text) => Ok(text.clone()),
        Err(err) => Err(AppError::Oracle(err.to_string())),
    }
}

#[async_trait]
impl CompletionModel for StubModel {
    async fn complete(&self, request: ChatRequest) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let categorize = request.max_tokens <= 10;
        self.requests.lock().unwrap().push(request);
        if categorize {
            clone_reply(&self.category_reply)
        } else {
            clone_reply(&self.summary_reply)
        }
    }
}

/// Model that never answers, for deadline tests.
pub struct HangingModel;

#[async_trait]
impl CompletionModel for HangingModel {
    async fn complete(&self, _request: ChatRequest) -> AppResult<String> {
        futures::future::pending::<()>().await;
        Ok(String::new())
    }
}

/// Oracle that routes by subject keyword: the first category whose lowercase name appears in the
/// subject wins.
#[derive(Default)]
pub struct KeywordOracle {
    pub categorize_calls: AtomicUsize,
    pub summarize_calls: AtomicUsize,
}

#[async_trait]
impl ClassificationOracle for KeywordOracle {
    async fn categorize(&self, message: &ParsedMessage, categories: &[Category]) -> Option<i64> {
        self.categorize_calls.fetch_add(1, Ordering::SeqCst);
        let subject = message.subject.to_lowercase();
        categories
            .iter()
            .find(|category| subject.contains(&category.name.to_lowercase()))
            .map(|category| category.id)
    }

    async fn summarize(&self, message: &ParsedMessage) -> String {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        if message.subject.is_empty() {
            return SUMMARY_FALLBACK.to_string();
        }
        format!("About {}", message.subject)
    }
}

#[derive(Default)]
pub struct ScriptedMailbox {
    pub messages: Vec<RawMessage>,
    pub checkpoint: Option<String>,
    pub vanished: usize,
    pub fetch_failures: usize,
    pub archive_fails: bool,
    pub trash_fails: bool,
    pub listed_with: Mutex<Vec<Option<String>>>,
    pub archived: Mutex<Vec<String>>,
    pub trashed: Mutex<Vec<String>>,
}

impl ScriptedMailbox {
    pub fn with_messages(messages: Vec<RawMessage>, checkpoint: &str) -> Self {
        Self {
            messages,
            checkpoint: Some(checkpoint.to_string()),
            ..Self::default()
        }
    }

    pub fn archived(&self) -> Vec<String> {
        self.archived.lock().unwrap().clone()
    }

    pub fn trashed(&self) -> Vec<String> {
        self.trashed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailbox for ScriptedMailbox {
    async fn list_new(&self, checkpoint: Option<&str>) -> AppResult<MailboxBatch> {
        self.listed_with
            .lock()
            .unwrap()
            .push(checkpoint.map(ToOwned::to_owned));
        Ok(MailboxBatch {
            messages: self.messages.clone(),
            checkpoint: self.checkpoint.clone(),
            vanished: self.vanished,
            fetch_failures: self.fetch_failures,
        })
    }

    async fn get_message(&self, id: &str) -> AppResult<RawMessage> {
        self.messages
            .iter()
            .find(|message| message.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    async fn history_since(&self, _checkpoint: &str) -> AppResult<HistoryDelta> {
        Ok(HistoryDelta {
            message_ids: self.messages.iter().map(|message| message.id.clone()).collect(),
            history_id: self.checkpoint.clone(),
        })
    }

    async fn archive(&self, id: &str) -> bool {
        if self.archive_fails {
            return false;
        }
        self.archived.lock().unwrap().push(id.to_string());
        true
    }

    async fn trash(&self, id: &str) -> bool {
        if self.trash_fails {
            return false;
        }
        self.trashed.lock().unwrap().push(id.to_string());
        true
    }
}

/// Hands out a fixed mailbox per account id; unknown or broken accounts fail to connect.
#[derive(Default)]
pub struct ScriptedConnector {
    pub mailboxes: HashMap<i64, Arc<ScriptedMailbox>>,
    pub broken: HashSet<i64>,
    pub connects: AtomicUsize,
}

impl ScriptedConnector {
    pub fn with(account_id: i64, mailbox: Arc<ScriptedMailbox>) -> Self {
        let mut connector = Self::default();
        connector.mailboxes.insert(account_id, mailbox);
        connector
    }
}

#[async_trait]
impl MailboxConnector for ScriptedConnector {
    async fn connect(&self, account: &Account) -> AppResult<Arc<dyn Mailbox>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.broken.contains(&account.id) {
            return Err(AppError::Auth(format!("token revoked for {}", account.email)));
        }
        match self.mailboxes.get(&account.id) {
            Some(mailbox) => Ok(Arc::clone(mailbox) as Arc<dyn Mailbox>),
            None => Err(AppError::Api(format!("no mailbox for {}", account.email))),
        }
    }
}

pub fn control(tag: &str, text: &str, attrs: &[(&str, &str)]) -> ControlSnapshot {
    ControlSnapshot {
        index: 0,
        tag: tag.to_string(),
        text: text.to_string(),
        attributes: attrs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// One rendering of a scripted page. Clicking control `i` moves to `controls[i].1` if set.
#[derive(Clone, Default)]
pub struct PageState {
    pub text: String,
    pub controls: Vec<(ControlSnapshot, Option<usize>)>,
    pub failing_clicks: HashSet<usize>,
}

impl PageState {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn with_control(mut self, control: ControlSnapshot, leads_to: Option<usize>) -> Self {
        self.controls.push((control, leads_to));
        self
    }

    pub fn with_failing_click(mut self, index: usize) -> Self {
        self.failing_clicks.insert(index);
        self
    }
}

#[derive(Default)]
pub struct BrowserLog {
    pub sessions_started: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub visited: Mutex<Vec<String>>,
    pub clicked: Mutex<Vec<String>>,
}

impl BrowserLog {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Browser whose pages are state machines keyed by URL. Unknown URLs fail to load.
#[derive(Clone, Default)]
pub struct ScriptedBrowser {
    pub pages: Arc<HashMap<String, Vec<PageState>>>,
    pub log: Arc<BrowserLog>,
    pub fail_start: bool,
}

impl ScriptedBrowser {
    pub fn new(pages: Vec<(&str, Vec<PageState>)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, states)| (url.to_string(), states))
                    .collect(),
            ),
            ..Self::default()
        }
    }
}

#[async_trait]
impl BrowserAutomation for ScriptedBrowser {
    async fn start(&self) -> AppResult<Box<dyn BrowserSession>> {
        if self.fail_start {
            return Err(AppError::Browser("chromium not installed".to_string()));
        }
        self.log.sessions_started.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            browser: self.clone(),
        }))
    }
}

struct ScriptedSession {
    browser: ScriptedBrowser,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn open_page(&self) -> AppResult<Box<dyn BrowserPage>> {
        self.browser.log.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            browser: self.browser.clone(),
            current: Mutex::new(None),
        }))
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        self.browser.log.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedPage {
    browser: ScriptedBrowser,
    current: Mutex<Option<(String, usize)>>,
}

impl ScriptedPage {
    fn state(&self) -> AppResult<PageState> {
        let current = self.current.lock().unwrap().clone();
        let (url, index) = current.ok_or_else(|| AppError::Browser("no page loaded".to_string()))?;
        Ok(self.browser.pages[&url][index].clone())
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn goto(&self, url: &str) -> AppResult<()> {
        self.browser.log.visited.lock().unwrap().push(url.to_string());
        if !self.browser.pages.contains_key(url) {
            return Err(AppError::Browser(format!("net::ERR_NAME_NOT_RESOLVED at {url}")));
        }
        *self.current.lock().unwrap() = Some((url.to_string(), 0));
        Ok(())
    }

    async fn controls(&self) -> AppResult<Vec<ControlSnapshot>> {
        let state = self.state()?;
        Ok(state
            .controls
            .into_iter()
            .enumerate()
            .map(|(index, (control, _))| ControlSnapshot { index, ..control })
            .collect())
    }

    async fn click(&self, index: usize) -> AppResult<()> {
        let state = self.state()?;
        let (control, leads_to) = state
            .controls
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::Browser(format!("no element at {index}")))?;
        self.browser
            .log
            .clicked
            .lock()
            .unwrap()
            .push(control.text.clone());
        if state.failing_clicks.contains(&index) {
            return Err(AppError::Browser("element is not clickable".to_string()));
        }
        if let Some(next) = leads_to {
            if let Some((_, current)) = self.current.lock().unwrap().as_mut() {
                *current = next;
            }
        }
        Ok(())
    }

    async fn visible_text(&self) -> AppResult<String> {
        Ok(self.state()?.text)
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        self.browser.log.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
