use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

use super::browser::{BrowserAutomation, BrowserPage, BrowserSession, ControlSnapshot};
use super::rules::{
    CONFIRM_RULES, EMAIL_INPUT_RULES, FORM_SUBMIT_RULES, Locator, PRIMARY_RULES, first_in,
    success_pattern,
};

const MSG_UNSUBSCRIBED: &str = "Successfully unsubscribed";
const MSG_CONFIRMED: &str = "Unsubscribe confirmed";
const MSG_NOT_FOUND: &str = "Could not find unsubscribe button or form";
const MSG_NO_URL: &str = "No unsubscribe URL provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    PageLoaded,
    ActionAttempted,
    Confirmed,
    ConfirmationPending,
    SecondaryConfirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsubscribeOutcome {
    pub success: bool,
    pub message: String,
    pub stage: Stage,
}

impl UnsubscribeOutcome {
    fn succeeded(stage: Stage, message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            stage,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            stage: Stage::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTimings {
    pub navigation: Duration,
    pub click: Duration,
    pub settle_after_action: Duration,
    pub settle_after_load: Duration,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(15),
            click: Duration::from_secs(5),
            settle_after_action: Duration::from_secs(2),
            settle_after_load: Duration::from_secs(1),
        }
    }
}

impl EngineTimings {
    pub fn immediate() -> Self {
        Self {
            navigation: Duration::from_secs(15),
            click: Duration::from_secs(5),
            settle_after_action: Duration::ZERO,
            settle_after_load: Duration::ZERO,
        }
    }
}

pub struct UnsubscribeEngine {
    automation: Arc<dyn BrowserAutomation>,
    session: Mutex<Option<Box<dyn BrowserSession>>>,
    timings: EngineTimings,
}

impl UnsubscribeEngine {
    pub fn new(automation: Arc<dyn BrowserAutomation>) -> Self {
        Self::with_timings(automation, EngineTimings::default())
    }

    pub fn with_timings(automation: Arc<dyn BrowserAutomation>, timings: EngineTimings) -> Self {
        Self {
            automation,
            session: Mutex::new(None),
            timings,
        }
    }

    /// Runs the full heuristic against one URL. Never errors; failures are reported in the outcome.
    pub async fn unsubscribe(&self, url: &str) -> UnsubscribeOutcome {
        let url = url.trim();
        if url.is_empty() {
            return UnsubscribeOutcome::failed(MSG_NO_URL);
        }

        let page = match self.open_page().await {
            Ok(page) => page,
            Err(err) => return UnsubscribeOutcome::failed(format!("Error: {err}")),
        };

        let outcome = match self.load(page.as_ref(), url).await {
            Ok(()) => self.drive(page.as_ref()).await,
            Err(err) => UnsubscribeOutcome::failed(format!("Error: {err}")),
        };

        if let Err(err) = page.close().await {
            debug!(error = %err, "failed to close page");
        }

        info!(
            url,
            success = outcome.success,
            stage = ?outcome.stage,
            message = %outcome.message,
            "unsubscribe attempt finished"
        );
        outcome
    }

    pub async fn close(&self) -> AppResult<()> {
        let session = self.session.lock().await.take();
        match session {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }

    async fn open_page(&self) -> AppResult<Box<dyn BrowserPage>> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.automation.start().await?);
        }
        match session.as_ref() {
            Some(session) => session.open_page().await,
            None => Err(AppError::Browser("browser session unavailable".to_string())),
        }
    }

    async fn load(&self, page: &dyn BrowserPage, url: &str) -> AppResult<()> {
        debug!(url, stage = ?Stage::Init, "navigating");
        tokio::time::timeout(self.timings.navigation, page.goto(url))
            .await
            .map_err(|_| {
                AppError::Browser(format!(
                    "navigation timed out after {}ms",
                    self.timings.navigation.as_millis()
                ))
            })??;
        tokio::time::sleep(self.timings.settle_after_load).await;
        debug!(url, stage = ?Stage::PageLoaded, "page loaded");
        Ok(())
    }

    async fn drive(&self, page: &dyn BrowserPage) -> UnsubscribeOutcome {
        for rule in PRIMARY_RULES {
            let Some(target) = self.locate(page, rule).await else {
                continue;
            };

            debug!(rule = rule.label, stage = ?Stage::ActionAttempted, "clicking primary control");
            if !self.click(page, &target, rule.label).await {
                continue;
            }
            if self.confirmed(page).await {
                return UnsubscribeOutcome::succeeded(Stage::Confirmed, MSG_UNSUBSCRIBED);
            }

            debug!(rule = rule.label, stage = ?Stage::ConfirmationPending, "no confirmation yet");
            if self.try_confirm_step(page).await {
                return UnsubscribeOutcome::succeeded(Stage::SecondaryConfirmed, MSG_UNSUBSCRIBED);
            }
        }

        if self.try_email_form(page).await {
            return UnsubscribeOutcome::succeeded(Stage::Confirmed, MSG_UNSUBSCRIBED);
        }

        if self.confirmed(page).await {
            return UnsubscribeOutcome::succeeded(Stage::Confirmed, MSG_CONFIRMED);
        }

        UnsubscribeOutcome::failed(MSG_NOT_FOUND)
    }

    async fn try_confirm_step(&self, page: &dyn BrowserPage) -> bool {
        for rule in CONFIRM_RULES {
            let Some(target) = self.locate(page, rule).await else {
                continue;
            };
            if !self.click(page, &target, rule.label).await {
                return false;
            }
            if self.confirmed(page).await {
                return true;
            }
        }
        false
    }

    async fn try_email_form(&self, page: &dyn BrowserPage) -> bool {
        let controls = self.snapshot(page).await;
        if first_in(EMAIL_INPUT_RULES, &controls).is_none() {
            return false;
        }
        let Some((label, submit)) = first_in(FORM_SUBMIT_RULES, &controls) else {
            return false;
        };

        debug!(rule = label, "submitting email form");
        self.click(page, submit, label).await && self.confirmed(page).await
    }

    async fn locate(&self, page: &dyn BrowserPage, rule: &Locator) -> Option<ControlSnapshot> {
        let controls = self.snapshot(page).await;
        rule.first_match(&controls).cloned()
    }

    async fn snapshot(&self, page: &dyn BrowserPage) -> Vec<ControlSnapshot> {
        match page.controls().await {
            Ok(controls) => controls,
            Err(err) => {
                debug!(error = %err, "control snapshot failed");
                Vec::new()
            }
        }
    }

    async fn click(&self, page: &dyn BrowserPage, target: &ControlSnapshot, label: &str) -> bool {
        match tokio::time::timeout(self.timings.click, page.click(target.index)).await {
            Ok(Ok(())) => {
                tokio::time::sleep(self.timings.settle_after_action).await;
                true
            }
            Ok(Err(err)) => {
                warn!(rule = label, error = %err, "click failed");
                false
            }
            Err(_) => {
                warn!(rule = label, "click timed out");
                false
            }
        }
    }

    async fn confirmed(&self, page: &dyn BrowserPage) -> bool {
        match page.visible_text().await {
            Ok(text) => match success_pattern(&text) {
                Some(pattern) => {
                    debug!(pattern, "success text found");
                    true
                }
                None => false,
            },
            Err(err) => {
                debug!(error = %err, "could not read page text");
                false
            }
        }
    }
}
