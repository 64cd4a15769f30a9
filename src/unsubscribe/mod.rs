pub mod browser;
pub mod chromium;
pub mod engine;
pub mod rules;

pub use browser::{BrowserAutomation, BrowserPage, BrowserSession, ControlSnapshot};
pub use chromium::ChromiumAutomation;
pub use engine::{EngineTimings, Stage, UnsubscribeEngine, UnsubscribeOutcome};
