pub mod api;
pub mod app;
pub mod auth;
pub mod bulk;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod mail;
pub mod mailbox;
pub mod models;
pub mod oracle;
pub mod output;
pub mod store;
pub mod sync;
pub mod tasks;
pub mod unsubscribe;

use cli::Cli;
use error::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    app::run(cli).await
}
