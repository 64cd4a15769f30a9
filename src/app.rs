use tracing::debug;

use crate::cli::{Cli, Command};
use crate::commands;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    let Cli {
        profile,
        json,
        verbose: _,
        command,
    } = cli;

    let ctx = AppContext::bootstrap(profile, json)?;
    debug!(profile = %ctx.profile, "context ready");

    match command {
        Command::Migrate => commands::migrate::run(&ctx).await,
        Command::Sync(args) => commands::sync::run(&ctx, args).await,
        Command::Messages(args) => commands::messages::run(&ctx, args).await,
        Command::Get(args) => commands::get::run(&ctx, args).await,
        Command::Bulk(args) => commands::bulk::run(&ctx, args).await,
        Command::Unsubscribe(args) => commands::unsubscribe::run(&ctx, args).await,
    }
}
