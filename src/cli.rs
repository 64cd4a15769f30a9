use clap::{ArgAction, Args, Parser, Subcommand};

use crate::bulk::BulkAction;

#[derive(Debug, Parser)]
#[command(
    name = "mailsort",
    version,
    about = "Sort Gmail into categories and clean up mailing lists"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "default",
        help = "Profile name to use"
    )]
    pub profile: String,
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Verbose logging")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Migrate,
    Sync(SyncArgs),
    Messages(MessagesArgs),
    Get(GetArgs),
    Bulk(BulkArgs),
    Unsubscribe(UnsubscribeArgs),
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[arg(long, help = "Owning user id")]
    pub user: i64,
}

#[derive(Debug, Args)]
pub struct MessagesArgs {
    #[arg(long, help = "Owning user id")]
    pub user: i64,
    #[arg(long, help = "Category id")]
    pub category: i64,
    #[arg(long, default_value_t = 50, help = "Maximum messages to print")]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    #[arg(long, help = "Owning user id")]
    pub user: i64,
    #[arg(help = "Message id")]
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct BulkArgs {
    #[arg(value_enum, help = "Action to apply")]
    pub action: BulkAction,
    #[arg(long, help = "Requesting user id")]
    pub user: i64,
    #[arg(required = true, num_args = 1.., help = "Message ids")]
    pub ids: Vec<i64>,
}

#[derive(Debug, Args)]
pub struct UnsubscribeArgs {
    #[arg(help = "Unsubscribe page URL")]
    pub url: String,
}
