use std::sync::Arc;

use tracing::info;

use crate::cli::SyncArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::output::OutputMode;
use crate::sync::{SyncCoordinator, SyncReport};

pub async fn run(ctx: &AppContext, args: SyncArgs) -> AppResult<()> {
    let store = ctx.store().await?;
    let connector = ctx.connector(Arc::clone(&store))?;
    let coordinator = SyncCoordinator::new(store, connector, ctx.oracle()?);

    let handle = coordinator.spawn_sync(&ctx.runner, args.user).await?;
    info!(task = handle.name(), "sync accepted");
    let reports = handle.wait().await?;

    if ctx.output.mode() == OutputMode::Text {
        if reports.is_empty() {
            println!("nothing to sync (no categories defined)");
        }
        for report in &reports {
            println!("{}", describe(report));
        }
        return Ok(());
    }

    ctx.output.emit("", &reports)
}

fn describe(report: &SyncReport) -> String {
    if let Some(error) = &report.error {
        return format!("{}: failed: {error}", report.account_email);
    }

    let mut line = format!(
        "{}: {} candidates, {} imported, {} unmatched, {} already imported",
        report.account_email,
        report.candidates,
        report.imported,
        report.unmatched,
        report.already_imported
    );
    if report.vanished > 0 {
        line.push_str(&format!(", {} gone before fetch", report.vanished));
    }
    if report.archive_failures > 0 {
        line.push_str(&format!(", {} left in inbox", report.archive_failures));
    }
    if report.item_failures > 0 {
        line.push_str(&format!(", {} failed", report.item_failures));
    }
    if !report.checkpoint_advanced {
        line.push_str(" (checkpoint unchanged)");
    }
    line
}
