use std::sync::Arc;

use tracing::info;

use crate::bulk::{BulkActionCoordinator, BulkReceipt, DeleteReport, UnsubscribeReport};
use crate::cli::BulkArgs;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(ctx: &AppContext, args: BulkArgs) -> AppResult<()> {
    let store = ctx.store().await?;
    let connector = ctx.connector(Arc::clone(&store))?;
    let coordinator =
        BulkActionCoordinator::new(store, connector, ctx.browser(), ctx.runner.clone());

    match coordinator.apply(args.user, args.action, &args.ids).await? {
        BulkReceipt::Deleted(report) => ctx.output.emit(&describe_delete(&report), &report),
        BulkReceipt::Accepted(handle) => {
            info!(task = handle.name(), "unsubscribe accepted");
            let report = handle.wait().await?;
            ctx.output.emit(&describe_unsubscribe(&report), &report)
        }
    }
}

fn describe_delete(report: &DeleteReport) -> String {
    let mut line = format!("deleted {} of {} messages", report.deleted, report.requested);
    if report.trash_failures > 0 {
        line.push_str(&format!(" ({} not trashed in gmail)", report.trash_failures));
    }
    line
}

fn describe_unsubscribe(report: &UnsubscribeReport) -> String {
    let mut lines = vec![format!(
        "unsubscribed {} of {} messages ({} without a link)",
        report.succeeded, report.requested, report.skipped_without_target
    )];
    for result in &report.results {
        let mark = if result.outcome.success { "ok" } else { "failed" };
        lines.push(format!(
            "  #{} {mark}: {} ({})",
            result.message_id, result.outcome.message, result.url
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_summary_mentions_remote_failures() {
        let report = DeleteReport {
            requested: 3,
            deleted: 3,
            trash_failures: 1,
            store_failures: 0,
        };
        assert_eq!(
            describe_delete(&report),
            "deleted 3 of 3 messages (1 not trashed in gmail)"
        );
    }

    #[test]
    fn unsubscribe_summary_counts_skips() {
        let report = UnsubscribeReport {
            requested: 2,
            skipped_without_target: 2,
            ..UnsubscribeReport::default()
        };
        assert_eq!(
            describe_unsubscribe(&report),
            "unsubscribed 0 of 2 messages (2 without a link)"
        );
    }
}
