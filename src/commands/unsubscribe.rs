use crate::cli::UnsubscribeArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::unsubscribe::UnsubscribeEngine;

pub async fn run(ctx: &AppContext, args: UnsubscribeArgs) -> AppResult<()> {
    let engine = UnsubscribeEngine::new(ctx.browser());
    let outcome = engine.unsubscribe(&args.url).await;
    engine.close().await?;

    let status = if outcome.success { "ok" } else { "failed" };
    let text = format!("{status}: {}", outcome.message);
    ctx.output.emit(&text, &outcome)
}
