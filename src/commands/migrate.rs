use serde_json::json;

use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(ctx: &AppContext) -> AppResult<()> {
    let store = ctx.pg_store().await?;
    store.migrate().await?;
    ctx.output
        .emit("migrations applied", &json!({ "migrated": true }))
}
