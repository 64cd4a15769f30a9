use crate::cli::GetArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::models::StoredMessage;
use crate::store::find_owned_message;

pub async fn run(ctx: &AppContext, args: GetArgs) -> AppResult<()> {
    let store = ctx.store().await?;
    let message = find_owned_message(store.as_ref(), args.user, args.id).await?;
    ctx.output.emit(&describe(&message), &message)
}

fn describe(message: &StoredMessage) -> String {
    let mut status = Vec::new();
    if message.is_archived {
        status.push("archived");
    }
    if message.is_deleted {
        status.push("deleted");
    }

    let mut lines = vec![
        format!("#{} {}", message.id, message.subject),
        format!("from: {} <{}>", message.sender_name, message.sender_email),
        format!("to: {}", message.recipient),
        format!("date: {}", message.received_at.format("%Y-%m-%d %H:%M")),
        format!("unsubscribe: {}", message.unsubscribe_target().unwrap_or("-")),
    ];
    if !status.is_empty() {
        lines.push(format!("status: {}", status.join(", ")));
    }
    lines.push(String::new());
    lines.push(format!("summary: {}", message.summary));
    lines.push(String::new());
    lines.push(message.body_text.clone());
    lines.join("\n")
}
