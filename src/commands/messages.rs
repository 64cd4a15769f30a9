use crate::cli::MessagesArgs;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::output::OutputMode;

const PREVIEW_CHARS: usize = 120;

pub async fn run(ctx: &AppContext, args: MessagesArgs) -> AppResult<()> {
    if args.limit == 0 {
        return Err(AppError::InvalidInput(
            "--limit must be greater than 0".to_string(),
        ));
    }

    let store = ctx.store().await?;
    let mut messages = store.list_by_category(args.user, args.category).await?;
    messages.truncate(args.limit);

    if ctx.output.mode() == OutputMode::Text {
        if messages.is_empty() {
            println!("0 messages");
            return Ok(());
        }

        for (index, message) in messages.iter().enumerate() {
            let date = message.received_at.format("%Y-%m-%d %H:%M");
            let unsubscribe = message.unsubscribe_target().unwrap_or("-");

            println!("{}. #{} {}", index + 1, message.id, message.subject);
            println!("   from: {} <{}>", message.sender_name, message.sender_email);
            println!("   date: {date}");
            println!("   unsubscribe: {unsubscribe}");
            println!();
            println!("   {}", format_preview(&message.summary));

            if index + 1 < messages.len() {
                println!();
            }
        }

        return Ok(());
    }

    let text = format!("{} messages", messages.len());
    ctx.output.emit(&text, &messages)
}

fn format_preview(summary: &str) -> String {
    let decoded = html_escape::decode_html_entities(summary).to_string();
    let compact = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.is_empty() {
        return "(no summary)".to_string();
    }

    match compact.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &compact[..end]),
        None => compact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_summaries() {
        let preview = format_preview(&"word ".repeat(60));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn decodes_entities_and_collapses_whitespace() {
        assert_eq!(
            format_preview("Your order &amp; receipt\n\n  are   ready"),
            "Your order & receipt are ready"
        );
    }

    #[test]
    fn blank_summary_has_placeholder() {
        assert_eq!(format_preview("   "), "(no summary)");
    }
}
