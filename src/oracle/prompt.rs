use crate::models::{Category, ParsedMessage};

use super::model::ChatRequest;

const CATEGORIZE_BODY_CHARS: usize = 1_000;
const SUMMARIZE_BODY_CHARS: usize = 3_000;

const CATEGORIZE_SYSTEM: &str =
    "You are an email categorization assistant. Respond only with a category ID number.";
const SUMMARIZE_SYSTEM: &str =
    "You are an email summarization assistant. Provide concise, actionable summaries.";

pub fn categorize_request(message: &ParsedMessage, categories: &[Category]) -> ChatRequest {
    let listing = categories
        .iter()
        .map(|category| {
            format!(
                "ID: {}, Name: {}, Description: {}",
                category.id, category.name, category.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "Given the following email and list of categories, determine which category best fits \
         this email.\n\n\
         Email Subject: {subject}\n\
         Email From: {from}\n\
         Email Body (first {limit} chars): {body}\n\n\
         Categories:\n{listing}\n\n\
         Respond with ONLY the category ID number that best matches this email. \
         If no category is a good fit, respond with \"0\".",
        subject = message.subject,
        from = message.sender_email,
        limit = CATEGORIZE_BODY_CHARS,
        body = head(&message.body_text, CATEGORIZE_BODY_CHARS),
    );

    ChatRequest {
        system: CATEGORIZE_SYSTEM.to_string(),
        user,
        temperature: 0.3,
        max_tokens: 10,
    }
}

pub fn summarize_request(message: &ParsedMessage) -> ChatRequest {
    let user = format!(
        "Summarize the following email in 1-2 concise sentences. \
         Focus on the main point or action items.\n\n\
         Subject: {subject}\n\
         From: {from}\n\
         Body: {body}\n\n\
         Summary:",
        subject = message.subject,
        from = message.sender_email,
        body = head(&message.body_text, SUMMARIZE_BODY_CHARS),
    );

    ChatRequest {
        system: SUMMARIZE_SYSTEM.to_string(),
        user,
        temperature: 0.5,
        max_tokens: 150,
    }
}

fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    fn message(body: &str) -> ParsedMessage {
        ParsedMessage {
            provider_message_id: "m1".to_string(),
            thread_id: "m1".to_string(),
            subject: "Weekly deals".to_string(),
            sender_name: "Shop".to_string(),
            sender_email: "deals@shop.example".to_string(),
            recipient: "me@example.com".to_string(),
            received_at: Utc::now(),
            body_text: body.to_string(),
            body_html: None,
            headers: BTreeMap::new(),
            labels: Vec::new(),
            unsubscribe_url: None,
        }
    }

    #[test]
    fn categorize_lists_every_category() {
        let categories = vec![
            Category {
                id: 4,
                name: "Shopping".to_string(),
                description: "Receipts and promotions".to_string(),
            },
            Category {
                id: 9,
                name: "Work".to_string(),
                description: "Anything from colleagues".to_string(),
            },
        ];

        let request = categorize_request(&message("50% off"), &categories);
        assert!(request
            .user
            .contains("ID: 4, Name: Shopping, Description: Receipts and promotions"));
        assert!(request
            .user
            .contains("ID: 9, Name: Work, Description: Anything from colleagues"));
        assert!(request.user.contains("Email From: deals@shop.example"));
        assert_eq!(request.max_tokens, 10);
    }

    #[test]
    fn body_excerpts_are_bounded() {
        let body = "é".repeat(5_000);
        let categorize = categorize_request(&message(&body), &[]);
        let summarize = summarize_request(&message(&body));

        assert!(categorize.user.contains(&"é".repeat(1_000)));
        assert!(!categorize.user.contains(&"é".repeat(1_001)));
        assert!(summarize.user.contains(&"é".repeat(3_000)));
        assert!(!summarize.user.contains(&"é".repeat(3_001)));
    }

    #[test]
    fn head_keeps_short_text() {
        assert_eq!(head("short", 10), "short");
        assert_eq!(head("abcdef", 3), "abc");
    }
}
