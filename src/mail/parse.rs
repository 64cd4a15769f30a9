use std::collections::BTreeMap;
use std::panic;
use std::sync::LazyLock;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::engine::DecodePaddingMode;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::api::models::{RawHeader, RawMessage, RawPayload};
use crate::models::ParsedMessage;

use super::links::extract_unsubscribe_url;

pub const MAX_TEXT_CHARS: usize = 50_000;
pub const MAX_HTML_CHARS: usize = 100_000;
const HTML_RENDER_WIDTH: usize = 120;
const NO_SUBJECT: &str = "(No Subject)";

const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static NAMED_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*<(.+?)>$").expect("valid sender pattern"));

static TRAILING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("valid comment pattern"));

pub fn parse_message(raw: &RawMessage) -> ParsedMessage {
    let payload = raw.payload.clone().unwrap_or_default();
    let raw_headers = payload.headers.clone().unwrap_or_default();

    let (body_text, body_html) = extract_bodies(&payload);
    let unsubscribe_url = extract_unsubscribe_url(
        header_value(&raw_headers, "List-Unsubscribe").as_deref(),
        &body_text,
    );

    let (sender_name, sender_email) =
        parse_sender(&header_value(&raw_headers, "From").unwrap_or_default());

    ParsedMessage {
        provider_message_id: raw.id.clone(),
        thread_id: raw.thread_id.clone().unwrap_or_else(|| raw.id.clone()),
        subject: header_value(&raw_headers, "Subject").unwrap_or_else(|| NO_SUBJECT.to_string()),
        sender_name,
        sender_email,
        recipient: header_value(&raw_headers, "To").unwrap_or_default(),
        received_at: parse_received_at(header_value(&raw_headers, "Date").as_deref()),
        body_text: truncate_chars(&body_text, MAX_TEXT_CHARS),
        body_html: body_html.map(|html| truncate_chars(&html, MAX_HTML_CHARS)),
        headers: raw_headers
            .into_iter()
            .map(|header| (strip_nul(&header.name), strip_nul(&header.value)))
            .collect::<BTreeMap<_, _>>(),
        labels: raw.label_ids.clone().unwrap_or_default(),
        unsubscribe_url,
    }
}

pub fn parse_sender(from: &str) -> (String, String) {
    let from = from.trim();
    if let Some(captures) = NAMED_ADDRESS.captures(from) {
        let name = captures[1].trim().trim_matches('"').trim().to_string();
        let address = captures[2].trim().to_string();
        return (name, address);
    }

    (from.to_string(), from.to_string())
}

fn parse_received_at(date: Option<&str>) -> DateTime<Utc> {
    let Some(date) = date.map(str::trim).filter(|date| !date.is_empty()) else {
        return Utc::now();
    };

    let candidates = [date.to_string(), TRAILING_COMMENT.replace(date, "").into_owned()];
    for candidate in &candidates {
        if let Ok(parsed) = DateTime::parse_from_rfc2822(candidate) {
            return parsed.with_timezone(&Utc);
        }
    }

    debug!(date, "unparseable date header, using current time");
    Utc::now()
}

fn extract_bodies(payload: &RawPayload) -> (String, Option<String>) {
    let mut text = String::new();
    let mut html = String::new();
    collect_parts(payload, &mut text, &mut html);

    let html = (!html.is_empty()).then_some(html);
    if text.trim().is_empty() {
        if let Some(html) = html.as_deref() {
            text = html_to_text(html);
        }
    }

    (text, html)
}

fn collect_parts(payload: &RawPayload, text: &mut String, html: &mut String) {
    let mime_type = payload
        .mime_type
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if let Some(data) = payload.body.as_ref().and_then(|body| body.data.as_deref()) {
        if let Some(decoded) = decode_body_data(data) {
            match mime_type.as_str() {
                "text/plain" => text.push_str(&decoded),
                "text/html" => html.push_str(&decoded),
                _ => {}
            }
        }
    }

    for part in payload.parts.iter().flatten() {
        collect_parts(part, text, html);
    }
}

fn decode_body_data(data: &str) -> Option<String> {
    let bytes = GMAIL_BASE64.decode(data.trim()).ok()?;
    Some(strip_nul(&String::from_utf8_lossy(&bytes)))
}

// Postgres text and jsonb reject U+0000.
fn strip_nul(value: &str) -> String {
    value.replace('\0', "")
}

fn html_to_text(html: &str) -> String {
    let rendered = panic::catch_unwind(|| html2text::from_read(html.as_bytes(), HTML_RENDER_WIDTH));
    match rendered {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Err(_) => {
            debug!("html renderer panicked, dropping html-derived text");
            String::new()
        }
    }
}

fn header_value(headers: &[RawHeader], target: &str) -> Option<String> {
    headers
        .iter()
        .rev()
        .find(|header| header.name.eq_ignore_ascii_case(target))
        .map(|header| strip_nul(header.value.trim()))
        .filter(|value| !value.is_empty())
}

fn truncate_chars(input: &str, limit: usize) -> String {
    match input.char_indices().nth(limit) {
        Some((end, _)) => input[..end].to_string(),
        None => input.to_string(),
    }
}
