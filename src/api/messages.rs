pub fn message_endpoint(id: &str) -> String {
    format!("/gmail/v1/users/me/messages/{id}")
}

pub fn list_endpoint() -> &'static str {
    "/gmail/v1/users/me/messages"
}

pub fn modify_endpoint(id: &str) -> String {
    format!("/gmail/v1/users/me/messages/{id}/modify")
}

pub fn trash_endpoint(id: &str) -> String {
    format!("/gmail/v1/users/me/messages/{id}/trash")
}

pub fn history_endpoint() -> &'static str {
    "/gmail/v1/users/me/history"
}

pub fn profile_endpoint() -> &'static str {
    "/gmail/v1/users/me/profile"
}

pub fn get_query() -> Vec<(String, String)> {
    vec![("format".to_string(), "full".to_string())]
}

pub fn list_query(limit: u32, query: &str) -> Vec<(String, String)> {
    let mut params = vec![("maxResults".to_string(), limit.to_string())];
    let query = query.trim();
    if !query.is_empty() {
        params.push(("q".to_string(), query.to_string()));
    }
    params
}

pub fn history_query(start_history_id: &str, page_token: Option<&str>) -> Vec<(String, String)> {
    let mut params = vec![
        ("startHistoryId".to_string(), start_history_id.to_string()),
        ("historyTypes".to_string(), "messageAdded".to_string()),
    ];
    if let Some(page_token) = page_token {
        params.push(("pageToken".to_string(), page_token.to_string()));
    }
    params
}
