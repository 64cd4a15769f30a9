use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, AppResult};

use super::messages;
use super::models::{
    HistoryDelta, HistoryListResource, MessageListResource, ModifiedMessage, ModifyLabelsRequest,
    ProfileResource, RawMessage,
};

const GMAIL_API_BASE_URL: &str = "https://gmail.googleapis.com";
const INBOX_LABEL: &str = "INBOX";

#[derive(Debug, Clone)]
pub struct GmailClient {
    http: Client,
    base_url: String,
}

impl GmailClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: GMAIL_API_BASE_URL.to_string(),
        }
    }

    pub async fn get_message(&self, id: &str, access_token: &str) -> AppResult<RawMessage> {
        let endpoint = messages::message_endpoint(id);
        let query = messages::get_query();
        self.get_json(&endpoint, access_token, Some(&query)).await
    }

    pub async fn list_message_ids(
        &self,
        access_token: &str,
        limit: u32,
        query: &str,
    ) -> AppResult<Vec<String>> {
        let endpoint = messages::list_endpoint();
        let query_params = messages::list_query(limit, query);
        let list_resource: MessageListResource = self
            .get_json(endpoint, access_token, Some(&query_params))
            .await?;

        Ok(list_resource
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.id)
            .collect())
    }

    pub async fn history_since(
        &self,
        access_token: &str,
        start_history_id: &str,
    ) -> AppResult<HistoryDelta> {
        let endpoint = messages::history_endpoint();
        let mut delta = HistoryDelta::default();
        let mut page_token: Option<String> = None;

        loop {
            let query = messages::history_query(start_history_id, page_token.as_deref());
            let page: HistoryListResource =
                self.get_json(endpoint, access_token, Some(&query)).await?;

            for record in page.history.unwrap_or_default() {
                for added in record.messages_added.unwrap_or_default() {
                    if !delta.message_ids.contains(&added.message.id) {
                        delta.message_ids.push(added.message.id);
                    }
                }
            }

            if page.history_id.is_some() {
                delta.history_id = page.history_id;
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(delta)
    }

    pub async fn current_history_id(&self, access_token: &str) -> AppResult<Option<String>> {
        let profile: ProfileResource = self
            .get_json(messages::profile_endpoint(), access_token, None)
            .await?;
        Ok(profile.history_id)
    }

    pub async fn archive(&self, id: &str, access_token: &str) -> AppResult<()> {
        let endpoint = messages::modify_endpoint(id);
        let body = ModifyLabelsRequest {
            add_label_ids: Vec::new(),
            remove_label_ids: vec![INBOX_LABEL.to_string()],
        };

        let _: ModifiedMessage = self.post_json(&endpoint, access_token, &body).await?;
        Ok(())
    }

    pub async fn trash(&self, id: &str, access_token: &str) -> AppResult<()> {
        let endpoint = messages::trash_endpoint(id);
        let _: ModifiedMessage = self
            .post_json(&endpoint, access_token, &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query: Option<&[(String, String)]>,
    ) -> AppResult<T> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self.http.get(url).bearer_auth(access_token);
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await?;
        self.parse_json_response(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        access_token: &str,
        body: &B,
    ) -> AppResult<T> {
        let url = self.endpoint_url(endpoint)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await?;

        self.parse_json_response(response).await
    }

    fn endpoint_url(&self, endpoint: &str) -> AppResult<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.set_path(endpoint.trim_start_matches('/'));
        Ok(url)
    }

    async fn parse_json_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_api_error(status, &body))
    }
}

#[derive(Debug, Deserialize)]
struct GmailApiErrorEnvelope {
    error: GmailApiError,
}

#[derive(Debug, Deserialize)]
struct GmailApiError {
    code: Option<u16>,
    status: Option<String>,
    message: Option<String>,
    errors: Option<Vec<GmailApiErrorDetail>>,
}

#[derive(Debug, Deserialize)]
struct GmailApiErrorDetail {
    reason: Option<String>,
}

fn map_api_error(status: StatusCode, body: &str) -> AppError {
    let message = parse_api_error_message(body).unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            "no error details in response body".to_string()
        } else {
            body.to_string()
        }
    });

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AppError::Auth(format!(
            "gmail api authorization failed ({status}): {message}"
        ));
    }

    if status == StatusCode::NOT_FOUND {
        return AppError::NotFound(format!("gmail api ({status}): {message}"));
    }

    AppError::Api(format!("gmail api request failed ({status}): {message}"))
}

fn parse_api_error_message(body: &str) -> Option<String> {
    let envelope = serde_json::from_str::<GmailApiErrorEnvelope>(body).ok()?;
    let mut parts = Vec::new();

    if let Some(message) = envelope.error.message {
        parts.push(message);
    }

    if let Some(status) = envelope.error.status {
        parts.push(format!("status={status}"));
    }

    if let Some(code) = envelope.error.code {
        parts.push(format!("code={code}"));
    }

    if let Some(reason) = envelope
        .error
        .errors
        .and_then(|errors| errors.into_iter().find_map(|detail| detail.reason))
    {
        parts.push(format!("reason={reason}"));
    }

    if parts.is_empty() {
        return None;
    }

    Some(parts.join(", "))
}
