use std::collections::HashMap;

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::Settings;
use crate::error::{AppError, AppResult};

use super::token::TokenSet;

const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    client_id: String,
    client_secret: Option<String>,
    token_endpoint: String,
}

impl OAuthClient {
    pub fn from_settings(http: Client, settings: &Settings) -> AppResult<Self> {
        Ok(Self {
            http,
            client_id: settings.client_id()?.to_string(),
            client_secret: settings.client_secret().map(ToOwned::to_owned),
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
        })
    }

    pub async fn refresh(&self, current: &TokenSet) -> AppResult<TokenSet> {
        let refresh_token = current
            .refresh_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                AppError::Auth("access token expired and no refresh token is stored".to_string())
            })?;

        let mut form = HashMap::from([
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.clone()),
            ("client_id", self.client_id.clone()),
        ]);

        if let Some(client_secret) = &self.client_secret {
            form.insert("client_secret", client_secret.clone());
        }

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let mut token = parse_token_response(status, &body)?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token);
        }

        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

fn parse_token_response(status: StatusCode, body: &str) -> AppResult<TokenSet> {
    if status.is_success() {
        let payload: OAuthTokenResponse = serde_json::from_str(body)?;
        return Ok(TokenSet {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_at: payload
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        });
    }

    if let Ok(err_payload) = serde_json::from_str::<OAuthErrorResponse>(body) {
        let error = err_payload
            .error
            .unwrap_or_else(|| "unknown_oauth_error".to_string());
        let description = err_payload
            .error_description
            .unwrap_or_else(|| "no description".to_string());
        return Err(AppError::Auth(format!(
            "oauth token refresh failed ({status}): {error} ({description})"
        )));
    }

    Err(AppError::Auth(format!(
        "oauth token refresh failed ({status}): {body}"
    )))
}
