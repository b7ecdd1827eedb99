//! Twitch Helix: changing the channel category.

use crate::config::Credentials;
use crate::constants::{HELIX_BASE_URL, HTTP_TIMEOUT_SECS, OAUTH_VALIDATE_URL, TWITCH_CLIENT_ID};
use crate::error::AppError;
use async_trait::async_trait;
use log::debug;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// OAuth scope needed to modify channel information
pub const REQUIRED_SCOPE: &str = "channel:manage:broadcast";

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Twitch responded {status}: {body}")]
    Status { status: u16, body: String },
}

/// Performs the external category change. Failures are reported, never retried
/// here.
#[async_trait]
pub trait RemoteStateUpdater: Send + Sync {
    async fn update_category(&self, category_id: &str) -> Result<(), UpdateError>;
}

#[derive(Debug, Serialize)]
struct ModifyChannelRequest<'a> {
    game_id: &'a str,
}

/// Response of the OAuth validate endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub client_id: String,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expires_in: u64,
}

impl TokenInfo {
    pub fn can_manage_broadcast(&self) -> bool {
        self.scopes.iter().any(|s| s == REQUIRED_SCOPE)
    }
}

pub struct TwitchClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl TwitchClient {
    pub fn new(credentials: Credentials) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: HELIX_BASE_URL.to_string(),
            credentials,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.credentials.access_token)
    }

    fn category_request(&self, category_id: &str) -> reqwest::RequestBuilder {
        self.http
            .patch(format!("{}/channels", self.base_url))
            .query(&[("broadcaster_id", self.credentials.broadcaster_id.as_str())])
            .header("Client-Id", TWITCH_CLIENT_ID)
            .header(AUTHORIZATION, self.bearer())
            .json(&ModifyChannelRequest {
                game_id: category_id,
            })
    }

    /// Check the access token; token acquisition and refresh happen elsewhere.
    pub async fn validate_token(&self) -> Result<TokenInfo, UpdateError> {
        let response = self
            .http
            .get(OAUTH_VALIDATE_URL)
            .header(AUTHORIZATION, format!("OAuth {}", self.credentials.access_token))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpdateError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RemoteStateUpdater for TwitchClient {
    async fn update_category(&self, category_id: &str) -> Result<(), UpdateError> {
        debug!(
            "Setting category {category_id} for broadcaster {}",
            self.credentials.broadcaster_id
        );
        let response = self.category_request(category_id).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(UpdateError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
