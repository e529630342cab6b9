use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::ApiError;

/// Tokens within this margin of expiry are treated as already expired, so a
/// request never starts with a token about to lapse mid-flight.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Process-lifetime cache for the Browse API's client-credentials bearer
/// token. One token exchange at a time; a failed exchange is fatal to the
/// request with no retry.
pub struct TokenManager {
    http: Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(http: Client, endpoint: String, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            endpoint,
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, ApiError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at.saturating_duration_since(Instant::now()) > EXPIRY_MARGIN {
                return Ok(token.token.clone());
            }
        }

        tracing::info!("requesting new client-credentials token");
        let resp = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", "https://api.ebay.com/oauth/api_scope"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::token(status.as_u16(), &body));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("token response: {e}")))?;
        let fresh = CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        };
        let value = fresh.token.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}
