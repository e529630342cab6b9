use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ApiError;

pub const TRADING_API_VERSION: &str = "1291";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_PORT: u16 = 8080;

/// Which eBay API family serves listing requests. Resolved once at startup
/// from whichever credentials are present, most capable first.
#[derive(Debug, Clone)]
pub enum ApiStrategy {
    Trading { auth_token: String },
    Browse { client_id: String, client_secret: String },
    Finding { app_id: String },
}

impl ApiStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ApiStrategy::Trading { .. } => "trading",
            ApiStrategy::Browse { .. } => "browse",
            ApiStrategy::Finding { .. } => "finding",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    pub fn trading_url(self) -> &'static str {
        match self {
            Environment::Production => "https://api.ebay.com/ws/api.dll",
            Environment::Sandbox => "https://api.sandbox.ebay.com/ws/api.dll",
        }
    }

    pub fn finding_url(self) -> &'static str {
        match self {
            Environment::Production => {
                "https://svcs.ebay.com/services/search/FindingService/v1"
            }
            Environment::Sandbox => {
                "https://svcs.sandbox.ebay.com/services/search/FindingService/v1"
            }
        }
    }

    pub fn browse_url(self) -> &'static str {
        match self {
            Environment::Production => {
                "https://api.ebay.com/buy/browse/v1/item_summary/search"
            }
            Environment::Sandbox => {
                "https://api.sandbox.ebay.com/buy/browse/v1/item_summary/search"
            }
        }
    }

    pub fn token_url(self) -> &'static str {
        match self {
            Environment::Production => "https://api.ebay.com/identity/v1/oauth2/token",
            Environment::Sandbox => "https://api.sandbox.ebay.com/identity/v1/oauth2/token",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: ApiStrategy,
    pub environment: Environment,
    /// Trading user token; also required for feedback under any strategy.
    pub user_token: Option<String>,
    pub seller: Option<String>,
    pub site_id: String,
    pub marketplace: String,
    pub cache_path: PathBuf,
    pub cache_ttl: Duration,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ApiError> {
        let user_token = env::var("EBAY_USER_TOKEN")
            .or_else(|_| env::var("EBAY_AUTH_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());
        let client_id = env::var("EBAY_CLIENT_ID").ok().filter(|v| !v.is_empty());
        let client_secret = env::var("EBAY_CLIENT_SECRET").ok().filter(|v| !v.is_empty());
        let app_id = env::var("EBAY_APP_ID").ok().filter(|v| !v.is_empty());

        let strategy = if let Some(token) = user_token.clone() {
            ApiStrategy::Trading { auth_token: token }
        } else if let (Some(id), Some(secret)) = (client_id, client_secret) {
            ApiStrategy::Browse {
                client_id: id,
                client_secret: secret,
            }
        } else if let Some(app_id) = app_id {
            ApiStrategy::Finding { app_id }
        } else {
            return Err(ApiError::MissingConfig(
                "set EBAY_USER_TOKEN, EBAY_CLIENT_ID+EBAY_CLIENT_SECRET, or EBAY_APP_ID"
                    .to_string(),
            ));
        };

        let environment = match env::var("EBAY_ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Sandbox,
        };

        let cache_path = env::var("CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("ebay-showcase-listings.json"));

        let cache_ttl = env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS));

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Config {
            strategy,
            environment,
            user_token,
            seller: env::var("EBAY_SELLER").ok().filter(|v| !v.is_empty()),
            site_id: env::var("EBAY_SITE_ID").unwrap_or_else(|_| "0".to_string()),
            marketplace: env::var("EBAY_MARKETPLACE").unwrap_or_else(|_| "EBAY_US".to_string()),
            cache_path,
            cache_ttl,
            port,
        })
    }
}
