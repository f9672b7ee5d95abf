//! Rule storage boundary - HTTP communication with the mailbox backend
//!
//! The backend owns rule persistence; this module owns nothing but the
//! boundary trait and a REST client for it:
//! - List the raw rules of a mailbox
//! - Create / update / delete a rule by id
//!
//! The token-encoded fields of a [`RawRule`] travel through here unchanged;
//! they are a stable wire format rendered directly by the legacy UI.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::rules::RawRule;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Unified error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unauthorized - login required")]
    Unauthorized,

    #[error("Rule not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid response from server")]
    InvalidResponse,
}

/// Async boundary to the backend's rule storage API.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Raw rules of a mailbox, in backend priority order.
    async fn list_rules(&self, user_id: &str) -> StoreResult<Vec<RawRule>>;

    /// Persist a new rule; returns the backend-assigned rule id.
    async fn create_rule(&self, user_id: &str, rule: &RawRule) -> StoreResult<String>;

    /// Replace a stored rule by id.
    async fn update_rule(&self, user_id: &str, rule_id: &str, rule: &RawRule) -> StoreResult<()>;

    /// Remove a stored rule by id.
    async fn delete_rule(&self, user_id: &str, rule_id: &str) -> StoreResult<()>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the backend API, without a trailing slash
    pub base_url: String,

    /// Request timeout (in seconds)
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mailbox.internal/api/v2".to_string(),
            timeout_secs: 30,
        }
    }
}

/// REST client for the backend rule storage API
pub struct HttpRuleStore {
    client: Client,
    base_url: String,
    /// Bearer access token (cached in memory)
    access_token: Arc<RwLock<Option<String>>>,
}

impl HttpRuleStore {
    /// Create a client with the default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a client with a custom configuration
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.base_url,
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Set access token (after external login)
    pub async fn set_token(&self, token: String) {
        let mut guard = self.access_token.write().await;
        *guard = Some(token);
    }

    /// Get current token
    pub async fn get_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    /// Clear token (logout)
    pub async fn clear_token(&self) {
        let mut guard = self.access_token.write().await;
        *guard = None;
    }

    fn rules_url(&self, user_id: &str) -> String {
        format!(
            "{}/users/{}/inboxrules",
            self.base_url,
            urlencoding::encode(user_id)
        )
    }

    fn rule_url(&self, user_id: &str, rule_id: &str) -> String {
        format!(
            "{}/users/{}/inboxrules/{}",
            self.base_url,
            urlencoding::encode(user_id),
            urlencoding::encode(rule_id)
        )
    }

    /// Attach the cached bearer token when one is set. Session handling is
    /// external; an unauthenticated call is the backend's to reject.
    async fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.get_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl Default for HttpRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for HttpRuleStore {
    async fn list_rules(&self, user_id: &str) -> StoreResult<Vec<RawRule>> {
        let request = self.client.get(self.rules_url(user_id));
        let response = self.authorize(request).await.send().await?;
        handle_response(response).await
    }

    async fn create_rule(&self, user_id: &str, rule: &RawRule) -> StoreResult<String> {
        let request = self.client.post(self.rules_url(user_id)).json(rule);
        let response = self.authorize(request).await.send().await?;
        let created: CreateRuleResponse = handle_response(response).await?;
        Ok(created.id)
    }

    async fn update_rule(&self, user_id: &str, rule_id: &str, rule: &RawRule) -> StoreResult<()> {
        let request = self.client.put(self.rule_url(user_id, rule_id)).json(rule);
        let response = self.authorize(request).await.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(handle_error(response).await)
        }
    }

    async fn delete_rule(&self, user_id: &str, rule_id: &str) -> StoreResult<()> {
        let request = self.client.delete(self.rule_url(user_id, rule_id));
        let response = self.authorize(request).await.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(handle_error(response).await)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CreateRuleResponse {
    id: String,
}

/// Handle successful JSON response
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> StoreResult<T> {
    let status = response.status();

    if status.is_success() {
        response.json::<T>().await.map_err(|_| StoreError::InvalidResponse)
    } else {
        Err(handle_error(response).await)
    }
}

/// Convert error response to StoreError
async fn handle_error(response: reqwest::Response) -> StoreError {
    let status = response.status();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized,
        StatusCode::NOT_FOUND => {
            let msg = response.text().await.unwrap_or_else(|_| "Unknown rule".to_string());
            StoreError::NotFound(msg)
        }
        StatusCode::INTERNAL_SERVER_ERROR => {
            let msg = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            StoreError::ServerError(msg)
        }
        _ => {
            let msg = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            StoreError::Backend(format!("{}: {}", status, msg))
        }
    }
}
