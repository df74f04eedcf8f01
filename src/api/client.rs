//! Typed client for the notification REST endpoints.

use std::time::{Duration, Instant};

use crate::infrastructure::config::ApiConfig;
use crate::infrastructure::error::{ClientError, Result};
use crate::infrastructure::metrics::RestMetrics;
use crate::notification::{InvitationAction, NotificationPage};

/// Client for the notification API
///
/// The list endpoint is paginated and newest-first; mutations are
/// acknowledged by status code, their bodies are not inspected.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Fetch one page of notifications.
    pub async fn fetch_page(&self, page: u32) -> Result<NotificationPage> {
        let url = format!("{}/notifications/", self.base_url);
        let request = self.http.get(&url).query(&[("page", page)]);
        let response = self.send("list", request).await?;
        Ok(response.json().await?)
    }

    /// Mark a single notification read on the server.
    pub async fn mark_read(&self, token: &str) -> Result<()> {
        let url = format!("{}/notifications/", self.base_url);
        let request = self
            .http
            .put(&url)
            .json(&serde_json::json!({ "token": token }));
        self.send("mark_read", request).await?;
        Ok(())
    }

    /// Mark every notification read on the server.
    pub async fn mark_all_read(&self) -> Result<()> {
        let url = format!("{}/notifications/", self.base_url);
        let request = self
            .http
            .put(&url)
            .json(&serde_json::json!({ "read_all": true }));
        self.send("mark_all_read", request).await?;
        Ok(())
    }

    /// Accept or decline an invitation notification.
    pub async fn respond(&self, token: &str, action: InvitationAction) -> Result<()> {
        let url = format!("{}/notifications/{}/", self.base_url, token);
        let request = self.http.post(&url).json(&serde_json::json!({ "action": action }));
        self.send("respond", request).await?;
        Ok(())
    }

    /// Expire a notification without marking it read.
    pub async fn expire(&self, token: &str) -> Result<()> {
        let url = format!("{}/notifications/{}/expire/", self.base_url, token);
        self.send("expire", self.http.get(&url)).await?;
        Ok(())
    }

    async fn send(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let started = Instant::now();
        let result = self.dispatch(request).await;
        RestMetrics::record_latency(endpoint, started.elapsed().as_secs_f64());

        match &result {
            Ok(_) => RestMetrics::record_ok(endpoint),
            Err(e) => {
                RestMetrics::record_error(endpoint);
                tracing::warn!(endpoint, error = %e, "API request failed");
            }
        }

        result
    }

    async fn dispatch(&self, mut request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(ClientError::api(status.as_u16(), message));
        }

        Ok(response)
    }
}
