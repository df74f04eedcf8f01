use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pubsub: PubSubConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub desktop: DesktopConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the notification API
    #[serde(default = "default_api_url")]
    pub url: String,
    /// Bearer token attached to every request (optional)
    pub token: Option<String>,
    /// Timeout for REST requests in seconds (the stream request is exempt)
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct PubSubConfig {
    #[serde(default = "default_pubsub_url")]
    pub url: String,
    /// Channels to subscribe to; patterns (`*`, `?`, `[`) use PSUBSCRIBE.
    /// An empty list disables the pub/sub transport entirely.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Handshake budget in seconds before falling back to the stream
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_seconds: u64,
}

fn default_pubsub_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_handshake_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Path of the streaming endpoint, resolved against `api.url`
    #[serde(default = "default_stream_path")]
    pub path: String,
}

fn default_stream_path() -> String {
    "notifications/stream/".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Maximum reconnect attempts inside the rolling window
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Rolling window size in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Fixed delay before each allowed reconnect, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
}

fn default_max_attempts() -> usize {
    3
}

fn default_window_seconds() -> u64 {
    240 // 4 minutes
}

fn default_retry_delay() -> u64 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct DesktopConfig {
    /// Desktop bridge backend: "log" or "none"
    #[serde(default = "default_desktop_backend")]
    pub backend: String,
}

fn default_desktop_backend() -> String {
    "log".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_otel_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "ara-notification-client".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("api.url", default_api_url())?
            .set_default("api.timeout_seconds", default_api_timeout())?
            .set_default("pubsub.url", default_pubsub_url())?
            .set_default("pubsub.handshake_timeout_seconds", default_handshake_timeout())?
            .set_default("stream.path", default_stream_path())?
            .set_default("reconnect.max_attempts", default_max_attempts() as u64)?
            .set_default("reconnect.window_seconds", default_window_seconds())?
            .set_default("reconnect.retry_delay_seconds", default_retry_delay())?
            .set_default("desktop.backend", default_desktop_backend())?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // API_URL, API_TOKEN, PUBSUB_URL, PUBSUB_CHANNELS, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    /// Full URL of the streaming endpoint
    pub fn stream_url(&self) -> String {
        format!(
            "{}/{}",
            self.api.url.trim_end_matches('/'),
            self.stream.path.trim_start_matches('/')
        )
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            pubsub: PubSubConfig::default(),
            stream: StreamConfig::default(),
            reconnect: ReconnectConfig::default(),
            desktop: DesktopConfig::default(),
            otel: OtelConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            token: None,
            timeout_seconds: default_api_timeout(),
        }
    }
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            url: default_pubsub_url(),
            channels: vec![],
            handshake_timeout_seconds: default_handshake_timeout(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            path: default_stream_path(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_seconds: default_window_seconds(),
            retry_delay_seconds: default_retry_delay(),
        }
    }
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            backend: default_desktop_backend(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_otel_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
