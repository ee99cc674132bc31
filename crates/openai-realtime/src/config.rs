//! Endpoint and credential configuration.

use crate::error::RealtimeError;
use secrecy::{ExposeSecret, SecretString};
use tokio_tungstenite::tungstenite::{
    client::IntoClientRequest,
    handshake::client::Request,
    http::{HeaderValue, header::AUTHORIZATION},
};

pub const DEFAULT_API_BASE: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";

/// Protocol-version marker required by the endpoint.
pub const BETA_HEADER: &str = "OpenAI-Beta";
pub const BETA_HEADER_VALUE: &str = "realtime=v1";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Supplies everything needed to open a realtime connection.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialProvider: Send + Sync {
    /// Base WebSocket URL, without the model query.
    fn endpoint_base(&self) -> String;
    fn model(&self) -> String;
    fn bearer_token(&self) -> SecretString;
}

/// Configuration loaded from the environment or built in code.
#[derive(Debug)]
pub struct RealtimeConfig {
    pub api_base: String,
    pub model: String,
    pub api_key: SecretString,
}

impl RealtimeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: SecretString::from(api_key.into()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        if api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "OPENAI_API_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let model = std::env::var("REALTIME_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let api_base =
            std::env::var("REALTIME_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        if !(api_base.starts_with("ws://") || api_base.starts_with("wss://")) {
            return Err(ConfigError::InvalidValue(
                "REALTIME_API_BASE".to_string(),
                format!("'{}' is not a ws:// or wss:// URL", api_base),
            ));
        }

        Ok(Self {
            api_base,
            model,
            api_key: SecretString::from(api_key),
        })
    }
}

impl CredentialProvider for RealtimeConfig {
    fn endpoint_base(&self) -> String {
        self.api_base.clone()
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn bearer_token(&self) -> SecretString {
        SecretString::from(self.api_key.expose_secret().to_string())
    }
}

/// Builds the WebSocket upgrade request: `{base}?model={model}` with the
/// bearer credential and the protocol-version header.
pub fn build_request(provider: &dyn CredentialProvider) -> Result<Request, RealtimeError> {
    let url = format!(
        "{}?model={}",
        provider.endpoint_base().trim_end_matches('/'),
        provider.model()
    );
    let mut request = url
        .into_client_request()
        .map_err(|e| RealtimeError::InvalidRequest(e.to_string()))?;

    let mut auth = HeaderValue::from_str(&format!(
        "Bearer {}",
        provider.bearer_token().expose_secret()
    ))
    .map_err(|_| RealtimeError::InvalidRequest("bearer token is not a valid header".into()))?;
    auth.set_sensitive(true);

    let headers = request.headers_mut();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(BETA_HEADER, HeaderValue::from_static(BETA_HEADER_VALUE));
    Ok(request)
}
